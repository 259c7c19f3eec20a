//! Object registry: namespaces and the object descriptors they own.
//!
//! The [`ObjectStore`] is an arena: namespaces and descriptors live in
//! vectors and are addressed by index handles that stay valid for the life
//! of the store. Registration takes `&mut self`; once populated the store is
//! read-only and can be shared behind an `Arc` without locking.

use crate::param::FormalParam;
use dtnma_types::{IdSeg, ObjectType};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, warn};

/// Registration failures. The store is left unchanged.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// A namespace with this name already exists.
    #[error("Duplicate namespace name: {0}")]
    DuplicateNamespace(String),

    /// An object of the same type already uses this name or enum.
    #[error("Duplicate {obj_type} object '{id}' in namespace {ns}")]
    DuplicateObject {
        /// Owning namespace name.
        ns: String,
        /// Object type of the rejected descriptor.
        obj_type: ObjectType,
        /// The conflicting name or enum.
        id: String,
    },

    /// A formal parameter name is already declared on the object.
    #[error("Duplicate parameter name: {0}")]
    DuplicateParam(String),

    /// A parameter default does not convert to the parameter type.
    #[error("Default for parameter '{0}' does not match its type")]
    InvalidDefault(String),

    /// A handle that does not belong to this store.
    #[error("Unknown registry handle")]
    InvalidHandle,
}

/// Alias for Result with StoreError.
pub type StoreResult<T> = Result<T, StoreError>;

/// Stable handle to a registered namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NamespaceHandle(usize);

/// Stable handle to a registered object descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectHandle {
    ns: usize,
    obj: usize,
}

impl ObjectHandle {
    /// The namespace owning this object.
    pub fn namespace(&self) -> NamespaceHandle {
        NamespaceHandle(self.ns)
    }
}

/// Identity of an object within its namespace and type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjId {
    pub name: String,
    pub enum_id: Option<i64>,
}

impl ObjId {
    /// An object addressable by both name and enum.
    pub fn new(name: impl Into<String>, enum_id: i64) -> Self {
        Self {
            name: name.into(),
            enum_id: Some(enum_id),
        }
    }

    /// An object addressable by name only.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enum_id: None,
        }
    }
}

/// A registered object and its formal parameter list.
#[derive(Debug, Clone)]
pub struct ObjectDesc {
    obj_type: ObjectType,
    id: ObjId,
    params: Vec<FormalParam>,
}

impl ObjectDesc {
    pub fn obj_type(&self) -> ObjectType {
        self.obj_type
    }

    pub fn id(&self) -> &ObjId {
        &self.id
    }

    /// Formal parameters in index order.
    pub fn params(&self) -> &[FormalParam] {
        &self.params
    }

    /// Append a formal parameter.
    ///
    /// The index is assigned from the current list length. Names must be
    /// unique ignoring ASCII case, and a default is stored already converted
    /// to the parameter type.
    pub fn add_param(&mut self, mut param: FormalParam) -> StoreResult<()> {
        if self
            .params
            .iter()
            .any(|p| p.name.eq_ignore_ascii_case(&param.name))
        {
            return Err(StoreError::DuplicateParam(param.name));
        }
        if let Some(default) = param.default.take() {
            match param.ty.convert(&default) {
                Some(converted) => param.default = Some(converted),
                None => return Err(StoreError::InvalidDefault(param.name)),
            }
        }
        param.index = self.params.len();
        self.params.push(param);
        Ok(())
    }
}

/// A namespace (ADM) and the descriptors it owns.
#[derive(Debug, Clone)]
pub struct Namespace {
    name: String,
    enum_id: Option<i64>,
    objects: Vec<ObjectDesc>,
    by_enum: HashMap<(ObjectType, i64), usize>,
    by_name: HashMap<(ObjectType, String), usize>,
}

impl Namespace {
    fn new(name: String, enum_id: Option<i64>) -> Self {
        Self {
            name,
            enum_id,
            objects: Vec::new(),
            by_enum: HashMap::new(),
            by_name: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn enum_id(&self) -> Option<i64> {
        self.enum_id
    }

    /// All descriptors in registration order.
    pub fn objects(&self) -> &[ObjectDesc] {
        &self.objects
    }

    fn find(&self, obj_type: ObjectType, id: &IdSeg) -> Option<usize> {
        match id {
            IdSeg::Int(v) => self.by_enum.get(&(obj_type, *v)).copied(),
            IdSeg::Text(name) => self.by_name.get(&(obj_type, name.clone())).copied(),
            IdSeg::Absent => None,
        }
    }
}

/// The registry of all namespaces known to a node.
#[derive(Debug, Clone, Default)]
pub struct ObjectStore {
    namespaces: Vec<Namespace>,
    by_enum: HashMap<i64, usize>,
    by_name: HashMap<String, usize>,
}

impl ObjectStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a namespace.
    ///
    /// Names are unique (exact match). Enum ids are not checked for
    /// uniqueness; enum lookup resolves to the first namespace registered
    /// with that id.
    pub fn add_namespace(
        &mut self,
        name: impl Into<String>,
        enum_id: Option<i64>,
    ) -> StoreResult<NamespaceHandle> {
        let name = name.into();
        if self.by_name.contains_key(&name) {
            warn!(namespace = %name, "Ignoring duplicate namespace name");
            return Err(StoreError::DuplicateNamespace(name));
        }

        let idx = self.namespaces.len();
        if let Some(e) = enum_id {
            if let Some(&first) = self.by_enum.get(&e) {
                warn!(
                    namespace = %name,
                    enum_id = e,
                    shadowed_by = %self.namespaces[first].name,
                    "Namespace enum already in use; lookups by enum resolve to the first"
                );
            } else {
                self.by_enum.insert(e, idx);
            }
        }
        debug!(namespace = %name, enum_id = ?enum_id, "Registered namespace");
        self.by_name.insert(name.clone(), idx);
        self.namespaces.push(Namespace::new(name, enum_id));
        Ok(NamespaceHandle(idx))
    }

    /// Register an object descriptor in a namespace.
    pub fn add_object(
        &mut self,
        ns: NamespaceHandle,
        obj_type: ObjectType,
        id: ObjId,
    ) -> StoreResult<ObjectHandle> {
        let namespace = self
            .namespaces
            .get_mut(ns.0)
            .ok_or(StoreError::InvalidHandle)?;

        let name_key = (obj_type, id.name.clone());
        let conflict = if namespace.by_name.contains_key(&name_key) {
            Some(id.name.clone())
        } else {
            id.enum_id
                .filter(|e| namespace.by_enum.contains_key(&(obj_type, *e)))
                .map(|e| e.to_string())
        };
        if let Some(conflict) = conflict {
            warn!(
                namespace = %namespace.name,
                obj_type = %obj_type,
                id = %conflict,
                "Ignoring duplicate object"
            );
            return Err(StoreError::DuplicateObject {
                ns: namespace.name.clone(),
                obj_type,
                id: conflict,
            });
        }

        let obj = namespace.objects.len();
        namespace.by_name.insert(name_key, obj);
        if let Some(e) = id.enum_id {
            namespace.by_enum.insert((obj_type, e), obj);
        }
        debug!(
            namespace = %namespace.name,
            obj_type = %obj_type,
            name = %id.name,
            "Registered object"
        );
        namespace.objects.push(ObjectDesc {
            obj_type,
            id,
            params: Vec::new(),
        });
        Ok(ObjectHandle { ns: ns.0, obj })
    }

    /// Declare a formal parameter on a registered object.
    pub fn add_param(&mut self, obj: ObjectHandle, param: FormalParam) -> StoreResult<()> {
        self.object_mut(obj)
            .ok_or(StoreError::InvalidHandle)?
            .add_param(param)
    }

    pub fn namespace(&self, ns: NamespaceHandle) -> Option<&Namespace> {
        self.namespaces.get(ns.0)
    }

    pub fn object(&self, obj: ObjectHandle) -> Option<&ObjectDesc> {
        self.namespaces.get(obj.ns)?.objects.get(obj.obj)
    }

    /// Mutable access for declaring parameters during registration.
    pub fn object_mut(&mut self, obj: ObjectHandle) -> Option<&mut ObjectDesc> {
        self.namespaces.get_mut(obj.ns)?.objects.get_mut(obj.obj)
    }

    /// Resolve a namespace by enum id or exact name.
    pub fn find_namespace(&self, id: &IdSeg) -> Option<NamespaceHandle> {
        let idx = match id {
            IdSeg::Int(e) => self.by_enum.get(e),
            IdSeg::Text(name) => self.by_name.get(name),
            IdSeg::Absent => None,
        };
        idx.copied().map(NamespaceHandle)
    }

    /// Resolve an object within a namespace by (type, enum) or (type, name).
    pub fn find_object(
        &self,
        ns: NamespaceHandle,
        obj_type: ObjectType,
        id: &IdSeg,
    ) -> Option<ObjectHandle> {
        let obj = self.namespaces.get(ns.0)?.find(obj_type, id)?;
        Some(ObjectHandle { ns: ns.0, obj })
    }

    /// All namespaces in registration order.
    pub fn namespaces(&self) -> impl Iterator<Item = (NamespaceHandle, &Namespace)> {
        self.namespaces
            .iter()
            .enumerate()
            .map(|(i, ns)| (NamespaceHandle(i), ns))
    }

    pub fn len(&self) -> usize {
        self.namespaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.namespaces.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::param::ParamType;
    use dtnma_types::{Ari, LitType};

    #[test]
    fn test_duplicate_namespace_name() {
        let mut store = ObjectStore::new();
        store.add_namespace("example-adm", Some(25)).unwrap();
        assert_eq!(
            store.add_namespace("example-adm", Some(26)),
            Err(StoreError::DuplicateNamespace("example-adm".into()))
        );
        // Name comparison is case-sensitive.
        assert!(store.add_namespace("Example-ADM", Some(27)).is_ok());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_duplicate_enum_first_wins() {
        let mut store = ObjectStore::new();
        let first = store.add_namespace("a", Some(5)).unwrap();
        let second = store.add_namespace("b", Some(5)).unwrap();
        assert_eq!(store.find_namespace(&IdSeg::Int(5)), Some(first));
        assert_eq!(store.find_namespace(&IdSeg::from("b")), Some(second));
    }

    #[test]
    fn test_namespace_lookup_forms() {
        let mut store = ObjectStore::new();
        let ns = store.add_namespace("example-adm", Some(25)).unwrap();
        let anon = store.add_namespace("private", None).unwrap();
        assert_eq!(store.find_namespace(&IdSeg::Int(25)), Some(ns));
        assert_eq!(store.find_namespace(&IdSeg::from("example-adm")), Some(ns));
        assert_eq!(store.find_namespace(&IdSeg::from("EXAMPLE-ADM")), None);
        assert_eq!(store.find_namespace(&IdSeg::from("private")), Some(anon));
        assert_eq!(store.namespace(anon).and_then(Namespace::enum_id), None);
    }

    #[test]
    fn test_duplicate_objects_per_type() {
        let mut store = ObjectStore::new();
        let ns = store.add_namespace("adm", Some(1)).unwrap();
        store
            .add_object(ns, ObjectType::Ident, ObjId::new("one", 1))
            .unwrap();

        let by_name = store.add_object(ns, ObjectType::Ident, ObjId::new("one", 2));
        assert!(matches!(by_name, Err(StoreError::DuplicateObject { .. })));
        let by_enum = store.add_object(ns, ObjectType::Ident, ObjId::new("other", 1));
        assert!(matches!(by_enum, Err(StoreError::DuplicateObject { .. })));

        // Same identity under another type is fine.
        assert!(store
            .add_object(ns, ObjectType::Typedef, ObjId::new("one", 1))
            .is_ok());
        assert_eq!(store.namespace(ns).map(|n| n.objects().len()), Some(2));
    }

    #[test]
    fn test_find_object() {
        let mut store = ObjectStore::new();
        let ns = store.add_namespace("adm", Some(1)).unwrap();
        let h = store
            .add_object(ns, ObjectType::Edd, ObjId::new("counter", 3))
            .unwrap();
        let n = store
            .add_object(ns, ObjectType::Edd, ObjId::named("label"))
            .unwrap();
        assert_eq!(store.find_object(ns, ObjectType::Edd, &IdSeg::Int(3)), Some(h));
        assert_eq!(store.find_object(ns, ObjectType::Edd, &IdSeg::from("counter")), Some(h));
        assert_eq!(store.find_object(ns, ObjectType::Edd, &IdSeg::from("label")), Some(n));
        assert_eq!(store.find_object(ns, ObjectType::Var, &IdSeg::Int(3)), None);
        assert_eq!(h.namespace(), ns);
    }

    #[test]
    fn test_params_indexed_in_order() {
        let mut store = ObjectStore::new();
        let ns = store.add_namespace("adm", Some(1)).unwrap();
        let h = store
            .add_object(ns, ObjectType::Ctrl, ObjId::new("run", 0))
            .unwrap();
        let int = ParamType::Lit(LitType::Int);
        store.add_param(h, FormalParam::new("first", int)).unwrap();
        store
            .add_param(h, FormalParam::new("second", int).with_default(Ari::int(4)))
            .unwrap();

        let desc = store.object(h).unwrap();
        assert_eq!(desc.params().len(), 2);
        assert_eq!(desc.params()[1].index, 1);
        assert_eq!(desc.params()[1].default.as_ref().and_then(Ari::as_i64), Some(4));
    }

    #[test]
    fn test_param_rejections() {
        let mut store = ObjectStore::new();
        let ns = store.add_namespace("adm", Some(1)).unwrap();
        let h = store
            .add_object(ns, ObjectType::Ctrl, ObjId::new("run", 0))
            .unwrap();
        let int = ParamType::Lit(LitType::Int);
        store.add_param(h, FormalParam::new("count", int)).unwrap();
        assert_eq!(
            store.add_param(h, FormalParam::new("COUNT", int)),
            Err(StoreError::DuplicateParam("COUNT".into()))
        );
        assert_eq!(
            store.add_param(h, FormalParam::new("x", int).with_default(Ari::text("no"))),
            Err(StoreError::InvalidDefault("x".into()))
        );
    }
}
