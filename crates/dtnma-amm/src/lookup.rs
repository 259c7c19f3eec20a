//! Dereferencing object references against an [`ObjectStore`].
//!
//! Resolution runs namespace, then object type, then object, then binds the
//! reference's actual parameters to the object's formal list. Failure at any
//! step yields a [`DerefError`] carrying a protocol status code; no partial
//! result is returned.

use crate::param::{FormalParam, ParamType};
use crate::store::{Namespace, NamespaceHandle, ObjectDesc, ObjectHandle, ObjectStore};
use dtnma_types::{Ari, AriMap, IdSeg, LitType, ObjectType, Params, Prim, Reference};
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

/// Status code of a successful dereference.
pub const STATUS_OK: i32 = 0;

/// Dereference failures, each mapped to a protocol status code.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DerefError {
    /// The type segment is not a known object type.
    #[error("Unknown object type: {0}")]
    ObjectTypeUnknown(IdSeg),

    /// No namespace matches the namespace segment.
    #[error("Namespace not found: {0}")]
    NamespaceNotFound(IdSeg),

    /// No object of the type matches the object segment.
    #[error("Object not found: {obj_type} {id}")]
    ObjectNotFound {
        /// Resolved object type.
        obj_type: ObjectType,
        /// The missing object id.
        id: IdSeg,
    },

    /// A formal had no actual and no default.
    #[error("Missing value for parameter '{0}'")]
    ParamMissing(String),

    /// An actual could not be converted to its formal's type.
    #[error("Invalid value for parameter '{0}'")]
    ParamInvalid(String),

    /// A keyed actual whose key is neither a name nor an index.
    #[error("Invalid parameter key: {0}")]
    ParamKeyInvalid(Ari),

    /// Actuals remained after binding every formal.
    #[error("{0} unused actual parameter(s)")]
    ParamExtra(usize),
}

impl DerefError {
    /// Numeric status code reported to the manager.
    pub fn status(&self) -> i32 {
        match self {
            Self::ObjectTypeUnknown(_) => 2,
            Self::NamespaceNotFound(_) => 3,
            Self::ObjectNotFound { .. } => 4,
            Self::ParamMissing(_) | Self::ParamInvalid(_) | Self::ParamKeyInvalid(_) => 7,
            Self::ParamExtra(_) => 8,
        }
    }
}

/// Actual parameters bound to an object's formals.
///
/// The ordered and named views always cover the same values: one entry per
/// formal, in index order, with names folded to ASCII lower case.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActualParams {
    ordered: Vec<Ari>,
    named: HashMap<String, usize>,
}

impl ActualParams {
    /// Bound value by formal index.
    pub fn get(&self, index: usize) -> Option<&Ari> {
        self.ordered.get(index)
    }

    /// Bound value by formal name, ignoring ASCII case.
    pub fn get_named(&self, name: &str) -> Option<&Ari> {
        let idx = *self.named.get(&name.to_ascii_lowercase())?;
        self.ordered.get(idx)
    }

    /// Values in formal index order.
    pub fn ordered(&self) -> &[Ari] {
        &self.ordered
    }

    /// Number of entries in the named view.
    pub fn named_len(&self) -> usize {
        self.named.len()
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    fn push(&mut self, formal: &FormalParam, value: Ari) {
        self.named
            .insert(formal.name.to_ascii_lowercase(), self.ordered.len());
        self.ordered.push(value);
    }
}

/// A resolved reference.
#[derive(Debug, Clone)]
pub struct Lookup<'a> {
    /// The reference that was resolved.
    pub reference: &'a Reference,
    pub ns: &'a Namespace,
    pub ns_handle: NamespaceHandle,
    pub obj: &'a ObjectDesc,
    pub obj_handle: ObjectHandle,
    pub params: ActualParams,
}

/// Resolve a reference and bind its parameters.
pub fn deref<'a>(store: &'a ObjectStore, reference: &'a Reference) -> Result<Lookup<'a>, DerefError> {
    let result = resolve(store, reference);
    if let Err(e) = &result {
        debug!(reference = %reference, status = e.status(), error = %e, "Dereference failed");
    }
    result
}

fn resolve<'a>(store: &'a ObjectStore, reference: &'a Reference) -> Result<Lookup<'a>, DerefError> {
    // A namespace reference names no object at all.
    if reference.type_id.is_absent() {
        return Err(DerefError::ObjectTypeUnknown(IdSeg::Absent));
    }
    let ns_handle = store
        .find_namespace(&reference.ns_id)
        .ok_or_else(|| DerefError::NamespaceNotFound(reference.ns_id.clone()))?;
    let obj_type = reference
        .object_type()
        .ok_or_else(|| DerefError::ObjectTypeUnknown(reference.type_id.clone()))?;
    let obj_handle = store
        .find_object(ns_handle, obj_type, &reference.obj_id)
        .ok_or_else(|| DerefError::ObjectNotFound {
            obj_type,
            id: reference.obj_id.clone(),
        })?;

    // Both handles were just produced by this store.
    let (Some(ns), Some(obj)) = (store.namespace(ns_handle), store.object(obj_handle)) else {
        return Err(DerefError::NamespaceNotFound(reference.ns_id.clone()));
    };

    let params = bind_params(obj.params(), &reference.params)?;
    Ok(Lookup {
        reference,
        ns,
        ns_handle,
        obj,
        obj_handle,
        params,
    })
}

/// Bind given actuals to a formal list.
pub fn bind_params(formals: &[FormalParam], given: &Params) -> Result<ActualParams, DerefError> {
    let mut slots: Vec<Option<&Ari>> = vec![None; formals.len()];
    let unused = match given {
        Params::None => 0,
        Params::Ac(items) => {
            for (slot, item) in slots.iter_mut().zip(items) {
                *slot = Some(item);
            }
            items.len().saturating_sub(formals.len())
        }
        Params::Am(map) => fill_keyed(formals, map, &mut slots)?,
    };

    let mut bound = ActualParams::default();
    for (formal, slot) in formals.iter().zip(slots) {
        let value = match slot {
            Some(actual) => formal
                .ty
                .convert(actual)
                .ok_or_else(|| DerefError::ParamInvalid(formal.name.clone()))?,
            None => formal
                .default
                .clone()
                .ok_or_else(|| DerefError::ParamMissing(formal.name.clone()))?,
        };
        bound.push(formal, value);
    }

    if unused > 0 {
        return Err(DerefError::ParamExtra(unused));
    }
    Ok(bound)
}

/// A keyed actual's key: a formal name, or an index converted as UVAST.
enum ParamKey<'a> {
    Name(&'a str),
    Index(u64),
}

impl<'a> ParamKey<'a> {
    fn parse(key: &'a Ari) -> Option<Self> {
        if let Some(name) = key.as_text() {
            return Some(Self::Name(name));
        }
        let index = ParamType::Lit(LitType::UVast).convert(key)?;
        match index.as_prim()? {
            Prim::UInt(v) => Some(Self::Index(*v)),
            _ => None,
        }
    }
}

/// Place keyed actuals into formal slots and count the keys that matched
/// nothing. Name keys are applied after index keys so they take precedence.
fn fill_keyed<'m>(
    formals: &[FormalParam],
    map: &'m AriMap,
    slots: &mut [Option<&'m Ari>],
) -> Result<usize, DerefError> {
    let mut unused = 0;
    let mut named = Vec::new();
    for (key, value) in map {
        match ParamKey::parse(key) {
            Some(ParamKey::Name(name)) => named.push((name, value)),
            Some(ParamKey::Index(index)) => {
                match usize::try_from(index).ok().filter(|i| *i < formals.len()) {
                    Some(i) => slots[i] = Some(value),
                    None => unused += 1,
                }
            }
            None => return Err(DerefError::ParamKeyInvalid(key.clone())),
        }
    }
    for (name, value) in named {
        match formals.iter().position(|f| f.name.eq_ignore_ascii_case(name)) {
            Some(i) => slots[i] = Some(value),
            None => unused += 1,
        }
    }
    Ok(unused)
}
