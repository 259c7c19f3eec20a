//! The ARI value model.
//!
//! An [`Ari`] is either a [`Literal`] value or a [`Reference`] to a managed
//! object. Every type here implements `Eq + Ord + Hash` with a total
//! structural order (variant first, then contents) so that ARIs can be used
//! as map keys, including inside [`AriMap`].

use crate::ari_type::{LitType, ObjectType};
use crate::containers::{ExecSet, RptSet, Table};
use crate::error::{AriError, AriResult};
use crate::time::Timespec;
use indexmap::IndexMap;
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

/// A primitive value, either bare or wrapped by a literal type.
///
/// Signed and unsigned integers compare numerically, so `Int(10)` equals
/// `UInt(10)`. Floats use IEEE total ordering, except that every NaN is
/// the same value since the wire carries only one NaN.
#[derive(Debug, Clone)]
pub enum Prim {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
}

impl Prim {
    fn rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Bool(_) => 1,
            Self::Int(_) | Self::UInt(_) => 2,
            Self::Float(_) => 3,
            Self::Text(_) => 4,
            Self::Bytes(_) => 5,
        }
    }

    /// Integer value widened to i128, for either integer form.
    pub fn as_i128(&self) -> Option<i128> {
        match self {
            Self::Int(v) => Some(i128::from(*v)),
            Self::UInt(v) => Some(i128::from(*v)),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

fn canonical_float(v: f64) -> f64 {
    if v.is_nan() {
        f64::NAN
    } else {
        v
    }
}

impl PartialEq for Prim {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Prim {}

impl PartialOrd for Prim {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Prim {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Float(a), Self::Float(b)) => {
                canonical_float(*a).total_cmp(&canonical_float(*b))
            }
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::Bytes(a), Self::Bytes(b)) => a.cmp(b),
            _ => match (self.as_i128(), other.as_i128()) {
                (Some(a), Some(b)) => a.cmp(&b),
                _ => self.rank().cmp(&other.rank()),
            },
        }
    }
}

impl Hash for Prim {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            Self::Null => {}
            Self::Bool(v) => v.hash(state),
            Self::Int(_) | Self::UInt(_) => self.as_i128().hash(state),
            Self::Float(v) => canonical_float(*v).to_bits().hash(state),
            Self::Text(v) => v.hash(state),
            Self::Bytes(v) => v.hash(state),
        }
    }
}

impl LitType {
    /// Whether a primitive value is a valid member of this literal type.
    ///
    /// Time and container types never admit a bare primitive.
    pub fn admits(self, value: &Prim) -> bool {
        let int = value.as_i128();
        let in_range = |lo: i128, hi: i128| int.is_some_and(|v| (lo..=hi).contains(&v));
        match self {
            Self::Null => value.is_null(),
            Self::Bool => matches!(value, Prim::Bool(_)),
            Self::Byte => in_range(0, i128::from(u8::MAX)),
            Self::Int => in_range(i128::from(i32::MIN), i128::from(i32::MAX)),
            Self::UInt => in_range(0, i128::from(u32::MAX)),
            Self::Vast => in_range(i128::from(i64::MIN), i128::from(i64::MAX)),
            Self::UVast => in_range(0, i128::from(u64::MAX)),
            Self::Real32 => match value {
                Prim::Float(v) => !v.is_finite() || v.abs() <= f64::from(f32::MAX),
                _ => false,
            },
            Self::Real64 => matches!(value, Prim::Float(_)),
            Self::TextStr => matches!(value, Prim::Text(_)),
            Self::ByteStr | Self::Cbor => matches!(value, Prim::Bytes(_)),
            Self::Label | Self::AriType => int.is_some() || matches!(value, Prim::Text(_)),
            Self::Tp
            | Self::Td
            | Self::Ac
            | Self::Am
            | Self::Tbl
            | Self::ExecSet
            | Self::RptSet => false,
        }
    }
}

/// A literal value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Literal {
    /// A bare primitive with no type code.
    Untyped(Prim),
    /// A primitive explicitly tagged with a literal type.
    ///
    /// Build through [`Literal::typed`] so the value is checked against the
    /// type; the codec refuses to encode a mismatched pair.
    Typed(LitType, Prim),
    Tp(Timespec),
    Td(Timespec),
    Ac(Vec<Ari>),
    Am(AriMap),
    Tbl(Table),
    ExecSet(ExecSet),
    RptSet(RptSet),
}

impl Literal {
    /// A type-checked typed primitive.
    pub fn typed(ty: LitType, value: Prim) -> AriResult<Self> {
        if matches!(ty, LitType::Tp | LitType::Td) || ty.is_container() {
            return Err(AriError::NotPrimitive(ty));
        }
        if !ty.admits(&value) {
            return Err(AriError::TypeMismatch { ty });
        }
        Ok(Self::Typed(ty, value))
    }

    /// The explicit literal type, if any.
    pub fn lit_type(&self) -> Option<LitType> {
        match self {
            Self::Untyped(_) => None,
            Self::Typed(ty, _) => Some(*ty),
            Self::Tp(_) => Some(LitType::Tp),
            Self::Td(_) => Some(LitType::Td),
            Self::Ac(_) => Some(LitType::Ac),
            Self::Am(_) => Some(LitType::Am),
            Self::Tbl(_) => Some(LitType::Tbl),
            Self::ExecSet(_) => Some(LitType::ExecSet),
            Self::RptSet(_) => Some(LitType::RptSet),
        }
    }

    /// The primitive value of an untyped or typed primitive literal.
    pub fn prim(&self) -> Option<&Prim> {
        match self {
            Self::Untyped(v) | Self::Typed(_, v) => Some(v),
            _ => None,
        }
    }
}

/// One segment of an object path: an integer enumeration or a text name.
///
/// The type and object segments may be absent, as in a reference to a
/// whole namespace (`ari://18/`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IdSeg {
    Absent,
    Int(i64),
    Text(String),
}

impl IdSeg {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }
}

impl From<i64> for IdSeg {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for IdSeg {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<&str> for IdSeg {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for IdSeg {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<ObjectType> for IdSeg {
    fn from(value: ObjectType) -> Self {
        Self::Int(i64::from(value.code()))
    }
}

/// Actual parameters given in a reference.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Params {
    /// No parameters present (distinct from an empty list).
    #[default]
    None,
    /// Positional parameters.
    Ac(Vec<Ari>),
    /// Parameters keyed by index or by name.
    Am(AriMap),
}

impl Params {
    /// Number of given actual parameters.
    pub fn len(&self) -> usize {
        match self {
            Self::None => 0,
            Self::Ac(items) => items.len(),
            Self::Am(map) => map.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A reference to a managed object, with optional actual parameters.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Reference {
    /// Namespace (ADM) identifier.
    pub ns_id: IdSeg,
    /// Object type, validated against [`ObjectType`] on dereference.
    pub type_id: IdSeg,
    /// Object identifier within the namespace and type.
    pub obj_id: IdSeg,
    /// Given parameters.
    pub params: Params,
}

impl Reference {
    /// A reference without parameters.
    pub fn new(ns_id: impl Into<IdSeg>, type_id: impl Into<IdSeg>, obj_id: impl Into<IdSeg>) -> Self {
        Self {
            ns_id: ns_id.into(),
            type_id: type_id.into(),
            obj_id: obj_id.into(),
            params: Params::None,
        }
    }

    /// A reference to a namespace as a whole, with no type or object.
    pub fn namespace(ns_id: impl Into<IdSeg>) -> Self {
        Self::new(ns_id, IdSeg::Absent, IdSeg::Absent)
    }

    /// Attach positional parameters.
    pub fn with_params(mut self, params: Vec<Ari>) -> Self {
        self.params = Params::Ac(params);
        self
    }

    /// Attach keyed parameters.
    pub fn with_keyed_params(mut self, params: AriMap) -> Self {
        self.params = Params::Am(params);
        self
    }

    /// Resolve the type segment, by code or by name.
    pub fn object_type(&self) -> Option<ObjectType> {
        match &self.type_id {
            IdSeg::Int(code) => ObjectType::from_code(*code),
            IdSeg::Text(name) => ObjectType::from_name(name),
            IdSeg::Absent => None,
        }
    }
}

/// An ARI: a literal value or an object reference.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Ari {
    Lit(Literal),
    Ref(Reference),
}

impl Ari {
    pub fn null() -> Self {
        Self::Lit(Literal::Untyped(Prim::Null))
    }

    pub fn bool(value: bool) -> Self {
        Self::Lit(Literal::Untyped(Prim::Bool(value)))
    }

    pub fn int(value: i64) -> Self {
        Self::Lit(Literal::Untyped(Prim::Int(value)))
    }

    pub fn uint(value: u64) -> Self {
        Self::Lit(Literal::Untyped(Prim::UInt(value)))
    }

    pub fn float(value: f64) -> Self {
        Self::Lit(Literal::Untyped(Prim::Float(value)))
    }

    pub fn text(value: impl Into<String>) -> Self {
        Self::Lit(Literal::Untyped(Prim::Text(value.into())))
    }

    pub fn bytes(value: impl Into<Vec<u8>>) -> Self {
        Self::Lit(Literal::Untyped(Prim::Bytes(value.into())))
    }

    /// A type-checked typed primitive.
    pub fn typed(ty: LitType, value: Prim) -> AriResult<Self> {
        Literal::typed(ty, value).map(Self::Lit)
    }

    pub fn tp(value: Timespec) -> Self {
        Self::Lit(Literal::Tp(value))
    }

    pub fn td(value: Timespec) -> Self {
        Self::Lit(Literal::Td(value))
    }

    /// An AC literal from any sequence of ARIs.
    pub fn ac(items: impl IntoIterator<Item = Ari>) -> Self {
        Self::Lit(Literal::Ac(items.into_iter().collect()))
    }

    pub fn am(map: AriMap) -> Self {
        Self::Lit(Literal::Am(map))
    }

    pub fn is_ref(&self) -> bool {
        matches!(self, Self::Ref(_))
    }

    pub fn as_reference(&self) -> Option<&Reference> {
        match self {
            Self::Ref(r) => Some(r),
            Self::Lit(_) => None,
        }
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Self::Lit(l) => Some(l),
            Self::Ref(_) => None,
        }
    }

    /// The primitive of a primitive literal, typed or not.
    pub fn as_prim(&self) -> Option<&Prim> {
        self.as_literal().and_then(Literal::prim)
    }

    /// Integer value of a primitive literal, if it fits i64.
    pub fn as_i64(&self) -> Option<i64> {
        self.as_prim()
            .and_then(Prim::as_i128)
            .and_then(|v| i64::try_from(v).ok())
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.as_prim() {
            Some(Prim::Bool(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self.as_prim() {
            Some(Prim::Text(v)) => Some(v),
            _ => None,
        }
    }

    /// True for a null primitive, typed or not.
    pub fn is_null(&self) -> bool {
        self.as_prim().is_some_and(Prim::is_null)
    }
}

impl From<Literal> for Ari {
    fn from(value: Literal) -> Self {
        Self::Lit(value)
    }
}

impl From<Reference> for Ari {
    fn from(value: Reference) -> Self {
        Self::Ref(value)
    }
}

/// An insertion-ordered map of ARI keys to ARI values.
///
/// Equality, ordering, and hashing follow entry order, which is also the
/// order the codec emits.
#[derive(Debug, Clone, Default)]
pub struct AriMap(IndexMap<Ari, Ari>);

impl AriMap {
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    /// Insert or replace a value; a replaced key keeps its position.
    pub fn insert(&mut self, key: Ari, value: Ari) -> Option<Ari> {
        self.0.insert(key, value)
    }

    pub fn get(&self, key: &Ari) -> Option<&Ari> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &Ari) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, Ari, Ari> {
        self.0.iter()
    }

    pub fn keys(&self) -> indexmap::map::Keys<'_, Ari, Ari> {
        self.0.keys()
    }
}

impl PartialEq for AriMap {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for AriMap {}

impl PartialOrd for AriMap {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for AriMap {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.iter().cmp(other.0.iter())
    }
}

impl Hash for AriMap {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.len().hash(state);
        for (key, value) in &self.0 {
            key.hash(state);
            value.hash(state);
        }
    }
}

impl FromIterator<(Ari, Ari)> for AriMap {
    fn from_iter<T: IntoIterator<Item = (Ari, Ari)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for AriMap {
    type Item = (Ari, Ari);
    type IntoIter = indexmap::map::IntoIter<Ari, Ari>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a AriMap {
    type Item = (&'a Ari, &'a Ari);
    type IntoIter = indexmap::map::Iter<'a, Ari, Ari>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
