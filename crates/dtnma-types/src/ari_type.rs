//! Protocol type codes shared by the value model, the registry, and the codec.
//!
//! Literal types use non-negative codes and managed-object types use
//! negative codes. Both tables are fixed by the protocol and must match
//! across interoperating implementations.

use std::fmt;

/// Literal type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(i32)]
pub enum LitType {
    Null = 0,
    Bool = 1,
    Byte = 2,
    Int = 4,
    UInt = 5,
    Vast = 6,
    UVast = 7,
    Real32 = 8,
    Real64 = 9,
    TextStr = 10,
    ByteStr = 11,
    /// Time point, as an offset from the DTN epoch.
    Tp = 12,
    /// Time difference.
    Td = 13,
    Label = 14,
    /// Embedded, already-encoded CBOR item.
    Cbor = 15,
    AriType = 16,
    /// ARI collection (ordered list).
    Ac = 17,
    /// ARI map.
    Am = 18,
    /// Table with a fixed column count.
    Tbl = 19,
    ExecSet = 20,
    RptSet = 21,
}

/// Managed-object type codes usable in a reference's type segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(i32)]
pub enum ObjectType {
    Ident = -1,
    Const = -2,
    Ctrl = -3,
    Edd = -4,
    Oper = -6,
    Sbr = -8,
    Tbr = -10,
    Var = -11,
    Typedef = -12,
}

const LIT_TYPES: [(LitType, &str); 21] = [
    (LitType::Null, "NULL"),
    (LitType::Bool, "BOOL"),
    (LitType::Byte, "BYTE"),
    (LitType::Int, "INT"),
    (LitType::UInt, "UINT"),
    (LitType::Vast, "VAST"),
    (LitType::UVast, "UVAST"),
    (LitType::Real32, "REAL32"),
    (LitType::Real64, "REAL64"),
    (LitType::TextStr, "TEXTSTR"),
    (LitType::ByteStr, "BYTESTR"),
    (LitType::Tp, "TP"),
    (LitType::Td, "TD"),
    (LitType::Label, "LABEL"),
    (LitType::Cbor, "CBOR"),
    (LitType::AriType, "ARITYPE"),
    (LitType::Ac, "AC"),
    (LitType::Am, "AM"),
    (LitType::Tbl, "TBL"),
    (LitType::ExecSet, "EXECSET"),
    (LitType::RptSet, "RPTSET"),
];

const OBJECT_TYPES: [(ObjectType, &str); 9] = [
    (ObjectType::Ident, "IDENT"),
    (ObjectType::Const, "CONST"),
    (ObjectType::Ctrl, "CTRL"),
    (ObjectType::Edd, "EDD"),
    (ObjectType::Oper, "OPER"),
    (ObjectType::Sbr, "SBR"),
    (ObjectType::Tbr, "TBR"),
    (ObjectType::Var, "VAR"),
    (ObjectType::Typedef, "TYPEDEF"),
];

impl LitType {
    /// Numeric protocol code.
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Look up a literal type by its numeric code.
    pub fn from_code(code: i64) -> Option<Self> {
        LIT_TYPES
            .iter()
            .find(|(ty, _)| i64::from(ty.code()) == code)
            .map(|(ty, _)| *ty)
    }

    /// Canonical upper-case name.
    pub fn name(self) -> &'static str {
        LIT_TYPES
            .iter()
            .find(|(ty, _)| *ty == self)
            .map(|(_, name)| *name)
            .unwrap_or("LITERAL")
    }

    /// Look up a literal type by name, ignoring ASCII case.
    pub fn from_name(name: &str) -> Option<Self> {
        LIT_TYPES
            .iter()
            .find(|(_, n)| n.eq_ignore_ascii_case(name))
            .map(|(ty, _)| *ty)
    }

    /// True for the container types that carry nested ARIs.
    pub fn is_container(self) -> bool {
        matches!(
            self,
            Self::Ac | Self::Am | Self::Tbl | Self::ExecSet | Self::RptSet
        )
    }
}

impl ObjectType {
    /// Numeric protocol code.
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Look up an object type by its numeric code.
    pub fn from_code(code: i64) -> Option<Self> {
        OBJECT_TYPES
            .iter()
            .find(|(ty, _)| i64::from(ty.code()) == code)
            .map(|(ty, _)| *ty)
    }

    /// Canonical upper-case name.
    pub fn name(self) -> &'static str {
        OBJECT_TYPES
            .iter()
            .find(|(ty, _)| *ty == self)
            .map(|(_, name)| *name)
            .unwrap_or("OBJECT")
    }

    /// Look up an object type by name, ignoring ASCII case.
    pub fn from_name(name: &str) -> Option<Self> {
        OBJECT_TYPES
            .iter()
            .find(|(_, n)| n.eq_ignore_ascii_case(name))
            .map(|(ty, _)| *ty)
    }

    /// All object types in table order.
    pub fn all() -> impl Iterator<Item = ObjectType> {
        OBJECT_TYPES.iter().map(|(ty, _)| *ty)
    }
}

impl fmt::Display for LitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lit_type_codes() {
        assert_eq!(LitType::from_code(4), Some(LitType::Int));
        assert_eq!(LitType::from_code(17), Some(LitType::Ac));
        assert_eq!(LitType::from_code(3), None);
        assert_eq!(LitType::from_code(-1), None);
        assert_eq!(LitType::RptSet.code(), 21);
    }

    #[test]
    fn test_object_type_codes() {
        assert_eq!(ObjectType::from_code(-1), Some(ObjectType::Ident));
        assert_eq!(ObjectType::from_code(-12), Some(ObjectType::Typedef));
        assert_eq!(ObjectType::from_code(-5), None);
        assert_eq!(ObjectType::from_code(0x99FF), None);
        assert_eq!(ObjectType::all().count(), 9);
    }

    #[test]
    fn test_names_are_case_insensitive() {
        assert_eq!(ObjectType::from_name("ident"), Some(ObjectType::Ident));
        assert_eq!(ObjectType::from_name("Ctrl"), Some(ObjectType::Ctrl));
        assert_eq!(LitType::from_name("textstr"), Some(LitType::TextStr));
        assert_eq!(LitType::from_name("nope"), None);
        assert_eq!(ObjectType::Edd.to_string(), "EDD");
        assert_eq!(LitType::UVast.to_string(), "UVAST");
    }

    #[test]
    fn test_container_types() {
        assert!(LitType::Am.is_container());
        assert!(!LitType::Tp.is_container());
    }
}
