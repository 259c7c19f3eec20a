//! Formal parameters and the value conversions used to bind actuals.

use dtnma_types::{Ari, LitType, Literal, ObjectType, Prim, Timespec};

/// Declared type of a formal parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    /// Accepts any value unchanged.
    Any,
    /// A built-in literal type.
    Lit(LitType),
    /// A reference to an object of the given type.
    Object(ObjectType),
}

impl ParamType {
    /// Convert an actual value to this type.
    ///
    /// Primitive results come out tagged with the target literal type.
    /// Returns `None` when the value cannot be represented.
    pub fn convert(&self, value: &Ari) -> Option<Ari> {
        match self {
            Self::Any => Some(value.clone()),
            Self::Object(ty) => match value.as_reference() {
                Some(r) if r.object_type() == Some(*ty) => Some(value.clone()),
                _ => None,
            },
            Self::Lit(ty) => convert_literal(*ty, value.as_literal()?),
        }
    }
}

fn convert_literal(ty: LitType, lit: &Literal) -> Option<Ari> {
    let typed = |prim: Prim| Some(Ari::Lit(Literal::Typed(ty, prim)));
    match ty {
        LitType::Null => typed(Prim::Null),
        LitType::Bool => typed(Prim::Bool(truthy(lit))),
        LitType::Byte => to_int(lit, 0, i128::from(u8::MAX)).and_then(|v| typed(unsigned(v))),
        LitType::Int => {
            to_int(lit, i128::from(i32::MIN), i128::from(i32::MAX)).and_then(|v| typed(signed(v)))
        }
        LitType::UInt => to_int(lit, 0, i128::from(u32::MAX)).and_then(|v| typed(unsigned(v))),
        LitType::Vast => {
            to_int(lit, i128::from(i64::MIN), i128::from(i64::MAX)).and_then(|v| typed(signed(v)))
        }
        LitType::UVast => to_int(lit, 0, i128::from(u64::MAX)).and_then(|v| typed(unsigned(v))),
        LitType::Real32 | LitType::Real64 => {
            let value = to_float(lit)?;
            let fits = ty == LitType::Real64
                || !value.is_finite()
                || value.abs() <= f64::from(f32::MAX);
            if fits {
                typed(Prim::Float(value))
            } else {
                None
            }
        }
        LitType::Tp => match lit {
            Literal::Td(_) => None,
            _ => to_time(lit).map(Ari::tp),
        },
        LitType::Td => match lit {
            Literal::Tp(_) => None,
            _ => to_time(lit).map(Ari::td),
        },
        LitType::TextStr
        | LitType::ByteStr
        | LitType::Label
        | LitType::Cbor
        | LitType::AriType => {
            let prim = lit.prim()?;
            if ty.admits(prim) {
                typed(prim.clone())
            } else {
                None
            }
        }
        LitType::Ac | LitType::Am | LitType::Tbl | LitType::ExecSet | LitType::RptSet => {
            if lit.lit_type() == Some(ty) {
                Some(Ari::Lit(lit.clone()))
            } else {
                None
            }
        }
    }
}

fn truthy(lit: &Literal) -> bool {
    match lit {
        Literal::Untyped(prim) | Literal::Typed(_, prim) => match prim {
            Prim::Null => false,
            Prim::Bool(v) => *v,
            Prim::Int(v) => *v != 0,
            Prim::UInt(v) => *v != 0,
            Prim::Float(v) => !v.is_nan() && *v != 0.0,
            Prim::Text(v) => !v.is_empty(),
            Prim::Bytes(v) => !v.is_empty(),
        },
        Literal::Tp(ts) | Literal::Td(ts) => *ts != Timespec::default(),
        _ => true,
    }
}

/// Integer value within `lo..=hi`; floats round half away from zero.
fn to_int(lit: &Literal, lo: i128, hi: i128) -> Option<i128> {
    let value = match lit.prim()? {
        Prim::Float(v) => {
            let rounded = v.round();
            if !rounded.is_finite() || rounded.abs() >= 2f64.powi(64) {
                return None;
            }
            rounded as i128
        }
        prim => prim.as_i128()?,
    };
    (lo..=hi).contains(&value).then_some(value)
}

fn to_float(lit: &Literal) -> Option<f64> {
    match lit.prim()? {
        Prim::Float(v) => Some(*v),
        Prim::Int(v) => Some(*v as f64),
        Prim::UInt(v) => Some(*v as f64),
        _ => None,
    }
}

fn to_time(lit: &Literal) -> Option<Timespec> {
    match lit {
        Literal::Tp(ts) | Literal::Td(ts) => Some(*ts),
        _ => match lit.prim()? {
            Prim::Float(v) if v.is_finite() => {
                Timespec::from_total_nanos((v * 1e9).trunc() as i128)
            }
            prim => i64::try_from(prim.as_i128()?).ok().map(Timespec::from_secs),
        },
    }
}

fn signed(value: i128) -> Prim {
    // Callers bound the range to i64 first.
    Prim::Int(value as i64)
}

fn unsigned(value: i128) -> Prim {
    Prim::UInt(value as u64)
}

/// A formal parameter declared on an object.
#[derive(Debug, Clone, PartialEq)]
pub struct FormalParam {
    /// Position in the formal list, assigned at registration.
    pub index: usize,
    pub name: String,
    pub ty: ParamType,
    /// Value bound when no actual is given, already converted to `ty`.
    pub default: Option<Ari>,
}

impl FormalParam {
    /// A required parameter (no default).
    pub fn new(name: impl Into<String>, ty: ParamType) -> Self {
        Self {
            index: 0,
            name: name.into(),
            ty,
            default: None,
        }
    }

    pub fn with_default(mut self, default: Ari) -> Self {
        self.default = Some(default);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dtnma_types::Reference;

    fn int_ty() -> ParamType {
        ParamType::Lit(LitType::Int)
    }

    #[test]
    fn test_int_range() {
        let out = int_ty().convert(&Ari::uint(10)).unwrap();
        assert_eq!(out, Ari::Lit(Literal::Typed(LitType::Int, Prim::Int(10))));
        assert!(int_ty().convert(&Ari::int(i64::from(i32::MAX) + 1)).is_none());
        assert!(ParamType::Lit(LitType::Byte).convert(&Ari::int(-1)).is_none());
        assert!(ParamType::Lit(LitType::UVast).convert(&Ari::uint(u64::MAX)).is_some());
    }

    #[test]
    fn test_int_rejects_non_numbers() {
        assert!(int_ty().convert(&Ari::null()).is_none());
        assert!(int_ty().convert(&Ari::text("10")).is_none());
        assert!(int_ty().convert(&Ari::bool(true)).is_none());
        let r = Ari::from(Reference::new(1, ObjectType::Ident, 1));
        assert!(int_ty().convert(&r).is_none());
    }

    #[test]
    fn test_float_to_int_rounds() {
        let out = int_ty().convert(&Ari::float(2.5)).unwrap();
        assert_eq!(out.as_i64(), Some(3));
        assert!(int_ty().convert(&Ari::float(f64::NAN)).is_none());
    }

    #[test]
    fn test_real_conversions() {
        let real = ParamType::Lit(LitType::Real64);
        assert_eq!(
            real.convert(&Ari::int(3)),
            Some(Ari::Lit(Literal::Typed(LitType::Real64, Prim::Float(3.0))))
        );
        assert!(ParamType::Lit(LitType::Real32).convert(&Ari::float(1e300)).is_none());
        assert!(real.convert(&Ari::text("x")).is_none());
    }

    #[test]
    fn test_bool_is_truthy() {
        let b = ParamType::Lit(LitType::Bool);
        assert_eq!(b.convert(&Ari::int(0)).and_then(|v| v.as_bool()), Some(false));
        assert_eq!(b.convert(&Ari::text("x")).and_then(|v| v.as_bool()), Some(true));
        assert_eq!(b.convert(&Ari::null()).and_then(|v| v.as_bool()), Some(false));
        assert_eq!(b.convert(&Ari::ac(vec![])).and_then(|v| v.as_bool()), Some(true));
    }

    #[test]
    fn test_null_accepts_anything() {
        let n = ParamType::Lit(LitType::Null);
        assert!(n.convert(&Ari::int(5)).map(|v| v.is_null()).unwrap_or(false));
    }

    #[test]
    fn test_time_kinds_do_not_mix() {
        let tp = ParamType::Lit(LitType::Tp);
        let td = ParamType::Lit(LitType::Td);
        assert_eq!(tp.convert(&Ari::int(20)), Some(Ari::tp(Timespec::from_secs(20))));
        assert_eq!(
            td.convert(&Ari::float(1.5)),
            Some(Ari::td(Timespec::new(1, 500_000_000)))
        );
        assert!(tp.convert(&Ari::td(Timespec::from_secs(1))).is_none());
        assert!(td.convert(&Ari::tp(Timespec::from_secs(1))).is_none());
    }

    #[test]
    fn test_exact_kinds() {
        let text = ParamType::Lit(LitType::TextStr);
        assert!(text.convert(&Ari::text("a")).is_some());
        assert!(text.convert(&Ari::bytes(vec![1])).is_none());
        let ac = ParamType::Lit(LitType::Ac);
        assert_eq!(ac.convert(&Ari::ac(vec![Ari::int(1)])), Some(Ari::ac(vec![Ari::int(1)])));
        assert!(ac.convert(&Ari::int(1)).is_none());
    }

    #[test]
    fn test_object_reference_type() {
        let edd = ParamType::Object(ObjectType::Edd);
        let r = Ari::from(Reference::new("adm", "edd", "x"));
        assert!(edd.convert(&r).is_some());
        let ctrl = Ari::from(Reference::new("adm", ObjectType::Ctrl, "x"));
        assert!(edd.convert(&ctrl).is_none());
        assert!(edd.convert(&Ari::int(1)).is_none());
        assert_eq!(ParamType::Any.convert(&ctrl), Some(ctrl));
    }
}
