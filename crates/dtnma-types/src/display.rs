//! Human-readable text form of ARIs, for logs and the CLI.
//!
//! Top-level values carry the `ari:` scheme; nested values omit it.
//! This is a diagnostic rendering only and there is no parser for it.

use crate::ari::{Ari, IdSeg, Literal, Params, Prim, Reference};
use crate::ari_type::ObjectType;
use crate::containers::Nonce;
use crate::time::Timespec;
use chrono::SecondsFormat;
use std::fmt::{self, Write};

impl fmt::Display for Ari {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ari:")?;
        write_ari(f, self)
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ari:")?;
        write_ref(f, self)
    }
}

impl fmt::Display for IdSeg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent => Ok(()),
            Self::Int(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
        }
    }
}

impl fmt::Display for Prim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::UInt(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v:?}"),
            Self::Text(v) => write!(f, "{v:?}"),
            Self::Bytes(v) => {
                f.write_str("h'")?;
                for b in v {
                    write!(f, "{b:02X}")?;
                }
                f.write_char('\'')
            }
        }
    }
}

impl fmt::Display for Nonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Bytes(v) => fmt::Display::fmt(&Prim::Bytes(v.clone()), f),
        }
    }
}

fn write_ari(f: &mut fmt::Formatter<'_>, ari: &Ari) -> fmt::Result {
    match ari {
        Ari::Ref(r) => write_ref(f, r),
        Ari::Lit(lit) => write_lit(f, lit),
    }
}

fn write_ref(f: &mut fmt::Formatter<'_>, r: &Reference) -> fmt::Result {
    if r.type_id.is_absent() && r.obj_id.is_absent() && matches!(r.params, Params::None) {
        return write!(f, "//{}/", r.ns_id);
    }
    let ty = match r.object_type() {
        Some(ty) => ty.name().to_string(),
        None => r.type_id.to_string(),
    };
    write!(f, "//{}/{}/{}", r.ns_id, ty, r.obj_id)?;
    match &r.params {
        Params::None => Ok(()),
        Params::Ac(items) => write_list(f, items),
        Params::Am(map) => write_pairs(f, map.iter()),
    }
}

fn write_lit(f: &mut fmt::Formatter<'_>, lit: &Literal) -> fmt::Result {
    match lit {
        Literal::Untyped(v) => write!(f, "{v}"),
        Literal::Typed(ty, v) => write!(f, "/{ty}/{v}"),
        Literal::Tp(ts) => write!(f, "/TP/{}", time_point(ts)),
        Literal::Td(ts) => write!(f, "/TD/{ts}"),
        Literal::Ac(items) => {
            f.write_str("/AC/")?;
            write_list(f, items)
        }
        Literal::Am(map) => {
            f.write_str("/AM/")?;
            write_pairs(f, map.iter())
        }
        Literal::Tbl(tbl) => {
            write!(f, "/TBL/c={};", tbl.ncols())?;
            for row in tbl.rows() {
                write_list(f, row)?;
            }
            Ok(())
        }
        Literal::ExecSet(set) => {
            write!(f, "/EXECSET/n={};", set.nonce)?;
            write_list(f, &set.targets)
        }
        Literal::RptSet(set) => {
            write!(f, "/RPTSET/n={};r={};", set.nonce, time_point(&set.ref_time))?;
            for rpt in &set.reports {
                write!(f, "(t={};s=", rpt.rel_time)?;
                write_ari(f, &rpt.source)?;
                f.write_char(';')?;
                write_list(f, &rpt.items)?;
                f.write_char(')')?;
            }
            Ok(())
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Ari]) -> fmt::Result {
    f.write_char('(')?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_char(',')?;
        }
        write_ari(f, item)?;
    }
    f.write_char(')')
}

fn write_pairs<'a>(
    f: &mut fmt::Formatter<'_>,
    pairs: impl Iterator<Item = (&'a Ari, &'a Ari)>,
) -> fmt::Result {
    f.write_char('(')?;
    for (i, (key, value)) in pairs.enumerate() {
        if i > 0 {
            f.write_char(',')?;
        }
        write_ari(f, key)?;
        f.write_char('=')?;
        write_ari(f, value)?;
    }
    f.write_char(')')
}

fn time_point(ts: &Timespec) -> String {
    match ts.to_datetime() {
        Some(dt) => dt.to_rfc3339_opts(SecondsFormat::AutoSi, true),
        None => ts.to_string(),
    }
}

/// Short label for an object type segment, used in log fields.
pub fn type_label(seg: &IdSeg) -> String {
    match seg {
        IdSeg::Int(code) => ObjectType::from_code(*code)
            .map(|ty| ty.name().to_string())
            .unwrap_or_else(|| code.to_string()),
        IdSeg::Text(name) => name.clone(),
        IdSeg::Absent => "(none)".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ari::AriMap;
    use crate::ari_type::LitType;
    use crate::containers::{ExecSet, Table};

    #[test]
    fn test_primitives() {
        assert_eq!(Ari::null().to_string(), "ari:null");
        assert_eq!(Ari::bool(true).to_string(), "ari:true");
        assert_eq!(Ari::int(-3).to_string(), "ari:-3");
        assert_eq!(Ari::float(1.0).to_string(), "ari:1.0");
        assert_eq!(Ari::text("hi").to_string(), "ari:\"hi\"");
        assert_eq!(Ari::bytes(vec![0x0A, 0x0B]).to_string(), "ari:h'0A0B'");
    }

    #[test]
    fn test_typed_and_containers() {
        let typed = Ari::typed(LitType::Int, Prim::Int(10)).unwrap();
        assert_eq!(typed.to_string(), "ari:/INT/10");
        assert_eq!(Ari::ac(vec![Ari::int(1), Ari::int(2)]).to_string(), "ari:/AC/(1,2)");

        let map: AriMap = [(Ari::text("a"), Ari::int(1))].into_iter().collect();
        assert_eq!(Ari::am(map).to_string(), "ari:/AM/(\"a\"=1)");

        let tbl = Table::from_items(2, vec![Ari::int(1), Ari::int(2), Ari::int(3), Ari::int(4)])
            .unwrap();
        assert_eq!(Ari::from(Literal::Tbl(tbl)).to_string(), "ari:/TBL/c=2;(1,2)(3,4)");
    }

    #[test]
    fn test_times() {
        assert_eq!(Ari::td(Timespec::new(1, 500_000_000)).to_string(), "ari:/TD/1.5");
        assert_eq!(
            Ari::tp(Timespec::from_secs(20)).to_string(),
            "ari:/TP/2000-01-01T00:00:20Z"
        );
    }

    #[test]
    fn test_references() {
        let r = Reference::new(25, ObjectType::Ident, 1).with_params(vec![Ari::int(10)]);
        assert_eq!(Ari::from(r).to_string(), "ari://25/IDENT/1(10)");

        let odd = Reference::new("adm", 0x99FF, "x");
        assert_eq!(odd.to_string(), "ari://adm/39423/x");
        assert_eq!(Reference::namespace(18).to_string(), "ari://18/");

        let set = ExecSet {
            nonce: Nonce::Int(5),
            targets: vec![Ari::from(Reference::new(1, ObjectType::Ctrl, 2))],
        };
        assert_eq!(
            Ari::from(Literal::ExecSet(set)).to_string(),
            "ari:/EXECSET/n=5;(//1/CTRL/2)"
        );
    }

    #[test]
    fn test_type_label() {
        assert_eq!(type_label(&IdSeg::Int(-4)), "EDD");
        assert_eq!(type_label(&IdSeg::Int(7)), "7");
        assert_eq!(type_label(&IdSeg::from("ctrl")), "ctrl");
        assert_eq!(type_label(&IdSeg::Absent), "(none)");
    }
}
