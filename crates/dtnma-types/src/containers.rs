//! Structured container literals: tables, execution sets, and report sets.

use crate::ari::{Ari, Prim};
use crate::error::{AriError, AriResult};
use crate::time::Timespec;

/// Correlation value shared by an execution set and the reports it causes.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Nonce {
    #[default]
    Null,
    Int(u64),
    Bytes(Vec<u8>),
}

impl Nonce {
    /// The nonce as an untyped primitive ARI.
    pub fn to_ari(&self) -> Ari {
        match self {
            Self::Null => Ari::null(),
            Self::Int(v) => Ari::uint(*v),
            Self::Bytes(v) => Ari::bytes(v.clone()),
        }
    }

    /// Accept a null, non-negative integer, or byte-string primitive.
    pub fn from_ari(value: &Ari) -> AriResult<Self> {
        match value.as_prim() {
            Some(Prim::Null) => Ok(Self::Null),
            Some(Prim::Bytes(v)) => Ok(Self::Bytes(v.clone())),
            Some(p) => p
                .as_i128()
                .and_then(|v| u64::try_from(v).ok())
                .map(Self::Int)
                .ok_or(AriError::InvalidNonce),
            None => Err(AriError::InvalidNonce),
        }
    }
}

/// A row-major table with a fixed column count.
///
/// The item count is always a multiple of the column count.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Table {
    ncols: usize,
    items: Vec<Ari>,
}

impl Table {
    /// An empty table.
    pub fn new(ncols: usize) -> Self {
        Self {
            ncols,
            items: Vec::new(),
        }
    }

    /// Build from a flat item list, rejecting a partial final row.
    pub fn from_items(ncols: usize, items: Vec<Ari>) -> AriResult<Self> {
        let whole = if ncols == 0 {
            items.is_empty()
        } else {
            items.len() % ncols == 0
        };
        if !whole {
            return Err(AriError::TableShape {
                ncols,
                items: items.len(),
            });
        }
        Ok(Self { ncols, items })
    }

    /// Append a row of exactly `ncols` values.
    pub fn push_row(&mut self, row: Vec<Ari>) -> AriResult<()> {
        if row.len() != self.ncols {
            return Err(AriError::RowWidth {
                expected: self.ncols,
                got: row.len(),
            });
        }
        self.items.extend(row);
        Ok(())
    }

    pub fn ncols(&self) -> usize {
        self.ncols
    }

    pub fn nrows(&self) -> usize {
        if self.ncols == 0 {
            0
        } else {
            self.items.len() / self.ncols
        }
    }

    /// All items in row-major order.
    pub fn items(&self) -> &[Ari] {
        &self.items
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Ari]> {
        self.items.chunks(self.ncols.max(1))
    }
}

/// A set of execution targets sent to an agent.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExecSet {
    pub nonce: Nonce,
    pub targets: Vec<Ari>,
}

/// A single report within a report set.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Report {
    /// Offset from the set's reference time.
    pub rel_time: Timespec,
    /// The object that produced the report.
    pub source: Ari,
    pub items: Vec<Ari>,
}

/// A set of reports sent from an agent.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RptSet {
    pub nonce: Nonce,
    /// Absolute time point the reports are relative to.
    pub ref_time: Timespec,
    pub reports: Vec<Report>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_shape() {
        let items = vec![Ari::int(1), Ari::int(2), Ari::int(3)];
        assert_eq!(
            Table::from_items(2, items.clone()),
            Err(AriError::TableShape { ncols: 2, items: 3 })
        );
        let tbl = Table::from_items(3, items).unwrap();
        assert_eq!(tbl.nrows(), 1);
        assert_eq!(tbl.rows().next().map(<[Ari]>::len), Some(3));
    }

    #[test]
    fn test_table_push_row() {
        let mut tbl = Table::new(2);
        tbl.push_row(vec![Ari::text("a"), Ari::int(1)]).unwrap();
        assert_eq!(
            tbl.push_row(vec![Ari::text("b")]),
            Err(AriError::RowWidth {
                expected: 2,
                got: 1
            })
        );
        assert_eq!(tbl.nrows(), 1);
        assert_eq!(tbl.items().len(), 2);
    }

    #[test]
    fn test_zero_column_table() {
        assert!(Table::from_items(0, vec![]).is_ok());
        assert!(Table::from_items(0, vec![Ari::null()]).is_err());
        assert_eq!(Table::new(0).rows().count(), 0);
    }

    #[test]
    fn test_nonce_from_ari() {
        assert_eq!(Nonce::from_ari(&Ari::null()), Ok(Nonce::Null));
        assert_eq!(Nonce::from_ari(&Ari::int(42)), Ok(Nonce::Int(42)));
        assert_eq!(
            Nonce::from_ari(&Ari::bytes(vec![1, 2])),
            Ok(Nonce::Bytes(vec![1, 2]))
        );
        assert_eq!(Nonce::from_ari(&Ari::int(-1)), Err(AriError::InvalidNonce));
        assert_eq!(Nonce::from_ari(&Ari::text("x")), Err(AriError::InvalidNonce));
        assert_eq!(Nonce::Int(7).to_ari(), Ari::uint(7));
    }
}
