//! Time values carried by TP and TD literals.
//!
//! Time points are offsets from the DTN epoch (2000-01-01T00:00:00Z).

use chrono::{DateTime, Utc};
use std::fmt;

/// Seconds between the Unix epoch and the DTN epoch.
pub const DTN_EPOCH_UNIX_SECS: i64 = 946_684_800;

const NANOS_PER_SEC: i128 = 1_000_000_000;

/// A signed time value with nanosecond resolution.
///
/// Always normalized so that `nanos < 1_000_000_000`; negative values carry
/// the sign in `secs`, e.g. -0.5s is `secs = -1, nanos = 500_000_000`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timespec {
    secs: i64,
    nanos: u32,
}

impl Timespec {
    /// Build from whole seconds plus a nanosecond part (carried if >= 1s).
    pub fn new(secs: i64, nanos: u32) -> Self {
        let carry = i64::from(nanos / 1_000_000_000);
        Self {
            secs: secs.saturating_add(carry),
            nanos: nanos % 1_000_000_000,
        }
    }

    /// Whole seconds with no fractional part.
    pub fn from_secs(secs: i64) -> Self {
        Self { secs, nanos: 0 }
    }

    pub fn secs(&self) -> i64 {
        self.secs
    }

    pub fn nanos(&self) -> u32 {
        self.nanos
    }

    /// Total signed nanoseconds.
    pub fn total_nanos(&self) -> i128 {
        i128::from(self.secs) * NANOS_PER_SEC + i128::from(self.nanos)
    }

    /// Inverse of [`Timespec::total_nanos`]; `None` when seconds overflow.
    pub fn from_total_nanos(total: i128) -> Option<Self> {
        let secs = i64::try_from(total.div_euclid(NANOS_PER_SEC)).ok()?;
        let nanos = total.rem_euclid(NANOS_PER_SEC) as u32;
        Some(Self { secs, nanos })
    }

    /// Decimal-fraction form `(exponent, mantissa)` with trailing zeros
    /// folded into the exponent. `None` if the mantissa exceeds 64 bits.
    pub fn to_decimal(&self) -> Option<(i64, i64)> {
        let mut mantissa = self.total_nanos();
        let mut exp: i64 = -9;
        while mantissa != 0 && mantissa % 10 == 0 && exp < 9 {
            mantissa /= 10;
            exp += 1;
        }
        Some((exp, i64::try_from(mantissa).ok()?))
    }

    /// Build from a decimal fraction; the exponent is limited to `-9..=9`.
    pub fn from_decimal(exp: i64, mantissa: i64) -> Option<Self> {
        if !(-9..=9).contains(&exp) {
            return None;
        }
        let scale = 10i128.pow((exp + 9) as u32);
        Self::from_total_nanos(i128::from(mantissa) * scale)
    }

    /// Interpret as a time point relative to the DTN epoch.
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        let unix = self.secs.checked_add(DTN_EPOCH_UNIX_SECS)?;
        DateTime::from_timestamp(unix, self.nanos)
    }

    /// Time point for a UTC instant.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self::new(
            dt.timestamp() - DTN_EPOCH_UNIX_SECS,
            dt.timestamp_subsec_nanos(),
        )
    }
}

impl fmt::Display for Timespec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self.total_nanos();
        let sign = if total < 0 { "-" } else { "" };
        let abs = total.unsigned_abs();
        let whole = abs / NANOS_PER_SEC as u128;
        let frac = abs % NANOS_PER_SEC as u128;
        if frac == 0 {
            write!(f, "{sign}{whole}")
        } else {
            let digits = format!("{frac:09}");
            write!(f, "{sign}{whole}.{}", digits.trim_end_matches('0'))
        }
    }
}
