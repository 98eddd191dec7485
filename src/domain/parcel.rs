//! Parcel identifier (PNU) encoding
//!
//! A PNU is 19 characters: the 10-digit administrative (legal dong) code,
//! one segment digit, then the main and sub lot numbers zero-padded to four
//! digits each.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Length of the administrative code prefix
pub const ADMIN_CODE_LEN: usize = 10;

/// Total PNU length
pub const PNU_LEN: usize = 19;

/// Largest lot number that fits the four-digit field
const MAX_LOT_NUMBER: u32 = 9999;

/// Whether a parcel is ordinary ground or mountain land
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LandSegment {
    Ground,
    Mountain,
}

impl LandSegment {
    /// Read the address service's mountain flag (`mtYn`).
    ///
    /// The flag is `"1"` for mountain land and `"0"` (or anything else, or
    /// missing) for ground. Note the inversion against [`Self::pnu_digit`]:
    /// flag `"1"` becomes digit `2`, flag `"0"` becomes digit `1`.
    pub fn from_mountain_flag(flag: Option<&str>) -> Self {
        match flag.map(str::trim) {
            Some("1") => Self::Mountain,
            _ => Self::Ground,
        }
    }

    pub fn from_is_mountain(is_mountain: bool) -> Self {
        if is_mountain {
            Self::Mountain
        } else {
            Self::Ground
        }
    }

    /// Segment digit inside the PNU
    pub fn pnu_digit(self) -> char {
        match self {
            Self::Ground => '1',
            Self::Mountain => '2',
        }
    }
}

/// A validated 19-character parcel identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParcelId(String);

impl ParcelId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ParcelId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParcelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Best-effort lot number parsing; anything unparseable or wider than four digits is `0`
fn coerce_lot_number(raw: &str) -> u32 {
    raw.trim()
        .parse::<u32>()
        .ok()
        .filter(|n| *n <= MAX_LOT_NUMBER)
        .unwrap_or(0)
}

/// Encode a PNU from address fields.
///
/// Returns `None` only when `admin_code` is not exactly ten characters.
pub fn encode_pnu(
    admin_code: &str,
    segment: LandSegment,
    main_lot: &str,
    sub_lot: &str,
) -> Option<ParcelId> {
    if admin_code.chars().count() != ADMIN_CODE_LEN {
        return None;
    }

    let main = coerce_lot_number(main_lot);
    let sub = coerce_lot_number(sub_lot);

    Some(ParcelId(format!(
        "{admin_code}{}{main:04}{sub:04}",
        segment.pnu_digit()
    )))
}
