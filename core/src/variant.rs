//! A/B bucketing for the downsell offer.
//!
//! The bucket is a pure function of the user id so the same user lands in
//! the same bucket on every device. The flow persists the first assignment
//! and always prefers the stored value afterwards.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum DownsellVariant {
    A,
    B,
}

impl DownsellVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
        }
    }
}

impl fmt::Display for DownsellVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DownsellVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" => Ok(Self::A),
            "B" => Ok(Self::B),
            other => Err(format!("unknown downsell variant '{other}'")),
        }
    }
}

/// Multiplicative rolling hash (`h * 31 + unit`) over the UTF-16 code units
/// of `user_id`, folded into a signed 32-bit integer.
pub fn user_hash(user_id: &str) -> i32 {
    user_id.encode_utf16().fold(0i32, |h, unit| {
        h.wrapping_shl(5).wrapping_sub(h).wrapping_add(i32::from(unit))
    })
}

/// Even hashes (including negative even ones) are bucket A.
pub fn variant_for_user(user_id: &str) -> DownsellVariant {
    if user_hash(user_id) % 2 == 0 {
        DownsellVariant::A
    } else {
        DownsellVariant::B
    }
}
