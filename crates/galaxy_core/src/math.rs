//! Fixed-point math utilities for deterministic simulation.
//!
//! Durations, rates, distances and speed factors are fixed-point so that a
//! catch-up over a long absence produces the same state on every machine.
//! Resource amounts are plain integers.

use std::fmt;

use fixed::types::I32F32;
use serde::{Deserialize, Serialize};

/// Fixed-point number type for all simulation math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
/// Range: approximately -2,147,483,648 to 2,147,483,647
/// Precision: approximately 0.00000000023
pub type Fixed = I32F32;

/// Elapsed or remaining time in seconds.
pub type Seconds = Fixed;

/// Seconds in one game hour; rates in the catalog are per hour.
pub const SECONDS_PER_HOUR: u32 = 3600;

/// Serde support for fixed-point numbers.
///
/// Serializes fixed-point numbers as their raw bit representation (i64)
/// to preserve exact precision across serialization boundaries.
pub mod fixed_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as its raw bit representation.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_bits().serialize(serializer)
    }

    /// Deserialize a fixed-point number from its raw bit representation.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = i64::deserialize(deserializer)?;
        Ok(Fixed::from_bits(bits))
    }
}

/// Whole units produced over `elapsed` at `rate_per_hour`.
///
/// Computes `floor(elapsed * rate / 3600)` on the raw bits, so no precision is
/// lost to an intermediate fixed-point product. Negative elapsed yields zero.
#[must_use]
pub fn hourly_yield(elapsed: Seconds, rate_per_hour: u64) -> u64 {
    let bits = i128::from(elapsed.to_bits());
    if bits <= 0 {
        return 0;
    }
    let numerator = bits * i128::from(rate_per_hour);
    let denominator = i128::from(SECONDS_PER_HOUR) << Fixed::FRAC_NBITS;
    u64::try_from(numerator / denominator).unwrap_or(u64::MAX)
}

/// Convert an integer amount to [`Fixed`], saturating at [`Fixed::MAX`].
#[must_use]
pub fn fixed_from_u64(value: u64) -> Fixed {
    Fixed::checked_from_num(value).unwrap_or(Fixed::MAX)
}

/// Integer square root (floor) of a `u128`.
#[must_use]
pub fn isqrt_u128(value: u128) -> u128 {
    if value < 2 {
        return value;
    }
    // Newton iteration from an upper bound converges monotonically downward.
    let shift = (128 - value.leading_zeros()).div_ceil(2);
    let mut x = 1u128 << shift;
    loop {
        let y = (x + value / x) >> 1;
        if y >= x {
            return x;
        }
        x = y;
    }
}

/// Integer position of a planet in the galaxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Coordinates {
    /// X coordinate.
    pub x: i32,
    /// Y coordinate.
    pub y: i32,
}

impl Coordinates {
    /// Create a new coordinate pair.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance, exact.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> u64 {
        let dx = i64::from(self.x) - i64::from(other.x);
        let dy = i64::from(self.y) - i64::from(other.y);
        dx.unsigned_abs()
            .saturating_pow(2)
            .saturating_add(dy.unsigned_abs().saturating_pow(2))
    }

    /// Euclidean distance as fixed-point.
    ///
    /// The square root is taken on the fixed-point scale, which makes the
    /// result exact to the last fractional bit.
    #[must_use]
    pub fn distance(self, other: Self) -> Fixed {
        let scaled = u128::from(self.distance_squared(other)) << (2 * Fixed::FRAC_NBITS);
        let bits = isqrt_u128(scaled);
        // u64 squared distance shifted by 64 bits always fits in u128
        i64::try_from(bits).map_or(Fixed::MAX, Fixed::from_bits)
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}
