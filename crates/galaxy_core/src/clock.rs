//! Timestamps and the clock seam.
//!
//! The core never reads the wall clock. Callers hand in a [`Timestamp`] and
//! aggregates turn the gap since their last update into elapsed [`Seconds`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::math::{Fixed, Seconds};

/// Milliseconds since the Unix epoch.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// The epoch.
    pub const ZERO: Self = Self(0);

    /// Create a timestamp from milliseconds.
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Create a timestamp from whole seconds.
    #[must_use]
    pub const fn from_secs(secs: u64) -> Self {
        Self(secs.saturating_mul(1000))
    }

    /// Milliseconds since the epoch.
    #[must_use]
    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// This timestamp moved forward by whole seconds.
    #[must_use]
    pub const fn plus_secs(self, secs: u64) -> Self {
        Self(self.0.saturating_add(secs.saturating_mul(1000)))
    }

    /// This timestamp moved back by fractional seconds, to the millisecond.
    #[must_use]
    pub fn minus_seconds(self, secs: Seconds) -> Self {
        let millis: u64 = secs.saturating_mul_int(1000).saturating_to_num();
        Self(self.0.saturating_sub(millis))
    }

    /// Seconds elapsed since `earlier`.
    ///
    /// Zero when the clock went backwards; [`Fixed::MAX`] when the gap does
    /// not fit the fixed-point range.
    #[must_use]
    pub fn seconds_since(self, earlier: Self) -> Seconds {
        let millis = self.0.saturating_sub(earlier.0);
        let Some(whole) = Fixed::checked_from_num(millis / 1000) else {
            return Fixed::MAX;
        };
        let frac = Fixed::from_num(millis % 1000) / Fixed::from_num(1000);
        whole.saturating_add(frac)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

/// Source of the current time.
pub trait Clock {
    /// The current time.
    fn now(&self) -> Timestamp;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seconds_since() {
        let a = Timestamp::from_secs(10);
        let b = Timestamp::from_millis(12_500);
        assert_eq!(b.seconds_since(a), Fixed::from_num(2.5));
    }

    #[test]
    fn test_seconds_since_backwards_is_zero() {
        let a = Timestamp::from_secs(10);
        let b = Timestamp::from_secs(5);
        assert_eq!(b.seconds_since(a), Fixed::ZERO);
    }

    #[test]
    fn test_seconds_since_saturates() {
        let far = Timestamp::from_millis(u64::MAX);
        assert_eq!(far.seconds_since(Timestamp::ZERO), Fixed::MAX);
    }

    #[test]
    fn test_minus_seconds() {
        let t = Timestamp::from_secs(10);
        assert_eq!(t.minus_seconds(Fixed::from_num(2.5)), Timestamp::from_millis(7_500));
        assert_eq!(t.minus_seconds(Fixed::from_num(60)), Timestamp::ZERO);
    }
}
