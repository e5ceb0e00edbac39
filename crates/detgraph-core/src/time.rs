//! Time primitives for the graph and the timer service
//!
//! All times are milliseconds. Delays and periods are unsigned offsets;
//! points in time are signed so that a wall-clock offset can move them
//! either way from the monotonic reference.

use std::ops::{Add, Sub};

/// Relative time in milliseconds (delays, periods)
pub type TimeOffset = u64;

/// Point in time, milliseconds since the clock's reference
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub const ZERO: Timestamp = Timestamp(0);

    #[inline]
    pub fn from_millis(millis: i64) -> Self {
        Timestamp(millis)
    }

    #[inline]
    pub fn as_millis(self) -> i64 {
        self.0
    }

    /// Shift by a signed offset (wall-clock correction)
    #[inline]
    pub fn offset_by(self, offset_ms: i64) -> Self {
        Timestamp(self.0.saturating_add(offset_ms))
    }

    /// Milliseconds from `earlier` to `self`, zero if `earlier` is later
    #[inline]
    pub fn since(self, earlier: Timestamp) -> TimeOffset {
        self.0.saturating_sub(earlier.0).max(0) as TimeOffset
    }
}

impl Add<TimeOffset> for Timestamp {
    type Output = Timestamp;

    #[inline]
    fn add(self, rhs: TimeOffset) -> Self::Output {
        Timestamp(self.0.saturating_add(rhs.min(i64::MAX as u64) as i64))
    }
}

impl Sub<Timestamp> for Timestamp {
    type Output = TimeOffset;

    #[inline]
    fn sub(self, rhs: Timestamp) -> Self::Output {
        self.since(rhs)
    }
}

impl std::fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "t({}ms)", self.0)
    }
}

impl From<i64> for Timestamp {
    fn from(millis: i64) -> Self {
        Timestamp(millis)
    }
}
