//! Identity types for the graph and the timer service
//!
//! Detector and topic ids are dense indices in registration order; timer
//! handles are opaque and unique across the whole process.

use std::fmt;

/// Detector identity - index in registration order
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DetectorId(pub usize);

impl DetectorId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for DetectorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Detector({})", self.0)
    }
}

impl fmt::Display for DetectorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Topic identity - index in resolution order, one per state type
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TopicId(pub usize);

impl TopicId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for TopicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Topic({})", self.0)
    }
}

/// Timer slot identity
///
/// Allocated once per timeout-capable role and reused across reschedules.
/// Handles come from one process-wide counter and are ordered by
/// allocation, which is also the firing order for timers sharing a deadline.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TimerHandle(pub u64);

impl TimerHandle {
    #[inline]
    pub fn new(id: u64) -> Self {
        TimerHandle(id)
    }

    #[inline]
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timer({})", self.0)
    }
}

impl fmt::Display for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_handle_order_follows_allocation() {
        let first = TimerHandle::new(1);
        let second = TimerHandle::new(2);

        assert!(first < second);
        assert_eq!(format!("{:?}", second), "Timer(2)");
    }

    #[test]
    fn test_detector_id_display() {
        assert_eq!(DetectorId(3).to_string(), "#3");
        assert_eq!(DetectorId(3).index(), 3);
    }
}
