//! Platform timer driver interface
//!
//! The driver owns the real timer hardware or OS timer. It never calls back
//! into the graph on its own thread: expiries and metronome ticks are handed
//! to the control thread, which then calls
//! `TimeoutPublisherService::timeout_expired` / `metronome_fired`.

use detgraph_core::{TimeOffset, TimerHandle, Timestamp};

/// Timer source implemented by the environment
pub trait TimerDriver: Send {
    /// Current monotonic time
    fn monotonic_time(&self) -> Timestamp;

    /// Set the one-shot duration for `handle`, replacing any earlier one
    fn set_timeout(&mut self, duration: TimeOffset, handle: TimerHandle);

    /// Arm `handle`; it must fire exactly once unless cancelled or re-armed
    fn start(&mut self, handle: TimerHandle);

    /// Disarm `handle`; unknown or idle handles are ignored
    fn cancel(&mut self, handle: TimerHandle);

    /// Arm the repeating tick source
    fn start_metronome(&mut self, period: TimeOffset);

    /// Disarm the repeating tick source
    fn cancel_metronome(&mut self);
}
