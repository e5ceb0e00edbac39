//! Timeout publisher service - turns timers into graph input
//!
//! Each timer handle is a small state machine:
//! `Idle -> Armed -> (Fired | Cancelled) -> Idle`, with a reschedule being
//! `Armed -> Armed` (payload and deadline overwritten). At most one pending
//! payload exists per handle, so a stale or duplicated platform callback can
//! never publish twice.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use detgraph_core::{Graph, TimeOffset, TimerHandle, Timestamp, TopicState};
use parking_lot::Mutex;

use crate::{PeriodicSchedule, TimeoutResult, TimeoutServiceConfig, TimerDriver};

/// Observable state of a timer handle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerState {
    /// Nothing scheduled (never armed, fired or cancelled)
    Idle,
    /// A payload will be published at `deadline`
    Armed { deadline: Timestamp },
}

/// Type-erased payload waiting for its timer
trait Injection: Send {
    fn topic(&self) -> &'static str;

    fn inject(self: Box<Self>, graph: &mut Graph);
}

struct Payload<T>(T);

impl<T: TopicState> Injection for Payload<T> {
    fn topic(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn inject(self: Box<Self>, graph: &mut Graph) {
        graph.push_data(self.0);
    }
}

struct PendingTimeout {
    deadline: Timestamp,
    payload: Box<dyn Injection>,
}

/// Next handle to issue, shared by every service in the process; 0 is never issued
static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);

struct ServiceCore {
    driver: Box<dyn TimerDriver>,
    pending: BTreeMap<TimerHandle, PendingTimeout>,
    periodic: PeriodicSchedule,
    wall_clock_offset: i64,
}

impl Drop for ServiceCore {
    fn drop(&mut self) {
        // Last service handle gone: leave nothing armed at the platform
        for handle in self.pending.keys() {
            self.driver.cancel(*handle);
        }
        if self.periodic.period().is_some() {
            self.driver.cancel_metronome();
        }
        tracing::debug!(
            cancelled = self.pending.len(),
            metronome = self.periodic.period().is_some(),
            "timeout service shut down"
        );
    }
}

/// Timeout publisher service
///
/// Cheap to clone; clones share the same timer table. All calls must come
/// from the graph's control thread and never while a pass is running on
/// another thread.
#[derive(Clone)]
pub struct TimeoutPublisherService {
    core: Arc<Mutex<ServiceCore>>,
}

impl TimeoutPublisherService {
    /// Create a service on top of a platform driver
    pub fn new<D: TimerDriver + 'static>(driver: D) -> Self {
        Self::with_config(driver, TimeoutServiceConfig::default())
    }

    /// Create a service with custom configuration
    pub fn with_config<D: TimerDriver + 'static>(driver: D, config: TimeoutServiceConfig) -> Self {
        TimeoutPublisherService {
            core: Arc::new(Mutex::new(ServiceCore {
                driver: Box::new(driver),
                pending: BTreeMap::new(),
                periodic: PeriodicSchedule::new(),
                wall_clock_offset: config.wall_clock_offset,
            })),
        }
    }

    /// Allocate a fresh handle
    ///
    /// Handles are unique across every service in the process and are never
    /// reused; within one service they increase in allocation order.
    pub fn unique_timer_handle(&self) -> TimerHandle {
        TimerHandle::new(NEXT_HANDLE.fetch_add(1, Ordering::Relaxed))
    }

    /// Publish `value` into the graph after `delay` ms
    ///
    /// Rescheduling an armed handle replaces its payload and deadline.
    pub fn schedule_timeout<T: TopicState>(&self, value: T, delay: TimeOffset, handle: TimerHandle) {
        let mut core = self.core.lock();
        let deadline = core.driver.monotonic_time() + delay;

        let previous = core.pending.insert(
            handle,
            PendingTimeout {
                deadline,
                payload: Box::new(Payload(value)),
            },
        );
        if previous.is_some() {
            core.driver.cancel(handle);
        }
        core.driver.set_timeout(delay, handle);
        core.driver.start(handle);

        tracing::debug!(
            %handle,
            topic = std::any::type_name::<T>(),
            delay,
            deadline = deadline.as_millis(),
            rescheduled = previous.is_some(),
            "timeout scheduled"
        );
    }

    /// Cancel a pending timeout; returns whether one was armed
    ///
    /// Idle and unknown handles are ignored.
    pub fn cancel_publish_on_timeout(&self, handle: TimerHandle) -> bool {
        let mut core = self.core.lock();
        match core.pending.remove(&handle) {
            Some(pending) => {
                core.driver.cancel(handle);
                tracing::debug!(%handle, topic = pending.payload.topic(), "timeout cancelled");
                true
            }
            None => {
                tracing::trace!(%handle, "cancel on idle timer ignored");
                false
            }
        }
    }

    /// Platform callback: `handle` fired
    ///
    /// Pushes the pending payload into the graph; the caller runs the pass.
    /// Returns false for cancelled, stale or duplicate callbacks.
    pub fn timeout_expired(&self, handle: TimerHandle, graph: &mut Graph) -> bool {
        let pending = self.core.lock().pending.remove(&handle);

        match pending {
            Some(pending) => {
                tracing::debug!(
                    %handle,
                    topic = pending.payload.topic(),
                    deadline = pending.deadline.as_millis(),
                    "timeout expired"
                );
                pending.payload.inject(graph);
                true
            }
            None => {
                tracing::trace!(%handle, "expiry for idle timer ignored");
                false
            }
        }
    }

    /// Register `T` (default value) to be published every `period` ms
    ///
    /// Must happen before `start_periodic_publishing`.
    pub fn schedule_periodic_publishing<T: TopicState + Default>(
        &self,
        period: TimeOffset,
    ) -> TimeoutResult<()> {
        self.core.lock().periodic.register::<T>(period)?;
        tracing::debug!(topic = std::any::type_name::<T>(), period, "periodic publishing registered");
        Ok(())
    }

    /// Derive the metronome period and arm the metronome
    ///
    /// Registration is closed afterwards. Returns the metronome period, or
    /// None if nothing was registered (no metronome is armed then).
    pub fn start_periodic_publishing(&self) -> TimeoutResult<Option<TimeOffset>> {
        let mut core = self.core.lock();
        let period = core.periodic.start()?;

        if let Some(period) = period {
            core.driver.start_metronome(period);
            tracing::info!(
                period,
                topics = core.periodic.len(),
                "metronome started"
            );
        }
        Ok(period)
    }

    /// Platform callback: the metronome ticked
    ///
    /// Pushes every due periodic topic into the graph; returns how many.
    pub fn metronome_fired(&self, graph: &mut Graph) -> usize {
        let due = self.core.lock().periodic.tick();

        for topic in &due {
            topic.inject(graph);
        }
        tracing::trace!(due = due.len(), "metronome tick");
        due.len()
    }

    /// Wall-clock time: monotonic time plus the configured offset
    pub fn time(&self) -> Timestamp {
        let core = self.core.lock();
        core.driver.monotonic_time().offset_by(core.wall_clock_offset)
    }

    /// Monotonic platform time
    pub fn monotonic_time(&self) -> Timestamp {
        self.core.lock().driver.monotonic_time()
    }

    /// Set the offset between monotonic and wall-clock time
    pub fn set_wall_clock_offset(&self, offset_ms: i64) {
        self.core.lock().wall_clock_offset = offset_ms;
    }

    pub fn wall_clock_offset(&self) -> i64 {
        self.core.lock().wall_clock_offset
    }

    /// Metronome period once periodic publishing started
    pub fn metronome_period(&self) -> Option<TimeOffset> {
        self.core.lock().periodic.period()
    }

    /// Metronome ticks since periodic publishing started
    pub fn metronome_ticks(&self) -> u64 {
        self.core.lock().periodic.ticks()
    }

    /// Current state of a handle
    pub fn timer_state(&self, handle: TimerHandle) -> TimerState {
        match self.core.lock().pending.get(&handle) {
            Some(pending) => TimerState::Armed {
                deadline: pending.deadline,
            },
            None => TimerState::Idle,
        }
    }

    /// Number of armed handles
    pub fn armed_count(&self) -> usize {
        self.core.lock().pending.len()
    }
}

impl std::fmt::Debug for TimeoutPublisherService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let core = self.core.lock();
        f.debug_struct("TimeoutPublisherService")
            .field("armed", &core.pending.len())
            .field("periodic", &core.periodic.len())
            .field("metronome_period", &core.periodic.period())
            .finish()
    }
}
