//! Simulated timer driver - deterministic time for graph tests
//!
//! Time only moves when the test moves it. Timers fire in deadline order;
//! equal deadlines fire in handle-allocation order, and a metronome tick due
//! at the same instant fires after them.

use std::collections::{BTreeMap, HashMap};
use std::ops::Deref;
use std::sync::Arc;

use detgraph_core::{Graph, GraphResult, TimeOffset, TimerHandle, Timestamp};
use detgraph_time::{TimeoutPublisherService, TimeoutServiceConfig, TimerDriver};
use parking_lot::Mutex;

/// What fires next
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Firing {
    Timeout(TimerHandle),
    Metronome,
}

#[derive(Default)]
struct SimulatedClock {
    now: Timestamp,
    /// Durations set but not necessarily started
    durations: HashMap<TimerHandle, TimeOffset>,
    /// Armed one-shots by handle
    armed: BTreeMap<TimerHandle, Timestamp>,
    /// (period, next deadline)
    metronome: Option<(TimeOffset, Timestamp)>,
}

impl SimulatedClock {
    fn next(&self) -> Option<(Timestamp, Firing)> {
        let timer = self
            .armed
            .iter()
            .map(|(&handle, &deadline)| (deadline, Firing::Timeout(handle)))
            .min();
        let metronome = self
            .metronome
            .map(|(_, deadline)| (deadline, Firing::Metronome));

        // Firing::Timeout orders before Firing::Metronome at equal deadlines
        match (timer, metronome) {
            (Some(t), Some(m)) => Some(t.min(m)),
            (t, m) => t.or(m),
        }
    }
}

/// Platform driver backed by a manually advanced clock
///
/// Clones share the same clock, so the test keeps one while the service
/// owns another.
#[derive(Clone, Default)]
pub struct SimulatedTimerDriver {
    clock: Arc<Mutex<SimulatedClock>>,
}

impl SimulatedTimerDriver {
    pub fn new() -> Self {
        SimulatedTimerDriver::default()
    }

    /// Current simulated time
    pub fn now(&self) -> Timestamp {
        self.clock.lock().now
    }

    /// Earliest pending deadline and what fires there
    pub fn next_deadline(&self) -> Option<(Timestamp, Firing)> {
        self.clock.lock().next()
    }

    /// Number of armed one-shot timers
    pub fn armed_timers(&self) -> usize {
        self.clock.lock().armed.len()
    }

    /// Metronome period while it runs
    pub fn metronome_period(&self) -> Option<TimeOffset> {
        self.clock.lock().metronome.map(|(period, _)| period)
    }

    /// Consume the earliest firing, moving the clock up to its deadline
    fn take_next(&self) -> Option<Firing> {
        let mut clock = self.clock.lock();
        let (deadline, firing) = clock.next()?;

        clock.now = clock.now.max(deadline);
        match firing {
            Firing::Timeout(handle) => {
                clock.armed.remove(&handle);
            }
            Firing::Metronome => {
                if let Some((period, next)) = clock.metronome.as_mut() {
                    *next = *next + *period;
                }
            }
        }
        Some(firing)
    }

    /// Move the clock forward (never backwards)
    fn advance_to(&self, target: Timestamp) {
        let mut clock = self.clock.lock();
        clock.now = clock.now.max(target);
    }
}

impl TimerDriver for SimulatedTimerDriver {
    fn monotonic_time(&self) -> Timestamp {
        self.now()
    }

    fn set_timeout(&mut self, duration: TimeOffset, handle: TimerHandle) {
        self.clock.lock().durations.insert(handle, duration);
    }

    fn start(&mut self, handle: TimerHandle) {
        let mut clock = self.clock.lock();
        let duration = clock.durations.get(&handle).copied().unwrap_or(0);
        let deadline = clock.now + duration;
        clock.armed.insert(handle, deadline);
    }

    fn cancel(&mut self, handle: TimerHandle) {
        self.clock.lock().armed.remove(&handle);
    }

    fn start_metronome(&mut self, period: TimeOffset) {
        let mut clock = self.clock.lock();
        let first = clock.now + period;
        clock.metronome = Some((period, first));
    }

    fn cancel_metronome(&mut self) {
        self.clock.lock().metronome = None;
    }
}

/// Timeout service running on simulated time
///
/// Dereferences to the underlying `TimeoutPublisherService`, so detectors
/// are wired against it exactly as against a real one.
pub struct TestTimeoutPublisherService {
    service: TimeoutPublisherService,
    driver: SimulatedTimerDriver,
}

impl TestTimeoutPublisherService {
    /// Create a service with the simulated clock at zero
    pub fn new() -> Self {
        Self::with_config(TimeoutServiceConfig::default())
    }

    pub fn with_config(config: TimeoutServiceConfig) -> Self {
        let driver = SimulatedTimerDriver::new();
        TestTimeoutPublisherService {
            service: TimeoutPublisherService::with_config(driver.clone(), config),
            driver,
        }
    }

    /// The service detectors should be wired with
    pub fn service(&self) -> &TimeoutPublisherService {
        &self.service
    }

    pub fn driver(&self) -> &SimulatedTimerDriver {
        &self.driver
    }

    /// Fire the earliest pending timer or metronome tick right away
    ///
    /// The clock snaps forward to that deadline. Injected data is left for
    /// the caller's next pass. Returns false if nothing was pending.
    pub fn fire_next_timeout(&self, graph: &mut Graph) -> bool {
        let Some(firing) = self.driver.take_next() else {
            return false;
        };

        tracing::trace!(?firing, now = self.driver.now().as_millis(), "simulated firing");
        match firing {
            Firing::Timeout(handle) => {
                self.service.timeout_expired(handle, graph);
            }
            Firing::Metronome => {
                self.service.metronome_fired(graph);
            }
        }
        true
    }

    /// Advance time by `delta` ms, firing everything due on the way
    ///
    /// Firings happen in deadline order with one evaluation pass each. Data
    /// already pending in the graph before a firing gets its own pass first,
    /// so no firing shares a pass with unrelated input. The clock ends at
    /// exactly `start + delta`. Returns whether anything fired.
    pub fn forward_time_and_evaluate(
        &self,
        delta: TimeOffset,
        graph: &mut Graph,
    ) -> GraphResult<bool> {
        let target = self.driver.now() + delta;
        let mut fired = false;

        loop {
            if !self.due_by(target) {
                break;
            }
            if graph.has_data_pending() {
                graph.evaluate_graph()?;
                // The flushed pass may have cancelled or re-armed timers
                if !self.due_by(target) {
                    break;
                }
            }

            self.fire_next_timeout(graph);
            graph.evaluate_graph()?;
            fired = true;
        }

        self.driver.advance_to(target);
        Ok(fired)
    }

    fn due_by(&self, target: Timestamp) -> bool {
        matches!(self.driver.next_deadline(), Some((deadline, _)) if deadline <= target)
    }
}

impl Default for TestTimeoutPublisherService {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for TestTimeoutPublisherService {
    type Target = TimeoutPublisherService;

    fn deref(&self) -> &Self::Target {
        &self.service
    }
}
