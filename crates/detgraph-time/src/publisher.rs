//! TimeoutPublisher - detector capability for delayed publication
//!
//! A detector asks its builder for a `TimeoutPublisher<T>`; the role reserves
//! one timer handle for its whole life. Re-arming that handle from the
//! detector's own evaluation of `T` gives a self-sustaining recurring timer.

use std::marker::PhantomData;

use detgraph_core::{Detector, DetectorBuilder, PublishKind, TimeOffset, TimerHandle, TopicState};

use crate::{TimeoutPublisherService, TimeoutResult, TimerState};

/// Delayed write capability for state type `T`
///
/// Dropping the role cancels its pending timeout.
pub struct TimeoutPublisher<T> {
    service: TimeoutPublisherService,
    handle: TimerHandle,
    _topic: PhantomData<fn(T)>,
}

impl<T: TopicState> TimeoutPublisher<T> {
    /// Publish `value` after `delay` ms, replacing any pending publication
    pub fn publish_on_timeout(&self, value: T, delay: TimeOffset) {
        self.service.schedule_timeout(value, delay, self.handle);
    }

    /// Cancel the pending publication, if any
    pub fn cancel_publish_on_timeout(&self) {
        self.service.cancel_publish_on_timeout(self.handle);
    }

    /// Whether a publication is pending
    pub fn is_armed(&self) -> bool {
        matches!(self.service.timer_state(self.handle), TimerState::Armed { .. })
    }

    /// The handle reserved for this role
    pub fn handle(&self) -> TimerHandle {
        self.handle
    }
}

impl<T> Drop for TimeoutPublisher<T> {
    fn drop(&mut self) {
        self.service.cancel_publish_on_timeout(self.handle);
    }
}

/// Timer-related wiring for detector builders
pub trait TimeoutWiring {
    /// Declare a timeout publication of `T` backed by `service`
    fn timeout_publisher<T: TopicState>(
        &mut self,
        service: &TimeoutPublisherService,
    ) -> TimeoutPublisher<T>;

    /// Publish `T::default()` every `period` ms through the service metronome
    fn periodic_publishing<T: TopicState + Default>(
        &mut self,
        period: TimeOffset,
        service: &TimeoutPublisherService,
    ) -> TimeoutResult<()>;
}

impl<D: Detector> TimeoutWiring for DetectorBuilder<'_, D> {
    fn timeout_publisher<T: TopicState>(
        &mut self,
        service: &TimeoutPublisherService,
    ) -> TimeoutPublisher<T> {
        self.declare_publication::<T>(PublishKind::Timeout);
        TimeoutPublisher {
            service: service.clone(),
            handle: service.unique_timer_handle(),
            _topic: PhantomData,
        }
    }

    fn periodic_publishing<T: TopicState + Default>(
        &mut self,
        period: TimeOffset,
        service: &TimeoutPublisherService,
    ) -> TimeoutResult<()> {
        service.schedule_periodic_publishing::<T>(period)?;
        self.declare_publication::<T>(PublishKind::Timeout);
        Ok(())
    }
}
