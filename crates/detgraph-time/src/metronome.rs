//! Metronome - periodic publishing on a single tick source
//!
//! Every periodic topic registers its own period. Once publishing starts,
//! one metronome runs at the greatest common divisor of all periods, so a
//! device needs a single hardware timer however many periodic publishers
//! exist. Each topic counts the ticks since it last fired and is due when
//! those ticks add up to its period.

use std::any::TypeId;

use detgraph_core::{Graph, TimeOffset, TopicState};

use crate::{TimeoutError, TimeoutResult};

/// Greatest common divisor (Euclid)
pub fn gcd(mut a: TimeOffset, mut b: TimeOffset) -> TimeOffset {
    while b != 0 {
        let r = a % b;
        a = b;
        b = r;
    }
    a
}

/// Metronome period for a set of periods; None when the set is empty
pub fn metronome_period<I>(periods: I) -> Option<TimeOffset>
where
    I: IntoIterator<Item = TimeOffset>,
{
    periods.into_iter().fold(None, |acc, period| match acc {
        None => Some(period),
        Some(g) => Some(gcd(g, period)),
    })
}

fn push_default<T: TopicState + Default>(graph: &mut Graph) {
    graph.push_data(T::default());
}

/// A periodic topic due on the current tick
#[derive(Clone, Copy)]
pub struct DueTopic {
    pub topic: &'static str,
    inject: fn(&mut Graph),
}

impl DueTopic {
    /// Push the topic's default value into the graph
    pub fn inject(&self, graph: &mut Graph) {
        (self.inject)(graph)
    }
}

impl std::fmt::Debug for DueTopic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("DueTopic").field(&self.topic).finish()
    }
}

struct PeriodicEntry {
    type_id: TypeId,
    topic: &'static str,
    period: TimeOffset,
    /// Ticks since this topic last fired
    elapsed_ticks: u64,
    inject: fn(&mut Graph),
}

/// Registered periodic topics and the derived metronome
#[derive(Default)]
pub struct PeriodicSchedule {
    entries: Vec<PeriodicEntry>,
    /// Fixed once started
    period: Option<TimeOffset>,
    started: bool,
    ticks: u64,
}

impl PeriodicSchedule {
    pub fn new() -> Self {
        PeriodicSchedule::default()
    }

    /// Register (or re-register) `T` to be published every `period` ms
    pub fn register<T: TopicState + Default>(&mut self, period: TimeOffset) -> TimeoutResult<()> {
        let topic = std::any::type_name::<T>();
        if self.started {
            return Err(TimeoutError::PeriodicAlreadyStarted);
        }
        if period == 0 {
            return Err(TimeoutError::InvalidPeriod { topic, period });
        }

        let type_id = TypeId::of::<T>();
        match self.entries.iter_mut().find(|e| e.type_id == type_id) {
            Some(entry) => entry.period = period,
            None => self.entries.push(PeriodicEntry {
                type_id,
                topic,
                period,
                elapsed_ticks: 0,
                inject: push_default::<T>,
            }),
        }
        Ok(())
    }

    /// Close registration and derive the metronome period
    pub fn start(&mut self) -> TimeoutResult<Option<TimeOffset>> {
        if self.started {
            return Err(TimeoutError::PeriodicAlreadyStarted);
        }
        self.started = true;
        self.period = metronome_period(self.entries.iter().map(|e| e.period));
        Ok(self.period)
    }

    /// Advance one metronome tick; returns topics due on it in registration order
    pub fn tick(&mut self) -> Vec<DueTopic> {
        let Some(period) = self.period else {
            return Vec::new();
        };
        self.ticks += 1;

        let mut due = Vec::new();
        for entry in &mut self.entries {
            entry.elapsed_ticks += 1;
            if entry.elapsed_ticks * period >= entry.period {
                entry.elapsed_ticks = 0;
                due.push(DueTopic {
                    topic: entry.topic,
                    inject: entry.inject,
                });
            }
        }
        due
    }

    /// Metronome period, once started with at least one topic
    pub fn period(&self) -> Option<TimeOffset> {
        self.period
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Metronome ticks since start
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
