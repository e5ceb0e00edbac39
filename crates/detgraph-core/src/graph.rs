//! Graph - topic registry, detector registry and the evaluation pass
//!
//! One pass of `evaluate_graph`:
//! 1. clear every topic's new flag
//! 2. promote, per topic, the oldest value pushed since the previous pass
//!    (or else the deferred one); further pushed values wait their turn
//! 3. sweep detectors in topological order, evaluating each one that has a
//!    new subscribed topic
//!
//! Immediate publications made during the sweep are visible to every
//! detector after the publisher; the order guarantees that covers all of
//! the publisher's subscribers. Only immediate edges are ordered, so a cycle
//! is legal as long as one of its edges is deferred.

use std::any::TypeId;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::detector::DetectorSlot;
use crate::topic::ErasedTopic;
use crate::{
    Detector, DetectorBuilder, DetectorId, GraphConfig, GraphError, GraphResult, Topic, TopicId,
    TopicState,
};

/// Result of one evaluation pass
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PassSummary {
    /// Pass number, starting at 1
    pub pass: u64,
    /// Topics that received a pushed or deferred value at the start of the pass
    pub inputs_applied: usize,
    /// Detectors that received at least one evaluation
    pub detectors_evaluated: usize,
    /// Topics that ended the pass with a new value (empty unless
    /// `GraphConfig::collect_outputs`)
    pub new_topics: Vec<&'static str>,
}

/// The dataflow graph
pub struct Graph {
    config: GraphConfig,
    /// Topic id by state type
    topic_index: HashMap<TypeId, TopicId>,
    /// Topics in resolution order
    topics: Vec<Box<dyn ErasedTopic>>,
    /// Detectors in registration order; removed ones leave a hole
    detectors: Vec<Option<DetectorSlot>>,
    /// Cached evaluation order, None when stale
    order: Option<Vec<DetectorId>>,
    /// Completed passes
    passes: u64,
    /// True only while the detector sweep runs; shared with every topic
    in_pass: Arc<AtomicBool>,
}

impl Graph {
    /// Create an empty graph with default configuration
    pub fn new() -> Self {
        Self::with_config(GraphConfig::default())
    }

    /// Create an empty graph with custom configuration
    pub fn with_config(config: GraphConfig) -> Self {
        Graph {
            config,
            topic_index: HashMap::new(),
            topics: Vec::new(),
            detectors: Vec::new(),
            order: None,
            passes: 0,
            in_pass: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Get the topic for state type `T`, creating it on first use
    pub fn resolve_topic<T: TopicState>(&mut self) -> Topic<T> {
        if let Some(id) = self.topic_index.get(&TypeId::of::<T>()) {
            if let Some(topic) = self.topics[id.index()].as_any().downcast_ref::<Topic<T>>() {
                return topic.clone();
            }
        }

        let id = TopicId(self.topics.len());
        let topic = Topic::<T>::new(id, Arc::clone(&self.in_pass));
        self.topics.push(Box::new(topic.clone()));
        self.topic_index.insert(TypeId::of::<T>(), id);
        tracing::debug!(topic = topic.name(), id = id.index(), "topic resolved");
        topic
    }

    /// Inject a value from outside the graph
    ///
    /// Values are kept in arrival order; each pass makes at most one of them
    /// new per topic, so repeated pushes of the same type before a pass are
    /// delivered over consecutive passes rather than overwritten.
    pub fn push_data<T: TopicState>(&mut self, value: T) {
        self.resolve_topic::<T>().push(value);
    }

    /// Whether pushed or deferred values are waiting for a later pass
    pub fn has_data_pending(&self) -> bool {
        self.topics.iter().any(|t| t.has_pending())
    }

    /// Start wiring a detector of type `D`
    pub fn build_detector<D: Detector>(&mut self) -> DetectorBuilder<'_, D> {
        DetectorBuilder::new(self)
    }

    pub(crate) fn insert_detector(&mut self, slot: DetectorSlot) -> GraphResult<DetectorId> {
        if let Some(max) = self.config.max_detectors {
            if self.detector_count() >= max {
                return Err(GraphError::DetectorLimit { max });
            }
        }

        let id = DetectorId(self.detectors.len());
        tracing::debug!(
            detector = slot.name,
            id = id.index(),
            subscriptions = slot.subscriptions.len(),
            publications = slot.publications.len(),
            "detector installed"
        );
        self.detectors.push(Some(slot));
        self.order = None;
        Ok(id)
    }

    /// Remove a detector and its edges
    pub fn remove_detector(&mut self, id: DetectorId) -> GraphResult<()> {
        let slot = self
            .detectors
            .get_mut(id.index())
            .and_then(Option::take)
            .ok_or(GraphError::UnknownDetector(id))?;

        tracing::debug!(detector = slot.name, id = id.index(), "detector removed");
        self.order = None;
        Ok(())
    }

    /// Borrow an installed detector
    pub fn detector<D: Detector>(&self, id: DetectorId) -> GraphResult<&D> {
        self.detectors
            .get(id.index())
            .and_then(Option::as_ref)
            .and_then(|slot| slot.node.as_any().downcast_ref::<D>())
            .ok_or(GraphError::UnknownDetector(id))
    }

    /// Mutably borrow an installed detector
    pub fn detector_mut<D: Detector>(&mut self, id: DetectorId) -> GraphResult<&mut D> {
        self.detectors
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .and_then(|slot| slot.node.as_any_mut().downcast_mut::<D>())
            .ok_or(GraphError::UnknownDetector(id))
    }

    /// Number of installed detectors
    pub fn detector_count(&self) -> usize {
        self.detectors.iter().filter(|d| d.is_some()).count()
    }

    /// Number of resolved topics
    pub fn topic_count(&self) -> usize {
        self.topics.len()
    }

    /// Completed passes
    pub fn passes(&self) -> u64 {
        self.passes
    }

    /// Evaluation order, rebuilding it if the topology changed
    pub fn topological_order(&mut self) -> GraphResult<&[DetectorId]> {
        if self.order.is_none() {
            self.order = Some(self.sort_detectors()?);
        }
        Ok(self.order.as_deref().unwrap_or_default())
    }

    /// Run one evaluation pass
    pub fn evaluate_graph(&mut self) -> GraphResult<PassSummary> {
        let order = self.topological_order()?.to_vec();

        // Stage 1: last pass's newness ends here
        for topic in &self.topics {
            topic.clear_new_flag();
        }

        // Stage 2: one pushed or deferred value per topic becomes new
        let inputs_applied = self
            .topics
            .iter()
            .filter(|topic| topic.promote_pending())
            .count();

        // Stage 3: single topological sweep
        self.in_pass.store(true, Ordering::Release);
        let mut detectors_evaluated = 0;
        for id in order {
            if let Some(slot) = self.detectors[id.index()].as_mut() {
                if slot.node.evaluate_pass(&self.topics) {
                    detectors_evaluated += 1;
                }
            }
        }
        self.in_pass.store(false, Ordering::Release);

        self.passes += 1;
        let new_topics = if self.config.collect_outputs {
            self.topics
                .iter()
                .filter(|t| t.has_new_value())
                .map(|t| t.name())
                .collect()
        } else {
            Vec::new()
        };

        tracing::trace!(
            pass = self.passes,
            inputs_applied,
            detectors_evaluated,
            "evaluation pass complete"
        );

        Ok(PassSummary {
            pass: self.passes,
            inputs_applied,
            detectors_evaluated,
            new_topics,
        })
    }

    /// Kahn's algorithm over immediate edges, ties broken by registration order
    fn sort_detectors(&self) -> GraphResult<Vec<DetectorId>> {
        let live: Vec<(DetectorId, &DetectorSlot)> = self
            .detectors
            .iter()
            .enumerate()
            .filter_map(|(i, d)| d.as_ref().map(|slot| (DetectorId(i), slot)))
            .collect();

        // Immediate publishers per topic
        let mut publishers: HashMap<TopicId, Vec<DetectorId>> = HashMap::new();
        for (id, slot) in &live {
            for &(topic, kind) in &slot.publications {
                if kind.is_immediate() {
                    publishers.entry(topic).or_default().push(*id);
                }
            }
        }

        let mut successors: HashMap<DetectorId, BTreeSet<DetectorId>> = HashMap::new();
        let mut in_degree: HashMap<DetectorId, usize> =
            live.iter().map(|(id, _)| (*id, 0)).collect();
        for (subscriber, slot) in &live {
            for topic in &slot.subscriptions {
                for &publisher in publishers.get(topic).into_iter().flatten() {
                    if successors.entry(publisher).or_default().insert(*subscriber) {
                        *in_degree.entry(*subscriber).or_default() += 1;
                    }
                }
            }
        }

        let mut ready: BTreeSet<DetectorId> = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(id, _)| *id)
            .collect();
        let mut order = Vec::with_capacity(live.len());

        while let Some(id) = ready.pop_first() {
            order.push(id);
            for next in successors.get(&id).into_iter().flatten() {
                if let Some(degree) = in_degree.get_mut(next) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.insert(*next);
                    }
                }
            }
        }

        if order.len() < live.len() {
            let detectors: Vec<&'static str> = live
                .iter()
                .filter(|(id, _)| in_degree.get(id).copied().unwrap_or(0) > 0)
                .map(|(_, slot)| slot.name)
                .collect();
            tracing::error!(?detectors, "immediate publication cycle");
            return Err(GraphError::ImmediateCycle { detectors });
        }

        tracing::debug!(detectors = order.len(), "topological order rebuilt");
        Ok(order)
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}
