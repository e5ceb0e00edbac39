//! Detectors and their capability roles
//!
//! A detector is plain data plus the typed capabilities it was wired with:
//! - `Subscriber<T>`: implemented by the detector, called once per pass in
//!   which `T` is new
//! - `Publisher<T>`: immediate write, visible later in the same pass
//! - `FuturePublisher<T>`: deferred write, visible from the next pass
//!
//! Wiring happens through a `DetectorBuilder`, which records the graph
//! edges and hands out the write capabilities before the detector value
//! itself exists.

use std::any::{self, Any};
use std::marker::PhantomData;

use crate::topic::ErasedTopic;
use crate::{DetectorId, Graph, GraphResult, Topic, TopicId, TopicState};

/// A computation node in the graph
pub trait Detector: Send + 'static {
    /// Called once per pass, after every `evaluate` this detector received
    /// in that pass
    fn complete_evaluation(&mut self) {}
}

/// Typed read capability: evaluation entry point for state type `T`
pub trait Subscriber<T: TopicState>: Detector {
    fn evaluate(&mut self, value: &T);
}

/// How a publication edge affects ordering
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PublishKind {
    /// Visible in the same pass; orders the publisher before subscribers
    Immediate,
    /// Visible from the next pass; no ordering constraint
    Future,
    /// Injected by the timer service; no ordering constraint
    Timeout,
}

impl PublishKind {
    /// Whether this edge constrains the topological order
    #[inline]
    pub fn is_immediate(self) -> bool {
        matches!(self, PublishKind::Immediate)
    }
}

/// Immediate write capability for state type `T`
pub struct Publisher<T> {
    topic: Topic<T>,
}

impl<T: TopicState> Publisher<T> {
    /// Publish a value; subscribers later in this pass observe it
    ///
    /// Called between passes, the value is queued and becomes new in the
    /// next pass, like pushed data.
    pub fn publish(&self, value: T) {
        self.topic.set_value(value);
    }

    pub fn topic(&self) -> &Topic<T> {
        &self.topic
    }
}

/// Deferred write capability for state type `T`
pub struct FuturePublisher<T> {
    topic: Topic<T>,
}

impl<T: TopicState> FuturePublisher<T> {
    /// Publish a value that becomes new at the start of the next pass
    pub fn publish_on_future_evaluation(&self, value: T) {
        self.topic.stage(value);
    }

    pub fn topic(&self) -> &Topic<T> {
        &self.topic
    }
}

/// Dispatches one subscribed topic's new value into the detector
type Dispatch<D> = fn(&mut D, &dyn ErasedTopic);

struct Subscription<D> {
    topic: TopicId,
    dispatch: Dispatch<D>,
}

fn dispatch_new_value<D, T>(detector: &mut D, topic: &dyn ErasedTopic)
where
    D: Subscriber<T>,
    T: TopicState,
{
    let value = topic
        .as_any()
        .downcast_ref::<Topic<T>>()
        .and_then(Topic::take_snapshot);

    // The topic lock is released before the detector runs
    if let Some(value) = value {
        detector.evaluate(&value);
    }
}

/// Type-erased detector as stored by the graph
pub(crate) trait DetectorNode: Send {
    /// Run every subscription whose topic is new; true if any ran
    fn evaluate_pass(&mut self, topics: &[Box<dyn ErasedTopic>]) -> bool;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

struct Node<D> {
    detector: D,
    subscriptions: Vec<Subscription<D>>,
}

impl<D: Detector> DetectorNode for Node<D> {
    fn evaluate_pass(&mut self, topics: &[Box<dyn ErasedTopic>]) -> bool {
        let mut evaluated = false;

        for subscription in &self.subscriptions {
            let topic = &topics[subscription.topic.index()];
            if topic.has_new_value() {
                (subscription.dispatch)(&mut self.detector, topic.as_ref());
                evaluated = true;
            }
        }

        if evaluated {
            self.detector.complete_evaluation();
        }
        evaluated
    }

    fn as_any(&self) -> &dyn Any {
        &self.detector
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        &mut self.detector
    }
}

/// Graph-side record of an installed detector
pub(crate) struct DetectorSlot {
    pub name: &'static str,
    pub subscriptions: Vec<TopicId>,
    pub publications: Vec<(TopicId, PublishKind)>,
    pub node: Box<dyn DetectorNode>,
}

/// Wires a detector of type `D` into a graph
///
/// Edges are only registered when `install` is called; dropping the
/// builder leaves the graph untouched apart from lazily resolved topics.
pub struct DetectorBuilder<'g, D> {
    graph: &'g mut Graph,
    name: &'static str,
    subscriptions: Vec<Subscription<D>>,
    publications: Vec<(TopicId, PublishKind)>,
    _detector: PhantomData<fn() -> D>,
}

impl<'g, D: Detector> DetectorBuilder<'g, D> {
    pub(crate) fn new(graph: &'g mut Graph) -> Self {
        DetectorBuilder {
            graph,
            name: any::type_name::<D>(),
            subscriptions: Vec::new(),
            publications: Vec::new(),
            _detector: PhantomData,
        }
    }

    /// Override the diagnostic name (defaults to the type name)
    pub fn named(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Subscribe to state type `T`
    ///
    /// Within a pass, subscriptions are evaluated in the order they were
    /// declared. Subscribing twice to the same type has no further effect.
    pub fn subscribe<T>(&mut self) -> &mut Self
    where
        T: TopicState,
        D: Subscriber<T>,
    {
        let topic = self.graph.resolve_topic::<T>().id();
        if !self.subscriptions.iter().any(|s| s.topic == topic) {
            self.subscriptions.push(Subscription {
                topic,
                dispatch: dispatch_new_value::<D, T>,
            });
        }
        self
    }

    /// Declare an immediate publication of `T`
    pub fn publisher<T: TopicState>(&mut self) -> Publisher<T> {
        Publisher {
            topic: self.declare_publication::<T>(PublishKind::Immediate),
        }
    }

    /// Declare a deferred publication of `T`
    pub fn future_publisher<T: TopicState>(&mut self) -> FuturePublisher<T> {
        FuturePublisher {
            topic: self.declare_publication::<T>(PublishKind::Future),
        }
    }

    /// Record a publication edge of the given kind and resolve its topic
    ///
    /// Used by capability roles living outside this crate.
    pub fn declare_publication<T: TopicState>(&mut self, kind: PublishKind) -> Topic<T> {
        let topic = self.graph.resolve_topic::<T>();
        if !self.publications.contains(&(topic.id(), kind)) {
            self.publications.push((topic.id(), kind));
        }
        topic
    }

    /// Install the detector; its edges take part in the next topology build
    pub fn install(self, detector: D) -> GraphResult<DetectorId> {
        let slot = DetectorSlot {
            name: self.name,
            subscriptions: self.subscriptions.iter().map(|s| s.topic).collect(),
            publications: self.publications,
            node: Box::new(Node {
                detector,
                subscriptions: self.subscriptions,
            }),
        };
        self.graph.insert_detector(slot)
    }
}
