//! Topics - single-slot typed mailboxes
//!
//! A topic holds the most recent value of one state type and a flag saying
//! whether that value arrived in the current evaluation pass. Writes from
//! outside a pass only become visible when a later pass promotes them:
//! pushed data queues in arrival order and is promoted one value per pass,
//! while a deferred publication occupies a single last-write-wins slot.

use std::any::{self, Any};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::{GraphError, GraphResult, TopicId};

/// Marker for types that can flow through a topic
pub trait TopicState: Clone + Send + 'static {}

impl<T: Clone + Send + 'static> TopicState for T {}

/// Topic contents
#[derive(Debug)]
struct TopicSlot<T> {
    /// Most recent value
    current: Option<T>,
    /// Values pushed from outside a pass, oldest first
    inbox: VecDeque<T>,
    /// Deferred publication waiting for the next pass
    staged: Option<T>,
    /// Set when `current` arrived in this pass
    new_this_pass: bool,
}

/// Shared handle to the topic of state type `T`
///
/// Cloning the handle does not clone the topic: every handle resolved from
/// the same graph for the same `T` points at the same slot.
pub struct Topic<T> {
    id: TopicId,
    slot: Arc<Mutex<TopicSlot<T>>>,
    /// Set by the owning graph while its detector sweep runs
    in_pass: Arc<AtomicBool>,
}

impl<T: TopicState> Topic<T> {
    pub(crate) fn new(id: TopicId, in_pass: Arc<AtomicBool>) -> Self {
        Topic {
            id,
            slot: Arc::new(Mutex::new(TopicSlot {
                current: None,
                inbox: VecDeque::new(),
                staged: None,
                new_this_pass: false,
            })),
            in_pass,
        }
    }

    /// Topic id within its graph
    pub fn id(&self) -> TopicId {
        self.id
    }

    /// State type name
    pub fn name(&self) -> &'static str {
        any::type_name::<T>()
    }

    /// Whether a value arrived in the current pass
    pub fn has_new_value(&self) -> bool {
        self.slot.lock().new_this_pass
    }

    /// The value that arrived in the current pass
    ///
    /// Reading without a new value is a programming error and is reported
    /// instead of handing back stale data.
    pub fn new_value(&self) -> GraphResult<T> {
        let slot = self.slot.lock();
        match (&slot.current, slot.new_this_pass) {
            (Some(value), true) => Ok(value.clone()),
            _ => Err(GraphError::NoNewValue { topic: self.name() }),
        }
    }

    /// Most recent value, new or not
    pub fn current_value(&self) -> Option<T> {
        self.slot.lock().current.clone()
    }

    /// Whether both handles point at the same topic
    pub fn same_topic(&self, other: &Topic<T>) -> bool {
        Arc::ptr_eq(&self.slot, &other.slot)
    }

    /// Write a value visible in the current pass
    ///
    /// Outside a pass the value is queued like pushed data instead, so it
    /// is not cleared before any subscriber has seen it.
    pub(crate) fn set_value(&self, value: T) {
        if !self.in_pass.load(Ordering::Acquire) {
            self.push(value);
            return;
        }
        let mut slot = self.slot.lock();
        slot.current = Some(value);
        slot.new_this_pass = true;
    }

    /// Queue a value from outside the graph; one is promoted per pass
    pub(crate) fn push(&self, value: T) {
        self.slot.lock().inbox.push_back(value);
    }

    /// Stage a deferred value for the next pass (last write wins)
    pub(crate) fn stage(&self, value: T) {
        self.slot.lock().staged = Some(value);
    }

    /// Values waiting to be promoted
    pub fn pending_count(&self) -> usize {
        let slot = self.slot.lock();
        slot.inbox.len() + usize::from(slot.staged.is_some())
    }

    /// New value of this pass, if any, copied out of the slot
    pub(crate) fn take_snapshot(&self) -> Option<T> {
        let slot = self.slot.lock();
        if slot.new_this_pass {
            slot.current.clone()
        } else {
            None
        }
    }
}

impl<T> Clone for Topic<T> {
    fn clone(&self) -> Self {
        Topic {
            id: self.id,
            slot: Arc::clone(&self.slot),
            in_pass: Arc::clone(&self.in_pass),
        }
    }
}

impl<T: TopicState> std::fmt::Debug for Topic<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Topic")
            .field("id", &self.id)
            .field("name", &self.name())
            .field("new", &self.has_new_value())
            .finish()
    }
}

/// Type-erased view of a topic used by the graph's registry
pub(crate) trait ErasedTopic: Send {
    fn name(&self) -> &'static str;

    fn has_new_value(&self) -> bool;

    fn has_pending(&self) -> bool;

    /// End the previous pass's newness
    fn clear_new_flag(&self);

    /// Make the oldest pushed value new, or else the deferred one; true if
    /// either existed
    fn promote_pending(&self) -> bool;

    fn as_any(&self) -> &dyn Any;
}

impl<T: TopicState> ErasedTopic for Topic<T> {
    fn name(&self) -> &'static str {
        Topic::name(self)
    }

    fn has_new_value(&self) -> bool {
        Topic::has_new_value(self)
    }

    fn has_pending(&self) -> bool {
        let slot = self.slot.lock();
        !slot.inbox.is_empty() || slot.staged.is_some()
    }

    fn clear_new_flag(&self) {
        self.slot.lock().new_this_pass = false;
    }

    fn promote_pending(&self) -> bool {
        let mut slot = self.slot.lock();
        let next = match slot.inbox.pop_front() {
            Some(value) => Some(value),
            None => slot.staged.take(),
        };
        match next {
            Some(value) => {
                slot.current = Some(value);
                slot.new_this_pass = true;
                true
            }
            None => false,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
