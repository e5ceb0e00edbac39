//! detgraph Core - Topics, detectors and the evaluation graph
//!
//! This crate defines the dataflow engine:
//! - Identifiers (DetectorId, TopicId, TimerHandle)
//! - Time primitives (Timestamp, TimeOffset)
//! - Single-slot typed topics with a one-pass "new value" flag
//! - Detectors and their capability roles (Subscriber, Publisher, FuturePublisher)
//! - The graph: topic registry, cached topological order, evaluation passes

pub mod config;
pub mod detector;
pub mod error;
pub mod graph;
pub mod id;
pub mod lag;
pub mod time;
pub mod topic;

pub use config::*;
pub use detector::*;
pub use error::*;
pub use graph::*;
pub use id::*;
pub use lag::*;
pub use time::*;
pub use topic::*;
