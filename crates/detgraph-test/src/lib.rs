//! detgraph Test Harness - deterministic time for graph scenarios
//!
//! This crate provides:
//! - A simulated platform timer driver with a manually advanced clock
//! - `TestTimeoutPublisherService`: fire timers one at a time, or forward
//!   time with one evaluation pass per firing in deadline order

pub mod simulator;

pub use simulator::*;
