//! detgraph Time - timeout publishing for the evaluation graph
//!
//! This crate turns time into graph events:
//! - Handle-based one-shot timeouts with overwrite/cancel semantics
//! - Periodic publishing coalesced onto one metronome (GCD of all periods)
//! - Wall-clock offset over a monotonic platform clock
//! - The TimeoutPublisher capability role for detectors

pub mod config;
pub mod driver;
pub mod error;
pub mod metronome;
pub mod publisher;
pub mod service;

pub use config::*;
pub use driver::*;
pub use error::*;
pub use metronome::*;
pub use publisher::*;
pub use service::*;
