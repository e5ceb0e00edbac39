//! Error types for the timeout service

use detgraph_core::TimeOffset;
use thiserror::Error;

/// Timeout service errors
///
/// Stale cancels and expiry callbacks are not errors; they are absorbed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimeoutError {
    #[error("Periodic publishing already started; registrations are closed")]
    PeriodicAlreadyStarted,

    #[error("Invalid period for {topic}: {period}ms")]
    InvalidPeriod {
        topic: &'static str,
        period: TimeOffset,
    },
}

/// Result type for timeout service operations
pub type TimeoutResult<T> = Result<T, TimeoutError>;
