//! Error types for the evaluation graph

use thiserror::Error;

use crate::DetectorId;

/// Core graph errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    // Topology errors
    #[error("Immediate publication cycle involving detectors: {}", .detectors.join(", "))]
    ImmediateCycle { detectors: Vec<&'static str> },

    // Topic errors
    #[error("Topic {topic} has no new value in this pass")]
    NoNewValue { topic: &'static str },

    // Registry errors
    #[error("Detector limit reached: at most {max} detectors")]
    DetectorLimit { max: usize },

    #[error("Detector not installed: {0}")]
    UnknownDetector(DetectorId),
}

/// Result type for graph operations
pub type GraphResult<T> = Result<T, GraphError>;
