//! Graph configuration

/// Graph configuration
#[derive(Clone, Debug)]
pub struct GraphConfig {
    /// Upper bound on installed detectors (None = unbounded)
    pub max_detectors: Option<usize>,
    /// Record the names of topics that end each pass with a new value
    pub collect_outputs: bool,
}

impl Default for GraphConfig {
    fn default() -> Self {
        GraphConfig {
            max_detectors: None,
            collect_outputs: true,
        }
    }
}

impl GraphConfig {
    /// Configuration for constrained targets: bounded registry, no output list
    pub fn lite(max_detectors: usize) -> Self {
        GraphConfig {
            max_detectors: Some(max_detectors),
            collect_outputs: false,
        }
    }
}
