//! Timeout service configuration

/// Timeout service configuration
#[derive(Clone, Debug, Default)]
pub struct TimeoutServiceConfig {
    /// Initial wall-clock offset added to the monotonic clock (ms)
    pub wall_clock_offset: i64,
}

impl TimeoutServiceConfig {
    /// Start with the wall clock at a known epoch offset
    pub fn with_wall_clock_offset(offset_ms: i64) -> Self {
        TimeoutServiceConfig {
            wall_clock_offset: offset_ms,
        }
    }
}
