//! Recognized configuration options.

use std::time::Duration;

/// Configuration recognized by the short-path client.
///
/// There is no environment/file loader here: the original is a library
/// linked into a host process that builds its config struct in code, and
/// this crate follows suit. The embedding application owns CLI/env parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortPathConfig {
    /// Manifest cache capacity, in entries.
    pub manifest_cache_size: usize,
    /// When true, the executor treats dispatched OSD reads as instantly
    /// successful without touching the network (benchmarking only).
    pub use_null_io: bool,
    /// Per-OSD-operation I/O deadline.
    pub request_timeout: Duration,
    /// How long a disqualified OSD is skipped before being retried.
    pub disqualification_period: Duration,
}

impl Default for ShortPathConfig {
    fn default() -> Self {
        Self {
            manifest_cache_size: 4096,
            use_null_io: false,
            request_timeout: Duration::from_secs(1),
            disqualification_period: Duration::from_secs(30),
        }
    }
}
