//! Error taxonomy for the short path.
//!
//! Every variant here can occur on the hot path; none of them are ever
//! surfaced to callers directly (see [`ShortPathError::is_fallback`]) — the
//! front client collapses all of them into "fall back to the proxy".
//! `thiserror` gives us `Display`/`Error` without hand-writing the
//! boilerplate rather than hand-writing `Display` impls for every variant.

use thiserror::Error;

/// Taxonomy of everything that can go wrong on the short path.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShortPathError {
    /// I/O deadline expired before the OSD replied.
    #[error("timeout after {0:?}")]
    Timeout(std::time::Duration),

    /// The OSD connection was dropped or refused.
    #[error("transport closed: {0}")]
    TransportClosed(String),

    /// Handshake long-id did not match the configured OSD identity.
    #[error("wrong osd: expected long_id {expected}, got {actual}")]
    WrongOsd { expected: String, actual: String },

    /// A length-prefixed frame violated the framing contract.
    #[error("corrupt frame: {0}")]
    CorruptFrame(String),

    /// Manifest version/layout tag or compression/encryption tag was not
    /// recognized.
    #[error("unsupported manifest: {0}")]
    UnsupportedManifest(String),

    /// Requested slice exceeds the object's size.
    #[error("out of range: pos {pos} + len {len} > size {size}")]
    OutOfRange { pos: u64, len: u64, size: u64 },

    /// A manifest required to resolve a slice (at any nesting level) was
    /// not present in the cache.
    #[error("manifest miss for {0:?}")]
    ManifestMiss(String),

    /// The OSD signalled a non-zero application-level status.
    #[error("osd returned status {0}")]
    OsdReturn(u32),
}

impl ShortPathError {
    /// Every short-path error is a fallback signal to the front client: any
    /// error category here becomes an opaque "short path failed" signal.
    /// This helper exists so call sites read as intent ("is this a reason to
    /// fall back?") rather than an unexplained `Result::is_err()`.
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        true
    }

    /// Whether this failure means the OSD itself should be temporarily
    /// disqualified (a failed connection
    /// or I/O error"), as opposed to an application-level status the OSD was
    /// perfectly reachable to report.
    #[must_use]
    pub fn disqualifies_osd(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::TransportClosed(_) | Self::WrongOsd { .. })
    }
}
