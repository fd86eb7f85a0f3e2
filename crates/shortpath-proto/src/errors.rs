//! Decode errors for the wire formats in this crate.

use thiserror::Error;

use shortpath_core::ShortPathError;

/// Everything that can go wrong decoding a frame, a manifest, or an OSD
/// payload.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Buffer shorter than a fixed-size header.
    #[error("frame too short: expected at least {expected} bytes, got {actual}")]
    FrameTooShort { expected: usize, actual: usize },

    /// Header magic did not match.
    #[error("invalid frame magic")]
    InvalidMagic,

    /// Header claimed an unsupported protocol version.
    #[error("unsupported frame version {0}")]
    UnsupportedVersion(u8),

    /// Header's declared payload size is larger than allowed.
    #[error("payload too large: {size} bytes exceeds max {max}")]
    PayloadTooLarge { size: usize, max: usize },

    /// Buffer shorter than the header's declared payload size.
    #[error("frame truncated: expected {expected} payload bytes, got {actual}")]
    FrameTruncated { expected: usize, actual: usize },

    /// A length-prefixed field ran past the end of the buffer.
    #[error("field truncated: expected {expected} bytes, got {actual}")]
    FieldTruncated { expected: usize, actual: usize },

    /// A tag byte (version, layout, compression, encryption...) was not one
    /// of the recognized values.
    #[error("unrecognized tag {tag} for {field}")]
    UnrecognizedTag { field: &'static str, tag: u8 },

    /// Snappy decompression of the manifest body failed.
    #[error("snappy decompress failed: {0}")]
    Decompress(String),
}

/// Result alias used throughout this crate's (de)serialization code.
pub type Result<T> = std::result::Result<T, ProtocolError>;

impl From<ProtocolError> for ShortPathError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::FrameTooShort { .. }
            | ProtocolError::InvalidMagic
            | ProtocolError::UnsupportedVersion(_)
            | ProtocolError::FrameTruncated { .. }
            | ProtocolError::FieldTruncated { .. } => {
                ShortPathError::CorruptFrame(err.to_string())
            }
            ProtocolError::PayloadTooLarge { .. } => ShortPathError::CorruptFrame(err.to_string()),
            ProtocolError::UnrecognizedTag { .. } | ProtocolError::Decompress(_) => {
                ShortPathError::UnsupportedManifest(err.to_string())
            }
        }
    }
}
