//! Shared data model, error taxonomy, clock abstraction and external
//! interface contracts for the short-path object store client.
//!
//! This crate has no networking or caching logic of its own — it is the
//! common vocabulary that `shortpath-proto`, `shortpath-cache`,
//! `shortpath-osd`, `shortpath-resolver` and `shortpath-client` all build on,
//! a common-vocabulary crate underlying the rest of this workspace.

pub mod clock;
pub mod config;
pub mod error;
pub mod interfaces;
pub mod model;

pub use clock::{Clock, SystemClock};
pub use config::ShortPathConfig;
pub use error::ShortPathError;
pub use interfaces::{
    Assertion, ConsistentRead, ObjectInfo, ObjectSlices, OsdInfo, ProxyClient, ProxyError,
    SliceDescriptor, Update, WriteBarrier,
};
pub use model::{
    Checksum, Compression, EncodingScheme, EncryptInfo, Location, Manifest,
    ManifestWithNamespaceId, ObjectId, OsdId, StoreId, VersionId,
};
