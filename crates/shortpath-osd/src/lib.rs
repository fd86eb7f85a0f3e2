//! OSD registry and connection pool: membership/liveness tracking for
//! storage daemons, and a pool of persistent TCP clients that speak the
//! `shortpath-proto` OSD wire protocol.
//!
//! Split from `shortpath-resolver`/`shortpath-client` because dialing and
//! framing concerns belong with the transport, not the slice-to-fragment
//! translation logic that only ever calls `OsdClientPool::partial_get`.

pub mod client;
pub mod registry;

pub use client::{OsdClient, OsdClientPool};
pub use registry::OsdRegistry;
