//! Integration-test support for the short-path crates: a real-socket fake
//! OSD and a scriptable fake proxy, used to exercise the scenarios in
//! the scenarios that matter end-to-end (disqualification,
//! nested stores, parity holes) where an in-memory fake can't stand in for
//! actual socket behavior.
//!
//! Kept as a thin, dependency-light crate: the one workspace member
//! downstream crates' integration tests depend on but nothing else does.

pub mod fake_osd;
pub mod fake_proxy;
pub mod manual_clock;

pub use fake_osd::{FakeOsd, OsdScript, PartialGetBehavior};
pub use fake_proxy::FakeProxy;
pub use manual_clock::ManualClock;
