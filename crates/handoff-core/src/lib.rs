//! Safe Rust implementations behind the handoff boundary.
//!
//! Nothing in this crate touches a raw pointer. The ABI crate converts C
//! arguments into these types and calls in; the host facade wraps the ABI.

#![deny(unsafe_code)]

pub mod copy_probe;
pub mod counter;
pub mod object;
pub mod record;
pub mod render;

pub use copy_probe::CopyProbe;
pub use counter::{GuardedCounter, RaceObservation, RacyCounter};
pub use object::NativeObject;
pub use record::Record;
