//! Ownership membrane for the handoff boundary.
//!
//! Everything that crosses the native edge by identity rather than by value
//! goes through this crate. Native objects are never named by address on the
//! C ABI; they are named by generational handles minted here, so a handle that
//! outlives its object is detected instead of dereferenced.
//!
//! # Architecture
//!
//! - **Handle registry** (`registry`): slot table with generation counters,
//!   owner tracking and an optional quarantine queue
//! - **Configuration** (`config`): runtime safety level and quarantine sizing
//! - **Metrics** (`metrics`): atomic counters for observability
//! - **Errors** (`error`): the boundary fault taxonomy and its errno mapping

#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod metrics;
pub mod registry;

pub use config::{RegistryConfig, SafetyLevel};
pub use error::BoundaryError;
pub use metrics::{BoundaryMetrics, MetricsSnapshot, global_metrics};
pub use registry::{HandleRegistry, HandleState, ObjectHandle, Owner};
