// extern "C" entry points take raw pointers from C callers; each one documents
// the pointer contract in its own doc comment.
#![allow(clippy::missing_safety_doc)]
//! # handoff-abi
//!
//! The native side of the handoff boundary: `extern "C"` symbols that speak
//! only C types (`#[repr(C)]` records, raw pointers, `c_int` status codes and
//! opaque 64-bit object handles).
//!
//! # Architecture
//!
//! ```text
//! C / host caller -> ABI entry (this crate) -> handle registry -> core impl -> status
//! ```
//!
//! Status codes are `0` on success or a positive errno value:
//! `EINVAL` (contract violation), `EFAULT` (use after release), `EBADF`
//! (unknown handle), `EBUSY` (ownership conflict), `ECANCELED` (callback
//! failed). Rendering entry points return the rendered length, or a negated
//! errno.

mod membrane_state;
mod util;

pub mod callback_abi;
pub mod object_abi;
pub mod record_abi;

pub use callback_abi::{HANDOFF_CALLBACK_ARG, HandoffCallback};
pub use handoff_core::Record;
pub use membrane_state::object_registry;
pub use object_abi::HandoffLineSink;

/// Success status shared by every status-returning entry point.
pub const HANDOFF_OK: std::ffi::c_int = 0;
