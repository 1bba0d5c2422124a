//! Safe host-side API over the handoff native boundary.
//!
//! Every call here crosses into `handoff-abi` through its `extern "C"`
//! symbols; nothing reaches into the native side's registry directly. What the
//! C ABI can only detect at run time (a missing callback, a stale handle) is
//! pushed into the type system where it can be:
//!
//! - callbacks are non-optional `FnOnce` closures, invoked at most once;
//! - [`OwnedObject`] is a move-only token, so releasing it ends the binding;
//! - [`ObjectView`] borrows the token and cannot outlive it;
//! - copies are explicit: `&CopyProbe` never copies, `.clone()` always shows.

pub mod callback;
pub mod guard;
pub mod marshal;
pub mod ownership;

pub use callback::{invoke_with_callback, invoke_without_callback};
pub use handoff_core::copy_probe::{print_by_value, print_by_view};
pub use handoff_core::{CopyProbe, Record};
pub use handoff_membrane::{BoundaryError, HandleState, ObjectHandle, Owner};
pub use ownership::{ObjectView, OwnedObject, counter_of, state_of};
