//! ABI layer for synchronous callback dispatch.
//!
//! Native code receives a nullable function pointer plus opaque user data and
//! calls it before returning to its caller. The pointer is only valid for the
//! duration of the receiving call; nothing here stores it.

use std::ffi::{c_int, c_void};

use handoff_membrane::{BoundaryError, BoundaryMetrics, global_metrics};

use crate::util::status_of;

/// Host function invoked from native code.
///
/// Returns `0` on success. Any other value tells native code the host side
/// failed, and native code unwinds its own work before reporting `ECANCELED`.
pub type HandoffCallback = unsafe extern "C" fn(value: c_int, user_data: *mut c_void) -> c_int;

/// Argument passed to every dispatched callback.
pub const HANDOFF_CALLBACK_ARG: c_int = 42;

/// Invoke `callback` exactly once with `42`, then return.
///
/// Returns `EINVAL` when `callback` is null (nothing is invoked) and
/// `ECANCELED` when the callback reports failure.
///
/// # Safety
///
/// `callback`, when non-null, must be safe to call with `user_data`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn handoff_callme(
    callback: Option<HandoffCallback>,
    user_data: *mut c_void,
) -> c_int {
    let Some(callback) = callback else {
        return status_of(Err(BoundaryError::ContractViolation(
            "callback slot is empty",
        )));
    };
    // SAFETY: forwarded caller contract.
    status_of(unsafe { dispatch(callback, user_data) })
}

/// Call `callback` once and translate its status.
///
/// # Safety
///
/// `callback` must be safe to call with `user_data`.
pub(crate) unsafe fn dispatch(
    callback: HandoffCallback,
    user_data: *mut c_void,
) -> Result<(), BoundaryError> {
    BoundaryMetrics::inc(&global_metrics().callbacks_dispatched);
    // SAFETY: forwarded caller contract.
    let status = unsafe { callback(HANDOFF_CALLBACK_ARG, user_data) };
    if status == 0 {
        Ok(())
    } else {
        Err(BoundaryError::CallbackFailed { status })
    }
}
