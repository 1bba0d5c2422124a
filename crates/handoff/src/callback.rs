//! Host closures exposed to native code as C callbacks.
//!
//! A closure is parked in a [`HostCallback`] slot on the caller's stack and
//! handed to native code as a monomorphized `extern "C"` trampoline plus a
//! pointer to the slot. The trampoline takes the closure out of its `Option`,
//! so a second invocation finds nothing to call. Panics are caught before they
//! reach native frames and resumed once native code has returned.
//!
//! A missing callback cannot be expressed:
//!
//! ```compile_fail
//! handoff::invoke_with_callback(None);
//! ```

use std::any::Any;
use std::ffi::{c_int, c_void};
use std::panic::{AssertUnwindSafe, catch_unwind, resume_unwind};

use handoff_abi::HandoffCallback;
use handoff_abi::callback_abi::handoff_callme;
use handoff_membrane::{BoundaryError, ObjectHandle};

/// Trampoline status: closure returned normally and accepted the call.
const ACCEPTED: c_int = 0;
/// Trampoline status: closure declined (fallible variants only).
const DECLINED: c_int = 1;
/// Trampoline status: closure panicked; payload is stashed in the slot.
const PANICKED: c_int = 2;
/// Trampoline status: closure already consumed by an earlier call.
const SPENT: c_int = 3;

struct Slot<F> {
    callback: Option<F>,
    panic: Option<Box<dyn Any + Send + 'static>>,
    status: Option<c_int>,
}

/// A closure parked for one native call.
pub(crate) struct HostCallback<F> {
    slot: Slot<F>,
}

impl<F> HostCallback<F>
where
    F: FnOnce(i32) -> bool,
{
    pub(crate) fn new(callback: F) -> Self {
        Self {
            slot: Slot {
                callback: Some(callback),
                panic: None,
                status: None,
            },
        }
    }

    /// Function pointer and user data to hand to native code.
    ///
    /// The pointer is valid while `self` is neither moved nor dropped.
    pub(crate) fn as_raw(&mut self) -> (HandoffCallback, *mut c_void) {
        (
            trampoline::<F>,
            (&mut self.slot as *mut Slot<F>).cast::<c_void>(),
        )
    }

    /// True once native code has invoked the closure.
    pub(crate) fn was_called(&self) -> bool {
        self.slot.callback.is_none()
    }

    /// Settle the native call: resume a caught panic, or map `rc`.
    pub(crate) fn finish(self, rc: c_int) -> Result<(), BoundaryError> {
        if let Some(payload) = self.slot.panic {
            resume_unwind(payload);
        }
        match (rc, self.slot.status) {
            (0, _) => Ok(()),
            (_, Some(status)) if status != ACCEPTED => {
                Err(BoundaryError::CallbackFailed { status })
            }
            (rc, _) => Err(BoundaryError::from_errno(rc, ObjectHandle::NULL)),
        }
    }
}

unsafe extern "C" fn trampoline<F>(value: c_int, user_data: *mut c_void) -> c_int
where
    F: FnOnce(i32) -> bool,
{
    // SAFETY: `user_data` is the `Slot<F>` borrowed by `HostCallback::as_raw`,
    // alive and unaliased for the duration of the native call.
    let slot = unsafe { &mut *user_data.cast::<Slot<F>>() };
    let Some(callback) = slot.callback.take() else {
        return SPENT;
    };
    let status = match catch_unwind(AssertUnwindSafe(|| callback(value))) {
        Ok(true) => ACCEPTED,
        Ok(false) => DECLINED,
        Err(payload) => {
            slot.panic = Some(payload);
            PANICKED
        }
    };
    slot.status = Some(status);
    status
}

/// Have native code call `callback` once with `42` before this returns.
///
/// A panic inside `callback` propagates out of this function after native code
/// has unwound its own frame.
///
/// ```
/// let mut calls = Vec::new();
/// handoff::invoke_with_callback(|n| calls.push(n)).unwrap();
/// assert_eq!(calls, vec![42]);
/// ```
pub fn invoke_with_callback<F>(callback: F) -> Result<(), BoundaryError>
where
    F: FnOnce(i32),
{
    let mut host = HostCallback::new(move |value| {
        callback(value);
        true
    });
    let (function, user_data) = host.as_raw();
    // SAFETY: `host` outlives the call and matches `function`.
    let rc = unsafe { handoff_callme(Some(function), user_data) };
    debug_assert!(host.was_called() || rc != 0);
    host.finish(rc)
}

/// What a C caller gets for a null callback: `ContractViolation`, and nothing
/// is invoked.
pub fn invoke_without_callback() -> Result<(), BoundaryError> {
    // SAFETY: a null callback is rejected before anything is called.
    match unsafe { handoff_callme(None, std::ptr::null_mut()) } {
        0 => Ok(()),
        rc => Err(BoundaryError::from_errno(rc, ObjectHandle::NULL)),
    }
}
