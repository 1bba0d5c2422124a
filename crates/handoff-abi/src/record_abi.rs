//! ABI layer for aggregate marshalling.
//!
//! `Record` crosses the edge by value (both fields copied into the callee's
//! frame) or by pointer (the callee reads and writes the caller's storage).

use std::ffi::{CStr, c_char, c_int};

use handoff_core::Record;
use handoff_core::record::{
    double_value, nudge, render_by_reference, render_by_value, render_message,
};
use handoff_membrane::BoundaryError;

use crate::util::{render_fault, status_of, write_out};

/// Returns `2 * x`, wrapping at the `int32_t` bounds.
#[unsafe(no_mangle)]
pub extern "C" fn handoff_double_it(x: c_int) -> c_int {
    double_value(x)
}

/// Render a record received by value into `buf`.
///
/// Returns the full rendered length (excluding the NUL), or `-EINVAL` for a
/// null `buf` with non-zero `cap`.
///
/// # Safety
///
/// `buf` must be null with `cap == 0`, or valid for writes of `cap` bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn handoff_describe_record(
    record: Record,
    buf: *mut c_char,
    cap: usize,
) -> isize {
    // SAFETY: forwarded caller contract.
    unsafe { write_out(&render_by_value(record), buf, cap) }
}

/// Render a record read through `record` into `buf`.
///
/// Returns `-EINVAL` when `record` is null.
///
/// # Safety
///
/// `record` must be null or point to a readable `Record`; `buf` as for
/// [`handoff_describe_record`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn handoff_describe_record_ptr(
    record: *const Record,
    buf: *mut c_char,
    cap: usize,
) -> isize {
    // SAFETY: null or a readable Record per the caller contract.
    let Some(record) = (unsafe { record.as_ref() }) else {
        return render_fault(BoundaryError::ContractViolation("null record pointer"));
    };
    // SAFETY: forwarded caller contract.
    unsafe { write_out(&render_by_reference(record), buf, cap) }
}

/// Increment `x` on the callee's own copy and hand that copy back.
///
/// The caller's original is not reachable from here.
#[unsafe(no_mangle)]
pub extern "C" fn handoff_nudge_record(mut record: Record) -> Record {
    nudge(&mut record);
    record
}

/// Increment `x` in the caller's storage.
///
/// # Safety
///
/// `record` must be null or point to a writable `Record` not aliased for the
/// duration of the call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn handoff_nudge_record_ptr(record: *mut Record) -> c_int {
    // SAFETY: null or an exclusive writable Record per the caller contract.
    let Some(record) = (unsafe { record.as_mut() }) else {
        return status_of(Err(BoundaryError::ContractViolation("null record pointer")));
    };
    nudge(record);
    status_of(Ok(()))
}

/// Render a NUL-terminated message into `buf`.
///
/// Invalid UTF-8 is replaced, not rejected. Returns `-EINVAL` for a null
/// `message`.
///
/// # Safety
///
/// `message` must be null or a valid NUL-terminated string; `buf` as for
/// [`handoff_describe_record`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn handoff_describe_message(
    message: *const c_char,
    buf: *mut c_char,
    cap: usize,
) -> isize {
    if message.is_null() {
        return render_fault(BoundaryError::ContractViolation("null message pointer"));
    }
    // SAFETY: non-null and NUL-terminated per the caller contract.
    let text = unsafe { CStr::from_ptr(message) }.to_string_lossy();
    // SAFETY: forwarded caller contract.
    unsafe { write_out(&render_message(&text), buf, cap) }
}
