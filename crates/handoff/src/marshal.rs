//! Aggregate and string marshalling across the C ABI.
//!
//! Every function here goes through the exported `handoff_*` symbol, so the
//! record really is copied into the callee's frame (by value) or read through
//! the caller's storage (by reference).

use std::ffi::{CStr, CString, c_char};

use handoff_abi::record_abi::{
    handoff_describe_message, handoff_describe_record, handoff_describe_record_ptr,
    handoff_double_it, handoff_nudge_record, handoff_nudge_record_ptr,
};
use handoff_core::Record;
use handoff_membrane::{BoundaryError, ObjectHandle};

/// `2 * x`, wrapping at the `i32` bounds.
///
/// ```
/// assert_eq!(handoff::marshal::double_value(21), 42);
/// assert_eq!(handoff::marshal::double_value(i32::MAX), -2);
/// ```
#[must_use]
pub fn double_value(x: i32) -> i32 {
    handoff_double_it(x)
}

/// Render a record the callee received as its own copy.
pub fn describe_by_value(record: Record) -> Result<String, BoundaryError> {
    // SAFETY: `render_with` hands in a null buffer with `cap == 0` or a live
    // buffer of `cap` bytes.
    render_with(|buf, cap| unsafe { handoff_describe_record(record, buf, cap) })
}

/// Render a record the callee read through the caller's storage.
pub fn describe_by_reference(record: &Record) -> Result<String, BoundaryError> {
    // SAFETY: `record` is borrowed for the call; buffers as above.
    render_with(|buf, cap| unsafe { handoff_describe_record_ptr(record, buf, cap) })
}

/// Let the callee increment `x` on its copy; the caller's record is untouched.
#[must_use]
pub fn nudge_by_value(record: Record) -> Record {
    handoff_nudge_record(record)
}

/// Let the callee increment `x` in the caller's record.
pub fn nudge_by_reference(record: &mut Record) -> Result<(), BoundaryError> {
    // SAFETY: `record` is an exclusive borrow for the call.
    match unsafe { handoff_nudge_record_ptr(record) } {
        0 => Ok(()),
        rc => Err(BoundaryError::from_errno(rc, ObjectHandle::NULL)),
    }
}

/// Send `text` as a C string and return what native code rendered from it.
pub fn describe_message(text: &str) -> Result<String, BoundaryError> {
    let message = CString::new(text)
        .map_err(|_| BoundaryError::ContractViolation("interior NUL in message"))?;
    // SAFETY: `message` is NUL-terminated and outlives the call; buffers as
    // above.
    render_with(|buf, cap| unsafe { handoff_describe_message(message.as_ptr(), buf, cap) })
}

/// Size the output with a `cap = 0` query, then render into a buffer of that
/// size.
fn render_with<F>(render: F) -> Result<String, BoundaryError>
where
    F: Fn(*mut c_char, usize) -> isize,
{
    let needed = render(std::ptr::null_mut(), 0);
    let Ok(needed) = usize::try_from(needed) else {
        return Err(fault(needed));
    };
    let mut buf = vec![0 as c_char; needed + 1];
    let written = render(buf.as_mut_ptr(), buf.len());
    if written < 0 {
        return Err(fault(written));
    }
    // SAFETY: the callee NUL-terminates within `buf`.
    let text = unsafe { CStr::from_ptr(buf.as_ptr()) };
    Ok(text.to_string_lossy().into_owned())
}

fn fault(rc: isize) -> BoundaryError {
    let code = rc
        .checked_neg()
        .and_then(|code| i32::try_from(code).ok())
        .unwrap_or(libc::EINVAL);
    BoundaryError::from_errno(code, ObjectHandle::NULL)
}
