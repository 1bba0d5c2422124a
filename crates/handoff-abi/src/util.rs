//! Shared internal utilities for ABI adapters.

use std::ffi::{c_char, c_int};

use handoff_core::render::write_terminated;
use handoff_membrane::{BoundaryError, BoundaryMetrics, global_metrics};

use crate::HANDOFF_OK;

/// Count a fault in the global metrics.
pub(crate) fn record_fault(err: &BoundaryError) {
    let metrics = global_metrics();
    match err {
        BoundaryError::ContractViolation(_) => BoundaryMetrics::inc(&metrics.contract_violations),
        BoundaryError::UseAfterRelease { .. } => {
            BoundaryMetrics::inc(&metrics.use_after_release_faults);
        }
        BoundaryError::UnknownHandle { .. } => BoundaryMetrics::inc(&metrics.unknown_handles),
        BoundaryError::OwnershipConflict { .. } => {
            BoundaryMetrics::inc(&metrics.ownership_conflicts);
        }
        BoundaryError::CallbackFailed { .. } => BoundaryMetrics::inc(&metrics.callbacks_failed),
        BoundaryError::WorkerPanicked { .. } => {}
    }
}

/// Collapse a result into a C status code, counting the fault if any.
pub(crate) fn status_of(result: Result<(), BoundaryError>) -> c_int {
    match result {
        Ok(()) => HANDOFF_OK,
        Err(err) => {
            record_fault(&err);
            err.errno()
        }
    }
}

/// Render `text` into a caller buffer with `snprintf` semantics.
///
/// Returns the full rendered length, or `-EINVAL` for a null buffer with a
/// non-zero capacity.
///
/// # Safety
///
/// When `buf` is non-null it must be valid for writes of `cap` bytes.
pub(crate) unsafe fn write_out(text: &str, buf: *mut c_char, cap: usize) -> isize {
    if cap == 0 {
        return isize::try_from(text.len()).unwrap_or(isize::MAX);
    }
    if buf.is_null() {
        record_fault(&BoundaryError::ContractViolation("null output buffer"));
        return -(libc::EINVAL as isize);
    }
    // SAFETY: non-null and valid for `cap` bytes per the caller contract.
    let out = unsafe { std::slice::from_raw_parts_mut(buf.cast::<u8>(), cap) };
    isize::try_from(write_terminated(text, out)).unwrap_or(isize::MAX)
}

/// Negated errno for a rendering entry point.
pub(crate) fn render_fault(err: BoundaryError) -> isize {
    record_fault(&err);
    -(err.errno() as isize)
}
