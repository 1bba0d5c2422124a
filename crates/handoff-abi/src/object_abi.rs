//! ABI layer for exclusively owned native objects.
//!
//! Objects are named by generational handles, never by address. Releasing an
//! object destroys it on the spot and bumps its slot generation, so every
//! later call through the old handle fails with `EFAULT` instead of reading
//! freed memory. There is no "released but still allocated" state.
//!
//! Construction is two-phase: the object is allocated and initialized, then the
//! optional construction callback runs, and only then is a handle minted. A
//! failing callback destroys the object and mints nothing.

use std::ffi::{c_char, c_int, c_void};

use handoff_core::NativeObject;
use handoff_core::object::hello_lines;
use handoff_membrane::{
    BoundaryError, BoundaryMetrics, HandleState, ObjectHandle, Owner, global_metrics,
};

use crate::callback_abi::{HandoffCallback, dispatch};
use crate::membrane_state::object_registry;
use crate::util::status_of;

/// Receives one `say_hello` line.
///
/// `line` is NUL-terminated and valid only during the call; `len` excludes the
/// NUL; `index` is the iteration index.
pub type HandoffLineSink =
    unsafe extern "C" fn(line: *const c_char, len: usize, index: u64, user_data: *mut c_void);

/// Owner code for the host side.
pub const HANDOFF_OWNER_HOST: c_int = 1;
/// Owner code for the native side.
pub const HANDOFF_OWNER_NATIVE: c_int = 2;

/// `handoff_object_state` result: handle never minted.
pub const HANDOFF_STATE_UNKNOWN: c_int = 0;
/// `handoff_object_state` result: live, owned by the host.
pub const HANDOFF_STATE_LIVE_HOST: c_int = 1;
/// `handoff_object_state` result: live, owned by native code.
pub const HANDOFF_STATE_LIVE_NATIVE: c_int = 2;
/// `handoff_object_state` result: object released.
pub const HANDOFF_STATE_RELEASED: c_int = 3;

/// Create an object with `counter = 1`, owned by the host.
///
/// Writes the handle to `out_handle`. Returns `EINVAL` for a null
/// `out_handle`, in which case nothing is constructed.
///
/// # Safety
///
/// `out_handle` must be null or valid for a `u64` write.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn handoff_object_create(out_handle: *mut u64) -> c_int {
    // SAFETY: forwarded caller contract; no callback.
    unsafe { handoff_object_create_with(None, std::ptr::null_mut(), out_handle) }
}

/// Create an object, invoking `on_construct` once before the handle is minted.
///
/// On callback failure the object is destroyed, `*out_handle` is set to `0`
/// and `ECANCELED` is returned.
///
/// # Safety
///
/// `out_handle` must be null or valid for a `u64` write; `on_construct`, when
/// non-null, must be safe to call with `user_data`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn handoff_object_create_with(
    on_construct: Option<HandoffCallback>,
    user_data: *mut c_void,
    out_handle: *mut u64,
) -> c_int {
    // SAFETY: null or writable per the caller contract.
    let Some(out) = (unsafe { out_handle.as_mut() }) else {
        return status_of(Err(BoundaryError::ContractViolation(
            "null handle output pointer",
        )));
    };
    *out = ObjectHandle::NULL.as_raw();

    let object = NativeObject::new();
    if let Some(callback) = on_construct {
        // SAFETY: forwarded caller contract.
        if let Err(err) = unsafe { dispatch(callback, user_data) } {
            drop(object);
            return status_of(Err(err));
        }
    }

    *out = object_registry().insert(object, Owner::Host).as_raw();
    status_of(Ok(()))
}

/// Read the counter into `out_value`.
///
/// # Safety
///
/// `out_value` must be null or valid for a `u64` write.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn handoff_object_counter(handle: u64, out_value: *mut u64) -> c_int {
    // SAFETY: null or writable per the caller contract.
    let Some(out) = (unsafe { out_value.as_mut() }) else {
        return status_of(Err(BoundaryError::ContractViolation(
            "null counter output pointer",
        )));
    };
    let handle = ObjectHandle::from_raw(handle);
    status_of(object_registry().with(handle, NativeObject::counter).map(|value| {
        *out = value;
    }))
}

/// Overwrite the counter in place.
#[unsafe(no_mangle)]
pub extern "C" fn handoff_object_set_counter(handle: u64, value: u64) -> c_int {
    let handle = ObjectHandle::from_raw(handle);
    status_of(object_registry().with_mut(handle, |obj| obj.set_counter(value)))
}

/// Emit `counter` greeting lines through `sink`, one per iteration index.
///
/// The counter is read once up front and the registry lock is dropped before
/// the first line is emitted, so `sink` may call back into this crate.
///
/// # Safety
///
/// `sink`, when non-null, must be safe to call with `user_data`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn handoff_object_say_hello(
    handle: u64,
    sink: Option<HandoffLineSink>,
    user_data: *mut c_void,
) -> c_int {
    let Some(sink) = sink else {
        return status_of(Err(BoundaryError::ContractViolation("line sink is empty")));
    };
    let handle = ObjectHandle::from_raw(handle);
    let counter = match object_registry().with(handle, NativeObject::counter) {
        Ok(counter) => counter,
        Err(err) => return status_of(Err(err)),
    };

    for (index, line) in (0_u64..).zip(hello_lines(counter)) {
        let len = line.len();
        let mut bytes = line.into_bytes();
        bytes.push(0);
        // SAFETY: `bytes` is NUL-terminated and outlives the call; the sink
        // contract is forwarded from our caller.
        unsafe { sink(bytes.as_ptr().cast::<c_char>(), len, index, user_data) };
    }
    status_of(Ok(()))
}

/// Destroy the object now on behalf of `owner` (`HANDOFF_OWNER_*`). Every
/// handle to it goes stale.
///
/// Returns `EBUSY` and leaves the object live when `owner` does not hold it.
/// A second release through the same handle returns `EFAULT`.
#[unsafe(no_mangle)]
pub extern "C" fn handoff_object_release(handle: u64, owner: c_int) -> c_int {
    let Some(owner) = owner_from_code(owner) else {
        return status_of(Err(BoundaryError::ContractViolation("unknown owner code")));
    };
    let handle = ObjectHandle::from_raw(handle);
    let result = object_registry().remove_owned(handle, owner).map(|object| {
        BoundaryMetrics::inc(&global_metrics().releases);
        drop(object);
    });
    status_of(result)
}

/// Move ownership from `from` to `to` (`HANDOFF_OWNER_*`).
///
/// Returns `EBUSY` if `from` does not currently own the object and `EINVAL`
/// if `from == to`.
#[unsafe(no_mangle)]
pub extern "C" fn handoff_object_claim(handle: u64, from: c_int, to: c_int) -> c_int {
    let (Some(from), Some(to)) = (owner_from_code(from), owner_from_code(to)) else {
        return status_of(Err(BoundaryError::ContractViolation("unknown owner code")));
    };
    let handle = ObjectHandle::from_raw(handle);
    let result = object_registry().claim(handle, from, to);
    if result.is_ok() {
        BoundaryMetrics::inc(&global_metrics().transfers);
    }
    status_of(result)
}

/// Classify a handle (`HANDOFF_STATE_*`). Never faults.
#[unsafe(no_mangle)]
pub extern "C" fn handoff_object_state(handle: u64) -> c_int {
    match object_registry().state(ObjectHandle::from_raw(handle)) {
        HandleState::Live { owner: Owner::Host } => HANDOFF_STATE_LIVE_HOST,
        HandleState::Live {
            owner: Owner::Native,
        } => HANDOFF_STATE_LIVE_NATIVE,
        HandleState::Released => HANDOFF_STATE_RELEASED,
        HandleState::Unknown => HANDOFF_STATE_UNKNOWN,
    }
}

fn owner_from_code(code: c_int) -> Option<Owner> {
    match code {
        HANDOFF_OWNER_HOST => Some(Owner::Host),
        HANDOFF_OWNER_NATIVE => Some(Owner::Native),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    unsafe extern "C" fn collect_line(
        line: *const c_char,
        len: usize,
        index: u64,
        user_data: *mut c_void,
    ) {
        // SAFETY: tests pass a pointer to a live Vec<(u64, String)>.
        let lines = unsafe { &mut *user_data.cast::<Vec<(u64, String)>>() };
        // SAFETY: sink contract guarantees `len` readable bytes.
        let bytes = unsafe { std::slice::from_raw_parts(line.cast::<u8>(), len) };
        lines.push((index, String::from_utf8_lossy(bytes).into_owned()));
    }

    fn create() -> u64 {
        let mut handle = 0_u64;
        // SAFETY: `handle` is a live local.
        assert_eq!(unsafe { handoff_object_create(&mut handle) }, 0);
        assert_ne!(handle, 0);
        handle
    }

    fn counter_of(handle: u64) -> Result<u64, c_int> {
        let mut value = 0_u64;
        // SAFETY: `value` is a live local.
        match unsafe { handoff_object_counter(handle, &mut value) } {
            0 => Ok(value),
            rc => Err(rc),
        }
    }

    #[test]
    fn create_set_and_say_hello() {
        let handle = create();
        assert_eq!(counter_of(handle), Ok(1));
        assert_eq!(handoff_object_set_counter(handle, 5), 0);

        let mut lines: Vec<(u64, String)> = Vec::new();
        // SAFETY: `lines` outlives the call and matches `collect_line`.
        let rc = unsafe {
            handoff_object_say_hello(
                handle,
                Some(collect_line),
                (&mut lines as *mut Vec<(u64, String)>).cast::<c_void>(),
            )
        };
        assert_eq!(rc, 0);
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[3], (3, "Hello from native object run (3)".to_string()));
        assert_eq!(counter_of(handle), Ok(5));
        assert_eq!(handoff_object_release(handle, HANDOFF_OWNER_HOST), 0);
    }

    #[test]
    fn released_handle_faults_everywhere() {
        let handle = create();
        assert_eq!(handoff_object_release(handle, HANDOFF_OWNER_HOST), 0);

        assert_eq!(handoff_object_state(handle), HANDOFF_STATE_RELEASED);
        assert_eq!(counter_of(handle), Err(libc::EFAULT));
        assert_eq!(handoff_object_set_counter(handle, 3), libc::EFAULT);
        assert_eq!(handoff_object_release(handle, HANDOFF_OWNER_HOST), libc::EFAULT);
        assert_eq!(
            handoff_object_claim(handle, HANDOFF_OWNER_HOST, HANDOFF_OWNER_NATIVE),
            libc::EFAULT
        );
        let mut lines: Vec<(u64, String)> = Vec::new();
        // SAFETY: `lines` outlives the call and matches `collect_line`.
        let rc = unsafe {
            handoff_object_say_hello(
                handle,
                Some(collect_line),
                (&mut lines as *mut Vec<(u64, String)>).cast::<c_void>(),
            )
        };
        assert_eq!(rc, libc::EFAULT);
        assert!(lines.is_empty());
    }

    #[test]
    fn unknown_and_null_handles() {
        assert_eq!(handoff_object_state(0), HANDOFF_STATE_UNKNOWN);
        assert_eq!(handoff_object_set_counter(0, 1), libc::EBADF);
        assert_eq!(handoff_object_release(0, HANDOFF_OWNER_HOST), libc::EBADF);
    }

    #[test]
    fn null_outputs_are_contract_violations() {
        // SAFETY: null is the case under test.
        assert_eq!(unsafe { handoff_object_create(std::ptr::null_mut()) }, libc::EINVAL);
        let handle = create();
        // SAFETY: null is the case under test.
        assert_eq!(
            unsafe { handoff_object_counter(handle, std::ptr::null_mut()) },
            libc::EINVAL
        );
        // SAFETY: null sink is the case under test.
        assert_eq!(
            unsafe { handoff_object_say_hello(handle, None, std::ptr::null_mut()) },
            libc::EINVAL
        );
        assert_eq!(handoff_object_release(handle, HANDOFF_OWNER_HOST), 0);
    }

    #[test]
    fn claim_moves_ownership_once() {
        let handle = create();
        assert_eq!(handoff_object_state(handle), HANDOFF_STATE_LIVE_HOST);
        assert_eq!(
            handoff_object_claim(handle, HANDOFF_OWNER_HOST, HANDOFF_OWNER_NATIVE),
            0
        );
        assert_eq!(handoff_object_state(handle), HANDOFF_STATE_LIVE_NATIVE);
        assert_eq!(
            handoff_object_claim(handle, HANDOFF_OWNER_HOST, HANDOFF_OWNER_NATIVE),
            libc::EBUSY
        );
        assert_eq!(handoff_object_claim(handle, 7, HANDOFF_OWNER_HOST), libc::EINVAL);
        assert_eq!(
            handoff_object_claim(handle, HANDOFF_OWNER_NATIVE, HANDOFF_OWNER_NATIVE),
            libc::EINVAL
        );
        assert_eq!(handoff_object_release(handle, HANDOFF_OWNER_HOST), libc::EBUSY);
        assert_eq!(handoff_object_release(handle, 0), libc::EINVAL);
        assert_eq!(handoff_object_release(handle, HANDOFF_OWNER_NATIVE), 0);
    }
}
