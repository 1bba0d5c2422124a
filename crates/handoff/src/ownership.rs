//! Exclusive ownership of native objects on the host side.
//!
//! [`OwnedObject`] is a move-only token for one native object. Releasing it,
//! handing it to native code, or letting it fall out of scope all consume the
//! token, so no host binding survives that could still reach the object:
//!
//! ```compile_fail
//! let obj = handoff::OwnedObject::create().unwrap();
//! obj.release().unwrap();
//! obj.say_hello().unwrap(); // use of moved value
//! ```
//!
//! Non-owning access goes through [`ObjectView`], which borrows the token:
//!
//! ```compile_fail
//! let obj = handoff::OwnedObject::create().unwrap();
//! let view = obj.view();
//! obj.release().unwrap(); // cannot move out while borrowed
//! view.counter().unwrap();
//! ```
//!
//! A raw [`ObjectHandle`] copied out with [`OwnedObject::handle`] carries no
//! ownership. Native calls through it after release fail with
//! `UseAfterRelease`.

use std::ffi::{c_char, c_int, c_void};
use std::mem::ManuallyDrop;

use handoff_abi::object_abi::{
    HANDOFF_OWNER_HOST, HANDOFF_OWNER_NATIVE, HANDOFF_STATE_LIVE_HOST, HANDOFF_STATE_LIVE_NATIVE,
    HANDOFF_STATE_RELEASED, handoff_object_claim, handoff_object_counter,
    handoff_object_create_with, handoff_object_release, handoff_object_say_hello,
    handoff_object_set_counter, handoff_object_state,
};
use handoff_membrane::{BoundaryError, HandleState, ObjectHandle, Owner};

use crate::callback::HostCallback;

fn check(rc: c_int, handle: ObjectHandle) -> Result<(), BoundaryError> {
    match rc {
        0 => Ok(()),
        rc => Err(BoundaryError::from_errno(rc, handle)),
    }
}

/// Move-only host token owning one native object.
#[derive(Debug)]
pub struct OwnedObject {
    handle: ObjectHandle,
}

impl OwnedObject {
    /// Construct a native object with `counter = 1`.
    ///
    /// ```
    /// let mut obj = handoff::OwnedObject::create().unwrap();
    /// assert_eq!(obj.counter().unwrap(), 1);
    /// obj.set_counter(2).unwrap();
    /// assert_eq!(obj.say_hello().unwrap().len(), 2);
    /// ```
    pub fn create() -> Result<Self, BoundaryError> {
        let mut raw = 0_u64;
        // SAFETY: `raw` is a live local; no callback.
        let rc = unsafe { handoff_object_create_with(None, std::ptr::null_mut(), &mut raw) };
        check(rc, ObjectHandle::NULL)?;
        Ok(Self {
            handle: ObjectHandle::from_raw(raw),
        })
    }

    /// Construct, letting native code call `on_construct(42)` before the token
    /// exists.
    ///
    /// If `on_construct` panics, native code destroys the half-built object
    /// and the panic resumes here; no token is ever produced.
    pub fn create_with<F>(on_construct: F) -> Result<Self, BoundaryError>
    where
        F: FnOnce(i32),
    {
        Self::try_create_with(move |value| {
            on_construct(value);
            true
        })
    }

    /// Like [`OwnedObject::create_with`], but `on_construct` may decline by
    /// returning `false`, which destroys the object and yields
    /// `CallbackFailed`.
    pub fn try_create_with<F>(on_construct: F) -> Result<Self, BoundaryError>
    where
        F: FnOnce(i32) -> bool,
    {
        let mut host = HostCallback::new(on_construct);
        let (function, user_data) = host.as_raw();
        let mut raw = 0_u64;
        // SAFETY: `host` and `raw` outlive the call; `function` matches `host`.
        let rc = unsafe { handoff_object_create_with(Some(function), user_data, &mut raw) };
        host.finish(rc)?;
        Ok(Self {
            handle: ObjectHandle::from_raw(raw),
        })
    }

    /// Identity of the owned object. Carries no ownership: a release through
    /// it on the native side is refused with `OwnershipConflict`.
    #[must_use]
    pub fn handle(&self) -> ObjectHandle {
        self.handle
    }

    pub fn counter(&self) -> Result<u64, BoundaryError> {
        counter_of(self.handle)
    }

    pub fn set_counter(&mut self, value: u64) -> Result<(), BoundaryError> {
        check(
            handoff_object_set_counter(self.handle.as_raw(), value),
            self.handle,
        )
    }

    /// One greeting line per iteration index, `counter` lines in total.
    pub fn say_hello(&self) -> Result<Vec<String>, BoundaryError> {
        let mut lines: Vec<String> = Vec::new();
        // SAFETY: `lines` outlives the call and matches `push_line`.
        let rc = unsafe {
            handoff_object_say_hello(
                self.handle.as_raw(),
                Some(push_line),
                (&mut lines as *mut Vec<String>).cast::<c_void>(),
            )
        };
        check(rc, self.handle)?;
        Ok(lines)
    }

    /// Borrow a non-owning view bounded by this token's lifetime.
    #[must_use]
    pub fn view(&self) -> ObjectView<'_> {
        ObjectView { owner: self }
    }

    /// Give the object up now. It is destroyed before this returns.
    pub fn release(self) -> Result<(), BoundaryError> {
        let handle = ManuallyDrop::new(self).handle;
        check(
            handoff_object_release(handle.as_raw(), HANDOFF_OWNER_HOST),
            handle,
        )
    }

    /// Hand ownership to native code. The object stays alive, owned by the
    /// returned handle, until native code releases it or the host reclaims it
    /// with [`OwnedObject::from_raw`].
    pub fn into_raw(self) -> Result<ObjectHandle, BoundaryError> {
        let handle = self.handle;
        check(
            handoff_object_claim(handle.as_raw(), HANDOFF_OWNER_HOST, HANDOFF_OWNER_NATIVE),
            handle,
        )?;
        let _ = ManuallyDrop::new(self);
        Ok(handle)
    }

    /// Take back an object previously handed out with
    /// [`OwnedObject::into_raw`].
    ///
    /// Only one reclaim can succeed; a second one reports `OwnershipConflict`.
    pub fn from_raw(handle: ObjectHandle) -> Result<Self, BoundaryError> {
        check(
            handoff_object_claim(handle.as_raw(), HANDOFF_OWNER_NATIVE, HANDOFF_OWNER_HOST),
            handle,
        )?;
        Ok(Self { handle })
    }
}

impl Drop for OwnedObject {
    fn drop(&mut self) {
        // The token is the sole host owner and native code cannot release a
        // host-owned object, so this cannot fault.
        let _ = handoff_object_release(self.handle.as_raw(), HANDOFF_OWNER_HOST);
    }
}

/// Read-only borrow of an owned object.
#[derive(Debug, Clone, Copy)]
pub struct ObjectView<'a> {
    owner: &'a OwnedObject,
}

impl ObjectView<'_> {
    #[must_use]
    pub fn handle(&self) -> ObjectHandle {
        self.owner.handle
    }

    pub fn counter(&self) -> Result<u64, BoundaryError> {
        self.owner.counter()
    }

    pub fn say_hello(&self) -> Result<Vec<String>, BoundaryError> {
        self.owner.say_hello()
    }
}

/// Read the counter through a bare handle, the way native code holding a
/// copied handle would. Fails with `UseAfterRelease` once the object is gone.
pub fn counter_of(handle: ObjectHandle) -> Result<u64, BoundaryError> {
    let mut value = 0_u64;
    // SAFETY: `value` is a live local.
    let rc = unsafe { handoff_object_counter(handle.as_raw(), &mut value) };
    check(rc, handle)?;
    Ok(value)
}

/// Classify a bare handle without touching the object.
#[must_use]
pub fn state_of(handle: ObjectHandle) -> HandleState {
    match handoff_object_state(handle.as_raw()) {
        HANDOFF_STATE_LIVE_HOST => HandleState::Live { owner: Owner::Host },
        HANDOFF_STATE_LIVE_NATIVE => HandleState::Live {
            owner: Owner::Native,
        },
        HANDOFF_STATE_RELEASED => HandleState::Released,
        _ => HandleState::Unknown,
    }
}

unsafe extern "C" fn push_line(
    line: *const c_char,
    len: usize,
    _index: u64,
    user_data: *mut c_void,
) {
    // SAFETY: `user_data` is the `Vec<String>` passed by `say_hello`.
    let lines = unsafe { &mut *user_data.cast::<Vec<String>>() };
    // SAFETY: the sink contract guarantees `len` readable bytes at `line`.
    let bytes = unsafe { std::slice::from_raw_parts(line.cast::<u8>(), len) };
    lines.push(String::from_utf8_lossy(bytes).into_owned());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_then_mutate_and_greet() {
        let mut obj = OwnedObject::create().unwrap();
        assert_eq!(obj.counter(), Ok(1));
        obj.set_counter(5).unwrap();
        let lines = obj.say_hello().unwrap();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], "Hello from native object run (0)");
        assert_eq!(obj.counter(), Ok(5));
    }

    #[test]
    fn view_reads_through_the_owner() {
        let mut obj = OwnedObject::create().unwrap();
        obj.set_counter(3).unwrap();
        let view = obj.view();
        assert_eq!(view.counter(), Ok(3));
        assert_eq!(view.say_hello().unwrap().len(), 3);
        assert_eq!(view.handle(), obj.handle());
    }

    #[test]
    fn copied_handle_goes_stale_after_release() {
        let obj = OwnedObject::create().unwrap();
        let handle = obj.handle();
        assert_eq!(state_of(handle), HandleState::Live { owner: Owner::Host });
        obj.release().unwrap();

        assert_eq!(state_of(handle), HandleState::Released);
        assert_eq!(
            counter_of(handle),
            Err(BoundaryError::UseAfterRelease { handle })
        );
        let rc = handoff_object_set_counter(handle.as_raw(), 9);
        assert_eq!(
            BoundaryError::from_errno(rc, handle),
            BoundaryError::UseAfterRelease { handle }
        );
    }

    #[test]
    fn native_release_of_copied_handle_is_refused() {
        let obj = OwnedObject::create().unwrap();
        let copied = obj.handle();

        let rc = handoff_object_release(copied.as_raw(), HANDOFF_OWNER_NATIVE);
        assert_eq!(
            BoundaryError::from_errno(rc, copied),
            BoundaryError::OwnershipConflict { handle: copied }
        );
        assert_eq!(obj.counter(), Ok(1));
        assert_eq!(state_of(copied), HandleState::Live { owner: Owner::Host });
        obj.release().unwrap();
        assert_eq!(state_of(copied), HandleState::Released);
    }

    #[test]
    fn raw_roundtrip_reclaims_once() {
        let obj = OwnedObject::create().unwrap();
        let handle = obj.into_raw().unwrap();

        let back = OwnedObject::from_raw(handle).unwrap();
        assert_eq!(back.counter(), Ok(1));
        assert_eq!(
            OwnedObject::from_raw(handle).unwrap_err(),
            BoundaryError::OwnershipConflict { handle }
        );
        back.release().unwrap();
        assert_eq!(
            OwnedObject::from_raw(handle).unwrap_err(),
            BoundaryError::UseAfterRelease { handle }
        );
    }

    #[test]
    fn construction_callback_runs_before_token_exists() {
        let mut seen = Vec::new();
        let obj = OwnedObject::create_with(|value| seen.push(value)).unwrap();
        assert_eq!(seen, vec![42]);
        assert_eq!(obj.counter(), Ok(1));
    }

    #[test]
    fn declined_construction_mints_nothing() {
        let err = OwnedObject::try_create_with(|_| false).unwrap_err();
        assert!(matches!(err, BoundaryError::CallbackFailed { .. }));
    }
}
