//! Boundary fault taxonomy.
//!
//! Every fault is reported to the immediate caller. Nothing here is transient,
//! so nothing is retried. On the C ABI each variant travels as a positive
//! errno-style status; [`BoundaryError::from_errno`] reverses the mapping on the
//! host side.

use thiserror::Error;

use crate::registry::ObjectHandle;

/// Faults raised at the handoff boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoundaryError {
    /// A precondition of the called operation does not hold.
    #[error("contract violation: {0}")]
    ContractViolation(&'static str),
    /// The handle names an object that has already been released.
    #[error("use after release: handle {handle} is stale")]
    UseAfterRelease { handle: ObjectHandle },
    /// The handle was never minted by this registry.
    #[error("unknown handle {handle}")]
    UnknownHandle { handle: ObjectHandle },
    /// The caller claimed ownership the other side still holds.
    #[error("ownership conflict on handle {handle}")]
    OwnershipConflict { handle: ObjectHandle },
    /// Host code invoked from native code reported failure.
    #[error("callback failed with status {status}")]
    CallbackFailed { status: i32 },
    /// A worker thread panicked before finishing its share.
    #[error("worker {worker} panicked")]
    WorkerPanicked { worker: usize },
}

impl BoundaryError {
    /// C status code for this fault.
    #[must_use]
    pub const fn errno(&self) -> i32 {
        match self {
            Self::ContractViolation(_) => libc::EINVAL,
            Self::UseAfterRelease { .. } => libc::EFAULT,
            Self::UnknownHandle { .. } => libc::EBADF,
            Self::OwnershipConflict { .. } => libc::EBUSY,
            Self::CallbackFailed { .. } => libc::ECANCELED,
            Self::WorkerPanicked { .. } => libc::EOWNERDEAD,
        }
    }

    /// Rebuild a fault from a non-zero C status returned for `handle`.
    ///
    /// Codes outside the taxonomy map to `ContractViolation`.
    #[must_use]
    pub fn from_errno(code: i32, handle: ObjectHandle) -> Self {
        match code {
            libc::EFAULT => Self::UseAfterRelease { handle },
            libc::EBADF => Self::UnknownHandle { handle },
            libc::EBUSY => Self::OwnershipConflict { handle },
            libc::ECANCELED => Self::CallbackFailed { status: code },
            libc::EOWNERDEAD => Self::WorkerPanicked { worker: 0 },
            _ => Self::ContractViolation("native call rejected its arguments"),
        }
    }

    /// Short stable name of the violated contract.
    #[must_use]
    pub const fn contract(&self) -> &'static str {
        match self {
            Self::ContractViolation(_) => "contract-violation",
            Self::UseAfterRelease { .. } => "use-after-release",
            Self::UnknownHandle { .. } => "unknown-handle",
            Self::OwnershipConflict { .. } => "ownership-conflict",
            Self::CallbackFailed { .. } => "callback-failed",
            Self::WorkerPanicked { .. } => "worker-panicked",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errno_mapping_roundtrips_handle_faults() {
        let handle = ObjectHandle::from_raw(0x0000_0002_0000_0001);
        for err in [
            BoundaryError::UseAfterRelease { handle },
            BoundaryError::UnknownHandle { handle },
            BoundaryError::OwnershipConflict { handle },
        ] {
            assert_eq!(BoundaryError::from_errno(err.errno(), handle), err);
        }
    }

    #[test]
    fn unknown_codes_become_contract_violations() {
        let err = BoundaryError::from_errno(libc::EINVAL, ObjectHandle::NULL);
        assert_eq!(err.errno(), libc::EINVAL);
        assert_eq!(err.contract(), "contract-violation");
        assert!(matches!(
            BoundaryError::from_errno(9999, ObjectHandle::NULL),
            BoundaryError::ContractViolation(_)
        ));
    }

    #[test]
    fn display_names_the_handle() {
        let handle = ObjectHandle::from_raw(0x0000_0003_0000_0007);
        let msg = BoundaryError::UseAfterRelease { handle }.to_string();
        assert!(msg.contains("use after release"), "{msg}");
        assert!(msg.contains(&handle.to_string()), "{msg}");
    }
}
