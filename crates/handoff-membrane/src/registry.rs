//! Generational handle registry.
//!
//! Every object handed across the boundary lives in a slot with a generation
//! counter. A handle carries the slot index and the generation it was minted
//! under; releasing the object bumps the slot generation, so every handle
//! derived from it resolves to `Released` from then on. Reuse of a slot never
//! revives an old handle.
//!
//! Each live slot also records which side owns it. Ownership moves are
//! compare-and-set on that field, so two sides can never both hold a claim.

use std::collections::VecDeque;
use std::fmt;

use parking_lot::Mutex;

use crate::config::RegistryConfig;
use crate::error::BoundaryError;

/// Opaque 64-bit token naming a registered object on the C ABI.
///
/// Low 32 bits: slot index. High 32 bits: generation (never 0 for a minted
/// handle, so the all-zero value is the null handle).
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ObjectHandle(u64);

impl ObjectHandle {
    /// The null handle. Never minted.
    pub const NULL: Self = Self(0);

    /// Wrap a raw value received over the C ABI.
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw value for the C ABI.
    #[must_use]
    pub const fn as_raw(self) -> u64 {
        self.0
    }

    /// Returns true for the null handle.
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Slot index component.
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0 as u32
    }

    /// Generation component.
    #[must_use]
    pub const fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }

    const fn compose(index: u32, generation: u32) -> Self {
        Self(((generation as u64) << 32) | index as u64)
    }
}

impl fmt::Display for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            return f.write_str("#null");
        }
        write!(f, "#{}@g{}", self.index(), self.generation())
    }
}

/// Which side of the boundary currently owns a live object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Owner {
    /// Held by a host ownership token.
    Host,
    /// Handed to native code as a raw handle.
    Native,
}

/// Classification of a handle against current registry state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    /// Handle names a live object held by `owner`.
    Live { owner: Owner },
    /// Handle was valid once; its object has been released.
    Released,
    /// Handle was never minted here.
    Unknown,
}

struct Entry<T> {
    owner: Owner,
    value: T,
}

struct Slot<T> {
    generation: u32,
    entry: Option<Entry<T>>,
    /// Generation space exhausted; the slot is never reused.
    retired: bool,
}

struct Slots<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    quarantine: VecDeque<u32>,
    live: usize,
}

impl<T> Slots<T> {
    fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            quarantine: VecDeque::new(),
            live: 0,
        }
    }

    fn classify(&self, handle: ObjectHandle) -> HandleState {
        if handle.is_null() {
            return HandleState::Unknown;
        }
        let Some(slot) = self.slots.get(handle.index() as usize) else {
            return HandleState::Unknown;
        };
        match (&slot.entry, handle.generation()) {
            (Some(entry), generation) if generation == slot.generation => HandleState::Live {
                owner: entry.owner,
            },
            (_, generation) if generation < slot.generation => HandleState::Released,
            (None, generation) if slot.retired && generation == slot.generation => {
                HandleState::Released
            }
            _ => HandleState::Unknown,
        }
    }

    fn entry_mut(&mut self, handle: ObjectHandle) -> Result<&mut Entry<T>, BoundaryError> {
        match self.classify(handle) {
            HandleState::Live { .. } => {}
            HandleState::Released => return Err(BoundaryError::UseAfterRelease { handle }),
            HandleState::Unknown => return Err(BoundaryError::UnknownHandle { handle }),
        }
        self.slots[handle.index() as usize]
            .entry
            .as_mut()
            .ok_or(BoundaryError::UseAfterRelease { handle })
    }
}

/// Concurrent registry of boundary-owned objects.
pub struct HandleRegistry<T> {
    inner: Mutex<Slots<T>>,
    config: RegistryConfig,
}

impl<T> HandleRegistry<T> {
    /// Create an empty registry.
    #[must_use]
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            inner: Mutex::new(Slots::new()),
            config,
        }
    }

    /// Policy this registry was built with.
    #[must_use]
    pub fn config(&self) -> RegistryConfig {
        self.config
    }

    /// Register `value` under `owner` and mint its handle.
    pub fn insert(&self, value: T, owner: Owner) -> ObjectHandle {
        let mut inner = self.inner.lock();
        let entry = Some(Entry { owner, value });
        inner.live += 1;

        if let Some(index) = inner.free.pop() {
            let slot = &mut inner.slots[index as usize];
            slot.entry = entry;
            return ObjectHandle::compose(index, slot.generation);
        }

        let index = u32::try_from(inner.slots.len()).unwrap_or(u32::MAX);
        inner.slots.push(Slot {
            generation: 1,
            entry,
            retired: false,
        });
        ObjectHandle::compose(index, 1)
    }

    /// Classify `handle` without touching the object.
    #[must_use]
    pub fn state(&self, handle: ObjectHandle) -> HandleState {
        self.inner.lock().classify(handle)
    }

    /// Run `f` against the live object named by `handle`.
    ///
    /// The registry lock is held while `f` runs; `f` must not call back into
    /// this registry.
    pub fn with<R>(
        &self,
        handle: ObjectHandle,
        f: impl FnOnce(&T) -> R,
    ) -> Result<R, BoundaryError> {
        let mut inner = self.inner.lock();
        let entry = inner.entry_mut(handle)?;
        Ok(f(&entry.value))
    }

    /// Mutable variant of [`HandleRegistry::with`].
    pub fn with_mut<R>(
        &self,
        handle: ObjectHandle,
        f: impl FnOnce(&mut T) -> R,
    ) -> Result<R, BoundaryError> {
        let mut inner = self.inner.lock();
        let entry = inner.entry_mut(handle)?;
        Ok(f(&mut entry.value))
    }

    /// Move ownership of a live object from `from` to `to`.
    ///
    /// `from == to` moves nothing and is rejected as a contract violation.
    pub fn claim(
        &self,
        handle: ObjectHandle,
        from: Owner,
        to: Owner,
    ) -> Result<(), BoundaryError> {
        if from == to {
            return Err(BoundaryError::ContractViolation(
                "claim must change the owner",
            ));
        }
        let mut inner = self.inner.lock();
        let entry = inner.entry_mut(handle)?;
        if entry.owner != from {
            return Err(BoundaryError::OwnershipConflict { handle });
        }
        entry.owner = to;
        Ok(())
    }

    /// Unregister the object named by `handle` and return it.
    ///
    /// The slot generation is bumped before the lock is dropped, so no handle
    /// minted earlier can resolve again. A slot with no generation left is
    /// retired instead of recycled. The caller decides when the value is
    /// dropped; it is never dropped under the registry lock.
    pub fn remove(&self, handle: ObjectHandle) -> Result<T, BoundaryError> {
        self.remove_checked(handle, None)
    }

    /// Like [`HandleRegistry::remove`], but only `owner` may release.
    ///
    /// Returns `OwnershipConflict` and leaves the object live when the other
    /// side holds it.
    pub fn remove_owned(&self, handle: ObjectHandle, owner: Owner) -> Result<T, BoundaryError> {
        self.remove_checked(handle, Some(owner))
    }

    fn remove_checked(
        &self,
        handle: ObjectHandle,
        owner: Option<Owner>,
    ) -> Result<T, BoundaryError> {
        let mut inner = self.inner.lock();
        let current = inner.entry_mut(handle)?.owner;
        if owner.is_some_and(|owner| owner != current) {
            return Err(BoundaryError::OwnershipConflict { handle });
        }

        let index = handle.index();
        let slot = &mut inner.slots[index as usize];
        let entry = slot
            .entry
            .take()
            .ok_or(BoundaryError::UseAfterRelease { handle })?;
        inner.live -= 1;

        let slot = &mut inner.slots[index as usize];
        match slot.generation.checked_add(1) {
            Some(generation) => slot.generation = generation,
            None => {
                slot.retired = true;
                return Ok(entry.value);
            }
        }

        if self.config.level.quarantine_enabled() {
            inner.quarantine.push_back(index);
            while inner.quarantine.len() > self.config.quarantine_max {
                if let Some(recycled) = inner.quarantine.pop_front() {
                    inner.free.push(recycled);
                }
            }
        } else {
            inner.free.push(index);
        }

        Ok(entry.value)
    }

    /// Number of live objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().live
    }

    /// Returns true if no object is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of released slots currently held back from reuse.
    #[must_use]
    pub fn quarantined(&self) -> usize {
        self.inner.lock().quarantine.len()
    }
}

impl<T> Default for HandleRegistry<T> {
    fn default() -> Self {
        Self::new(RegistryConfig::default())
    }
}
