//! Shared counters driven by independent worker threads.
//!
//! Two variants exist. [`GuardedCounter`] keeps its value behind a
//! `parking_lot::Mutex`, so the value cannot be reached without the lock:
//!
//! ```compile_fail
//! let counter = parking_lot::Mutex::new(0_u64);
//! *counter += 1; // no lock taken, does not type-check
//! ```
//!
//! [`RacyCounter`] is the demonstration variant. Its increment is a load
//! followed by a separate store, so concurrent increments lose updates. It is
//! built on an atomic, which keeps the race observable without undefined
//! behaviour; it is still wrong by construction and exists only to be measured.

use std::sync::atomic::{AtomicU64, Ordering};

use handoff_membrane::BoundaryError;
use parking_lot::Mutex;

/// Counter whose every read-modify-write runs inside a scoped critical section.
#[derive(Debug, Default)]
pub struct GuardedCounter {
    value: Mutex<u64>,
}

impl GuardedCounter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one under the lock.
    pub fn increment(&self) {
        self.update(|v| *v += 1);
    }

    /// Run `f` with exclusive access to the value.
    ///
    /// The guard is dropped on every exit path, including unwinding out of `f`.
    pub fn update<R>(&self, f: impl FnOnce(&mut u64) -> R) -> R {
        let mut guard = self.value.lock();
        f(&mut guard)
    }

    #[must_use]
    pub fn get(&self) -> u64 {
        *self.value.lock()
    }
}

/// Unsynchronized read-modify-write counter. Loses updates under contention.
#[derive(Debug, Default)]
pub struct RacyCounter {
    value: AtomicU64,
}

impl RacyCounter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read, add one, write back, with nothing holding the other workers off.
    pub fn increment(&self) {
        let seen = self.value.load(Ordering::Relaxed);
        std::hint::spin_loop();
        self.value.store(seen.wrapping_add(1), Ordering::Relaxed);
    }

    #[must_use]
    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Outcome of one unguarded run, reported as an observation, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RaceObservation {
    pub threads: usize,
    pub per_thread: u64,
    /// Final value read after all workers joined.
    pub observed: u64,
}

impl RaceObservation {
    /// Value an interference-free run would produce.
    #[must_use]
    pub fn expected(&self) -> u64 {
        (self.threads as u64).saturating_mul(self.per_thread)
    }

    /// Increments overwritten by another worker.
    #[must_use]
    pub fn lost_updates(&self) -> u64 {
        self.expected().saturating_sub(self.observed)
    }

    /// True when the observed value lies in `(0, expected]`.
    ///
    /// A run with no work is within bounds only if it observed zero.
    #[must_use]
    pub fn within_bounds(&self) -> bool {
        match self.expected() {
            0 => self.observed == 0,
            expected => self.observed > 0 && self.observed <= expected,
        }
    }
}

/// `threads` workers each add one `per_thread` times under the lock.
///
/// Always returns `threads * per_thread`.
pub fn run_guarded_increment(threads: usize, per_thread: u64) -> Result<u64, BoundaryError> {
    let counter = GuardedCounter::new();
    run_workers(&counter, threads, per_thread, GuardedCounter::increment)?;
    Ok(counter.get())
}

/// `threads` workers each add one `per_thread` times with no coordination.
///
/// The result is anywhere in `(0, threads * per_thread]`; do not assume the
/// upper bound.
pub fn run_unguarded_increment(threads: usize, per_thread: u64) -> Result<u64, BoundaryError> {
    let counter = RacyCounter::new();
    run_workers(&counter, threads, per_thread, RacyCounter::increment)?;
    Ok(counter.get())
}

/// [`run_unguarded_increment`] packaged with its bounds.
pub fn observe_race(threads: usize, per_thread: u64) -> Result<RaceObservation, BoundaryError> {
    let observed = run_unguarded_increment(threads, per_thread)?;
    Ok(RaceObservation {
        threads,
        per_thread,
        observed,
    })
}

/// Spawn `threads` scoped workers running `step` `per_thread` times, then join
/// them all. Reports the first worker that panicked.
pub(crate) fn run_workers<C, F>(
    counter: &C,
    threads: usize,
    per_thread: u64,
    step: F,
) -> Result<(), BoundaryError>
where
    C: Sync,
    F: Fn(&C) + Sync,
{
    let step = &step;
    std::thread::scope(|scope| {
        let workers: Vec<_> = (0..threads)
            .map(|_| {
                scope.spawn(move || {
                    for _ in 0..per_thread {
                        step(counter);
                    }
                })
            })
            .collect();

        let mut failed = None;
        for (worker, handle) in workers.into_iter().enumerate() {
            if handle.join().is_err() && failed.is_none() {
                failed = Some(worker);
            }
        }
        match failed {
            Some(worker) => Err(BoundaryError::WorkerPanicked { worker }),
            None => Ok(()),
        }
    })
}
