//! Shared counters driven by worker threads.
//!
//! The guarded run holds a lock around every increment and returns exactly
//! `threads * per_thread`. The unguarded run is the racy demonstration: its
//! result is an observation in `(0, threads * per_thread]`, not an error.
//!
//! ```
//! use handoff::guard::{observe_race, run_guarded_increment};
//!
//! assert_eq!(run_guarded_increment(3, 1_000).unwrap(), 3_000);
//! let race = observe_race(3, 1_000).unwrap();
//! assert!(race.within_bounds());
//! ```

pub use handoff_core::counter::{
    GuardedCounter, RaceObservation, RacyCounter, observe_race, run_guarded_increment,
    run_unguarded_increment,
};
