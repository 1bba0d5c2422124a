//! Workload sizing for the corpus.
//!
//! Loaded from JSON (every field optional) and then overridden by CLI flags.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::HarnessError;

/// Worker count used when nothing else is configured.
pub const DEFAULT_THREADS: usize = 3;
/// Increments per worker used when nothing else is configured.
pub const DEFAULT_PER_THREAD: u64 = 100_000;
/// Repetitions of the unguarded race.
pub const DEFAULT_RACE_TRIALS: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorpusConfig {
    pub threads: usize,
    pub per_thread: u64,
    pub race_trials: u32,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            threads: DEFAULT_THREADS,
            per_thread: DEFAULT_PER_THREAD,
            race_trials: DEFAULT_RACE_TRIALS,
        }
    }
}

impl CorpusConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn from_file(path: &Path) -> Result<Self, HarnessError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content).map_err(|e| HarnessError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Apply whichever CLI overrides were given.
    #[must_use]
    pub fn with_overrides(
        mut self,
        threads: Option<usize>,
        per_thread: Option<u64>,
        race_trials: Option<u32>,
    ) -> Self {
        if let Some(threads) = threads {
            self.threads = threads;
        }
        if let Some(per_thread) = per_thread {
            self.per_thread = per_thread;
        }
        if let Some(race_trials) = race_trials {
            self.race_trials = race_trials;
        }
        self
    }

    /// `threads * per_thread`, the exact result of a guarded run.
    #[must_use]
    pub fn expected_total(&self) -> u64 {
        (self.threads as u64).saturating_mul(self.per_thread)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg = CorpusConfig::from_json(r#"{"threads": 8}"#).unwrap();
        assert_eq!(cfg.threads, 8);
        assert_eq!(cfg.per_thread, DEFAULT_PER_THREAD);
        assert_eq!(cfg.race_trials, DEFAULT_RACE_TRIALS);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(CorpusConfig::from_json(r#"{"thread": 8}"#).is_err());
    }

    #[test]
    fn overrides_win() {
        let cfg = CorpusConfig::default().with_overrides(Some(2), None, Some(1));
        assert_eq!(cfg.threads, 2);
        assert_eq!(cfg.per_thread, DEFAULT_PER_THREAD);
        assert_eq!(cfg.race_trials, 1);
        assert_eq!(cfg.expected_total(), 200_000);
    }
}
