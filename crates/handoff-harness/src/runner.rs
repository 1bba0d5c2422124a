//! Scenario execution engine.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::json;

use handoff_membrane::config::safety_level;

use crate::config::CorpusConfig;
use crate::diff;
use crate::scenario::Scenario;
use crate::structured_log::{LogEmitter, LogEntry, LogLevel, Outcome, StreamKind};

/// Result of running a single scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub id: String,
    pub component: String,
    pub passed: bool,
    pub expected: String,
    pub actual: String,
    /// Diff if the scenario failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<String>,
    /// Contract named by an unexpected boundary fault.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fault: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errno: Option<i32>,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "serde_json::Value::is_null", default)]
    pub details: serde_json::Value,
}

/// Runs scenarios in order and collects their results.
pub struct CorpusRunner<'a> {
    config: CorpusConfig,
    log: Option<&'a mut LogEmitter>,
}

impl<'a> CorpusRunner<'a> {
    #[must_use]
    pub fn new(config: CorpusConfig) -> Self {
        Self { config, log: None }
    }

    /// Emit one JSONL record per scenario, plus start and end markers.
    #[must_use]
    pub fn with_log(mut self, log: &'a mut LogEmitter) -> Self {
        self.log = Some(log);
        self
    }

    #[must_use]
    pub fn config(&self) -> &CorpusConfig {
        &self.config
    }

    /// Run `scenarios` one after another.
    ///
    /// A fault or panic fails its scenario and the run moves on. Only a log
    /// write failure aborts the run.
    pub fn run(&mut self, scenarios: &[&Scenario]) -> std::io::Result<Vec<ScenarioResult>> {
        let mode = safety_level().as_str();
        self.log_entry(
            LogEntry::new("", LogLevel::Info, "corpus_start")
                .with_stream(StreamKind::Conformance)
                .with_mode(mode)
                .with_details(json!({
                    "scenarios": scenarios.len(),
                    "threads": self.config.threads,
                    "per_thread": self.config.per_thread,
                    "race_trials": self.config.race_trials,
                })),
        )?;

        let mut results = Vec::with_capacity(scenarios.len());
        for scenario in scenarios {
            let result = execute(scenario, &self.config);
            self.log_entry(result_entry(&result, mode))?;
            results.push(result);
        }

        let failed = results.iter().filter(|r| !r.passed).count();
        self.log_entry(
            LogEntry::new("", LogLevel::Info, "corpus_end")
                .with_stream(StreamKind::Conformance)
                .with_mode(mode)
                .with_outcome(if failed == 0 {
                    Outcome::Pass
                } else {
                    Outcome::Fail
                })
                .with_details(json!({ "total": results.len(), "failed": failed })),
        )?;
        if let Some(log) = self.log.as_deref_mut() {
            log.flush()?;
        }
        Ok(results)
    }

    fn log_entry(&mut self, entry: LogEntry) -> std::io::Result<()> {
        match self.log.as_deref_mut() {
            Some(log) => log.emit_entry(entry),
            None => Ok(()),
        }
    }
}

fn execute(scenario: &Scenario, config: &CorpusConfig) -> ScenarioResult {
    let start = Instant::now();
    let outcome = catch_unwind(AssertUnwindSafe(|| scenario.run(config)));
    let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

    let mut result = ScenarioResult {
        id: scenario.id.to_string(),
        component: scenario.component.to_string(),
        passed: false,
        expected: String::new(),
        actual: String::new(),
        diff: None,
        fault: None,
        errno: None,
        duration_ms,
        details: serde_json::Value::Null,
    };

    match outcome {
        Ok(Ok(obs)) => {
            result.passed = obs.passed();
            if !result.passed {
                result.diff = Some(diff::render_diff(&obs.expected, &obs.actual));
            }
            result.expected = obs.expected;
            result.actual = obs.actual;
            result.details = obs.details;
        }
        Ok(Err(err)) => {
            result.actual = format!("fault: {err}");
            result.fault = Some(err.contract().to_string());
            result.errno = Some(err.errno());
        }
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "non-string panic payload".to_string());
            result.actual = format!("panic: {message}");
        }
    }
    result
}

fn result_entry(result: &ScenarioResult, mode: &str) -> LogEntry {
    let (level, outcome) = match (result.passed, &result.fault) {
        (true, _) => (LogLevel::Info, Outcome::Pass),
        (false, Some(_)) => (LogLevel::Error, Outcome::Error),
        (false, None) => (LogLevel::Warn, Outcome::Fail),
    };
    let mut entry = LogEntry::new("", level, "scenario_result")
        .with_stream(StreamKind::Conformance)
        .with_mode(mode)
        .with_scenario(&result.id)
        .with_outcome(outcome)
        .with_duration_ms(result.duration_ms);
    if let Some(errno) = result.errno {
        entry = entry.with_errno(errno);
    }
    if !result.passed {
        entry = entry.with_details(json!({
            "expected": result.expected,
            "actual": result.actual,
            "fault": result.fault,
        }));
    } else if !result.details.is_null() {
        entry = entry.with_details(result.details.clone());
    }
    entry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::{catalog, find};
    use crate::structured_log::validate_log_line;

    fn small() -> CorpusConfig {
        CorpusConfig::default().with_overrides(Some(2), Some(2_000), Some(2))
    }

    #[test]
    fn full_catalog_passes() {
        let scenarios: Vec<&Scenario> = catalog().iter().collect();
        let results = CorpusRunner::new(small()).run(&scenarios).unwrap();
        assert_eq!(results.len(), catalog().len());
        for r in &results {
            assert!(r.passed, "{}: {:?}", r.id, r.diff.as_deref().unwrap_or(&r.actual));
        }
    }

    #[test]
    fn every_log_line_validates() {
        let mut log = LogEmitter::to_buffer("runner-test");
        let scenarios = [
            find("callback-once").unwrap(),
            find("dangling-reference").unwrap(),
        ];
        CorpusRunner::new(small())
            .with_log(&mut log)
            .run(&scenarios)
            .unwrap();

        let text = String::from_utf8(log.buffered().to_vec()).unwrap();
        let entries: Vec<LogEntry> = text
            .lines()
            .enumerate()
            .map(|(i, line)| validate_log_line(line, i + 1).unwrap())
            .collect();
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[0].event, "corpus_start");
        assert_eq!(entries[1].scenario.as_deref(), Some("callback-once"));
        assert_eq!(entries[3].event, "corpus_end");
        assert_eq!(entries[3].outcome, Some(Outcome::Pass));
    }

    #[test]
    fn zero_work_guarded_scenarios_still_pass() {
        let config = CorpusConfig::default().with_overrides(Some(0), Some(10), Some(1));
        let scenarios = [
            find("guarded-counter").unwrap(),
            find("partial-guard").unwrap(),
            find("unguarded-race").unwrap(),
        ];
        let results = CorpusRunner::new(config).run(&scenarios).unwrap();
        assert!(results.iter().all(|r| r.passed), "{results:?}");
    }
}
