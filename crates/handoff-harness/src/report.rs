//! Report generation for corpus runs.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::CorpusConfig;
use crate::runner::ScenarioResult;

/// Aggregate outcome of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub results: Vec<ScenarioResult>,
}

impl CorpusSummary {
    #[must_use]
    pub fn from_results(results: Vec<ScenarioResult>) -> Self {
        let total = results.len();
        let passed = results.iter().filter(|r| r.passed).count();
        Self {
            total,
            passed,
            failed: total - passed,
            results,
        }
    }

    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

/// A corpus report: run parameters plus per-scenario results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusReport {
    pub title: String,
    /// Registry safety level the run used (`strict` or `hardened`).
    pub mode: String,
    /// Timestamp (UTC).
    pub timestamp: String,
    pub config: CorpusConfig,
    pub summary: CorpusSummary,
}

impl CorpusReport {
    /// Render the report as markdown.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("# {}\n\n", self.title));
        out.push_str(&format!("- Mode: {}\n", self.mode));
        out.push_str(&format!("- Timestamp: {}\n", self.timestamp));
        out.push_str(&format!(
            "- Workload: {} threads x {} increments, {} race trials\n",
            self.config.threads, self.config.per_thread, self.config.race_trials
        ));
        out.push_str(&format!("- Total: {}\n", self.summary.total));
        out.push_str(&format!("- Passed: {}\n", self.summary.passed));
        out.push_str(&format!("- Failed: {}\n", self.summary.failed));
        out.push_str(&format!("- SHA-256: {}\n\n", self.digest()));

        out.push_str("| Scenario | Component | Status | ms |\n");
        out.push_str("|----------|-----------|--------|----|\n");
        for r in &self.summary.results {
            let status = match (&r.fault, r.passed) {
                (_, true) => "PASS".to_string(),
                (Some(fault), false) => format!("FAULT ({fault})"),
                (None, false) => "FAIL".to_string(),
            };
            out.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                r.id, r.component, status, r.duration_ms
            ));
        }

        for r in self.summary.results.iter().filter(|r| !r.passed) {
            out.push_str(&format!("\n## {}\n\n```\n", r.id));
            match &r.diff {
                Some(diff) => out.push_str(diff),
                None => out.push_str(&r.actual),
            }
            out.push_str("\n```\n");
        }
        out
    }

    /// Render the report as JSON.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
    }

    /// Lowercase hex SHA-256 of [`CorpusReport::to_json`].
    #[must_use]
    pub fn digest(&self) -> String {
        let hash = Sha256::digest(self.to_json().as_bytes());
        hash.iter().map(|b| format!("{b:02x}")).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(id: &str, passed: bool, fault: Option<&str>) -> ScenarioResult {
        ScenarioResult {
            id: id.to_string(),
            component: "ownership-transfer".to_string(),
            passed,
            expected: "state=released".to_string(),
            actual: if passed { "state=released" } else { "state=live" }.to_string(),
            diff: (!passed && fault.is_none())
                .then(|| crate::diff::render_diff("state=released", "state=live")),
            fault: fault.map(str::to_string),
            errno: None,
            duration_ms: 1,
            details: serde_json::Value::Null,
        }
    }

    fn report(results: Vec<ScenarioResult>) -> CorpusReport {
        CorpusReport {
            title: "handoff corpus".to_string(),
            mode: "strict".to_string(),
            timestamp: "2026-01-01T00:00:00.000Z".to_string(),
            config: CorpusConfig::default(),
            summary: CorpusSummary::from_results(results),
        }
    }

    #[test]
    fn summary_counts() {
        let summary = CorpusSummary::from_results(vec![
            result("a", true, None),
            result("b", false, None),
            result("c", false, Some("use-after-release")),
        ]);
        assert_eq!((summary.total, summary.passed, summary.failed), (3, 1, 2));
        assert!(!summary.all_passed());
    }

    #[test]
    fn markdown_lists_failures_with_diffs() {
        let md = report(vec![
            result("owned-lifecycle", true, None),
            result("dangling-reference", false, None),
            result("ownership-handoff", false, Some("ownership-conflict")),
        ])
        .to_markdown();
        assert!(md.contains("| owned-lifecycle | ownership-transfer | PASS | 1 |"));
        assert!(md.contains("| dangling-reference | ownership-transfer | FAIL | 1 |"));
        assert!(md.contains("FAULT (ownership-conflict)"));
        assert!(md.contains("## dangling-reference"));
        assert!(md.contains("-state=released\n+state=live"));
    }

    #[test]
    fn json_roundtrips_and_digest_is_stable() {
        let r = report(vec![result("owned-lifecycle", true, None)]);
        let parsed: CorpusReport = serde_json::from_str(&r.to_json()).unwrap();
        assert_eq!(parsed.summary.total, 1);
        assert_eq!(parsed.digest(), r.digest());
        assert_eq!(r.digest().len(), 64);
    }
}
