//! Conformance corpus for the handoff boundary.
//!
//! This crate provides:
//! - Scenarios: one self-checking demonstration per boundary contract
//! - Runner: executes a selection of scenarios, one at a time
//! - Structured logging: JSONL records for every scenario outcome
//! - Report generation: markdown + JSON reports with a SHA-256 digest

#![forbid(unsafe_code)]

pub mod config;
pub mod diff;
pub mod error;
pub mod report;
pub mod runner;
pub mod scenario;
pub mod structured_log;

pub use config::CorpusConfig;
pub use error::HarnessError;
pub use report::{CorpusReport, CorpusSummary};
pub use runner::{CorpusRunner, ScenarioResult};
pub use scenario::{Observation, Scenario, catalog, find};
