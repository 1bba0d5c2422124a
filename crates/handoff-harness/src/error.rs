//! Driver-level failures. Boundary faults inside a scenario are results, not
//! errors; they end up in the report.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("config {path}: {message}")]
    Config { path: PathBuf, message: String },
    #[error("unknown scenario '{0}' (see `harness list`)")]
    UnknownScenario(String),
}
