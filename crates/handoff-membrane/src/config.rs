//! Runtime mode configuration.
//!
//! The runtime mode is set via the `HANDOFF_MODE` environment variable:
//! - `strict` (default): a released slot is recycled as soon as it is freed,
//!   with its generation bumped so every outstanding handle goes stale.
//! - `hardened`: released slots are parked in a FIFO quarantine before reuse.
//!   Stale handles keep resolving to `Released` for longer, which makes
//!   diagnostics more precise at the cost of slot memory.
//!
//! Stale-handle detection is active in both modes; there is no pass-through mode.
//!
//! The quarantine capacity comes from `HANDOFF_QUARANTINE_MAX` (default 1024).

use std::sync::OnceLock;

/// Default number of released slots held back in hardened mode.
pub const DEFAULT_QUARANTINE_MAX: usize = 1024;

/// Runtime operating mode for the membrane.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SafetyLevel {
    /// Released slots are recycled immediately under a new generation.
    #[default]
    Strict,
    /// Released slots pass through a bounded quarantine before reuse.
    Hardened,
}

impl SafetyLevel {
    /// Parse from string (case-insensitive).
    #[must_use]
    pub fn from_str_loose(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "strict" | "default" => Self::Strict,
            "hardened" | "quarantine" | "full" => Self::Hardened,
            _ => Self::Strict,
        }
    }

    /// Returns true if released slots are quarantined.
    #[must_use]
    pub const fn quarantine_enabled(self) -> bool {
        matches!(self, Self::Hardened)
    }

    /// Lowercase mode name as accepted by `from_str_loose`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Hardened => "hardened",
        }
    }
}

/// Registry sizing and policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Safety level governing slot reuse.
    pub level: SafetyLevel,
    /// Maximum released slots held in quarantine (hardened only).
    pub quarantine_max: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            level: SafetyLevel::Strict,
            quarantine_max: DEFAULT_QUARANTINE_MAX,
        }
    }
}

impl RegistryConfig {
    /// Strict configuration.
    #[must_use]
    pub fn strict() -> Self {
        Self::default()
    }

    /// Hardened configuration with the given quarantine capacity.
    #[must_use]
    pub fn hardened(quarantine_max: usize) -> Self {
        Self {
            level: SafetyLevel::Hardened,
            quarantine_max,
        }
    }

    /// Build a configuration from explicit variable values.
    ///
    /// A missing or unparsable quarantine size falls back to the default.
    #[must_use]
    pub fn from_values(mode: Option<&str>, quarantine_max: Option<&str>) -> Self {
        let level = mode.map(SafetyLevel::from_str_loose).unwrap_or_default();
        let quarantine_max = quarantine_max
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(DEFAULT_QUARANTINE_MAX);
        Self {
            level,
            quarantine_max,
        }
    }

    /// Read `HANDOFF_MODE` and `HANDOFF_QUARANTINE_MAX` from the environment.
    #[must_use]
    pub fn from_env() -> Self {
        let mode = std::env::var("HANDOFF_MODE").ok();
        let quarantine_max = std::env::var("HANDOFF_QUARANTINE_MAX").ok();
        Self::from_values(mode.as_deref(), quarantine_max.as_deref())
    }
}

static GLOBAL_CONFIG: OnceLock<RegistryConfig> = OnceLock::new();

/// Get the process configuration (reads env vars on first call, caches thereafter).
#[must_use]
pub fn registry_config() -> RegistryConfig {
    *GLOBAL_CONFIG.get_or_init(RegistryConfig::from_env)
}

/// Get the configured safety level.
#[must_use]
pub fn safety_level() -> SafetyLevel {
    registry_config().level
}
