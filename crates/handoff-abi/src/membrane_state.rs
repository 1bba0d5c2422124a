//! Global state for the handoff membrane.
//!
//! Holds the singleton registry every object entry point resolves handles
//! against, so a handle minted by `handoff_object_create` is visible to every
//! other `handoff_object_*` call in the process.

use std::sync::OnceLock;

use handoff_core::NativeObject;
use handoff_membrane::HandleRegistry;
use handoff_membrane::config::registry_config;

static OBJECT_REGISTRY: OnceLock<HandleRegistry<NativeObject>> = OnceLock::new();

/// Process-wide registry of native objects.
///
/// Configured from `HANDOFF_MODE` / `HANDOFF_QUARANTINE_MAX` on first use.
#[must_use]
pub fn object_registry() -> &'static HandleRegistry<NativeObject> {
    OBJECT_REGISTRY.get_or_init(|| HandleRegistry::new(registry_config()))
}
