//! A value whose copies are observable.
//!
//! Every `clone()` of a [`CopyProbe`] bumps a counter shared by the original
//! and all its copies. Passing by view (`&CopyProbe`) never clones; passing by
//! value only clones when the call site writes `.clone()`.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug)]
pub struct CopyProbe {
    message: String,
    copies: Arc<AtomicUsize>,
}

impl CopyProbe {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            copies: Arc::new(AtomicUsize::new(0)),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Copies made of this probe's lineage so far.
    #[must_use]
    pub fn copies(&self) -> usize {
        self.copies.load(Ordering::Relaxed)
    }
}

impl Clone for CopyProbe {
    fn clone(&self) -> Self {
        self.copies.fetch_add(1, Ordering::Relaxed);
        Self {
            message: self.message.clone(),
            copies: Arc::clone(&self.copies),
        }
    }
}

/// Render through a view. Never copies.
#[must_use]
pub fn print_by_view(probe: &CopyProbe) -> String {
    probe.message().to_owned()
}

/// Render an owned probe. Copies only if the caller cloned to get one.
#[must_use]
pub fn print_by_value(probe: CopyProbe) -> String {
    probe.message
}
