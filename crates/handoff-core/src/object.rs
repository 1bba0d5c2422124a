//! The heap-resident native object handed across the boundary.
//!
//! Construction and destruction are counted in the global boundary metrics,
//! which is how tests prove an object is destroyed exactly once.

use handoff_membrane::{BoundaryMetrics, global_metrics};

/// Counter value of a freshly constructed object.
pub const INITIAL_COUNTER: u64 = 1;

/// Native-side object with one mutable field.
///
/// Deliberately not `Clone`: there is exactly one of each, owned through the
/// registry.
#[derive(Debug)]
pub struct NativeObject {
    counter: u64,
}

impl NativeObject {
    /// Construct with `counter = 1`.
    #[must_use]
    pub fn new() -> Self {
        BoundaryMetrics::inc(&global_metrics().objects_created);
        Self {
            counter: INITIAL_COUNTER,
        }
    }

    #[must_use]
    pub fn counter(&self) -> u64 {
        self.counter
    }

    pub fn set_counter(&mut self, value: u64) {
        self.counter = value;
    }

    /// Lines `say_hello` emits for the current counter.
    #[must_use]
    pub fn hello_lines(&self) -> HelloLines {
        hello_lines(self.counter)
    }
}

impl Default for NativeObject {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for NativeObject {
    fn drop(&mut self) {
        BoundaryMetrics::inc(&global_metrics().objects_destroyed);
    }
}

/// Lazily rendered greeting lines, one per iteration index.
#[derive(Debug, Clone)]
pub struct HelloLines {
    next: u64,
    end: u64,
}

impl Iterator for HelloLines {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.next >= self.end {
            return None;
        }
        let line = hello_line(self.next);
        self.next += 1;
        Some(line)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = usize::try_from(self.end - self.next).ok();
        (remaining.unwrap_or(usize::MAX), remaining)
    }
}

/// Greeting lines for a given counter value.
#[must_use]
pub fn hello_lines(counter: u64) -> HelloLines {
    HelloLines {
        next: 0,
        end: counter,
    }
}

/// A single greeting line.
#[must_use]
pub fn hello_line(index: u64) -> String {
    format!("Hello from native object run ({index})")
}
