//! Fixed-layout aggregate shared by both sides of the boundary.

use std::mem::offset_of;

/// Two signed 32-bit fields in C declaration order.
///
/// Matches `struct Record { int32_t x; int32_t y; }` on every target the ABI
/// crate builds for.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Record {
    pub x: i32,
    pub y: i32,
}

const _: () = {
    assert!(std::mem::size_of::<Record>() == 8);
    assert!(std::mem::align_of::<Record>() == 4);
    assert!(offset_of!(Record, x) == 0);
    assert!(offset_of!(Record, y) == 4);
};

impl Record {
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// `2 * x` with two's-complement wrap at the `i32` bounds.
#[must_use]
pub const fn double_value(x: i32) -> i32 {
    x.wrapping_mul(2)
}

/// Rendering used by the by-value entry point.
#[must_use]
pub fn render_by_value(record: Record) -> String {
    format!("record by value: x={}, y={}", record.x, record.y)
}

/// Rendering used by the by-reference entry point.
#[must_use]
pub fn render_by_reference(record: &Record) -> String {
    format!("record by reference: x={}, y={}", record.x, record.y)
}

/// Increment `x` in place, wrapping at the bound.
pub fn nudge(record: &mut Record) {
    record.x = record.x.wrapping_add(1);
}

/// Rendering used by the string entry point.
#[must_use]
pub fn render_message(text: &str) -> String {
    format!("message from native: {text}")
}
