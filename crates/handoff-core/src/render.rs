//! `snprintf`-style text output into caller-owned buffers.

/// Copy `text` into `out` as a NUL-terminated byte string.
///
/// Writes at most `out.len() - 1` bytes followed by a NUL, and returns the full
/// length of `text` so callers can detect truncation and retry with a larger
/// buffer. An empty `out` receives nothing.
pub fn write_terminated(text: &str, out: &mut [u8]) -> usize {
    let bytes = text.as_bytes();
    if let Some(room) = out.len().checked_sub(1) {
        let n = bytes.len().min(room);
        out[..n].copy_from_slice(&bytes[..n]);
        out[n] = 0;
    }
    bytes.len()
}
