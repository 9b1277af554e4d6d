//! Opt-in tracing of protocol messages.
//!
//! Enabled by `RUST_VNC_TRACE=1` (or `true`) at startup, or at runtime with
//! [`set_enabled`]. Lines go to the `protocol_trace` target.

use once_cell::sync::Lazy;
use std::sync::atomic::{AtomicBool, Ordering};

static TRACE_ENABLED: Lazy<AtomicBool> = Lazy::new(|| {
    let on = std::env::var("RUST_VNC_TRACE")
        .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE"))
        .unwrap_or(false);
    AtomicBool::new(on)
});

/// Whether protocol tracing is on.
#[inline]
pub fn enabled() -> bool {
    TRACE_ENABLED.load(Ordering::Relaxed)
}

/// Turn protocol tracing on or off.
#[inline]
pub fn set_enabled(on: bool) {
    TRACE_ENABLED.store(on, Ordering::Relaxed)
}

#[inline]
pub(crate) fn out_msg(name: &str, fields: &str) {
    if enabled() {
        tracing::info!(target: "protocol_trace", "OUT {} {}", name, fields);
    }
}

#[inline]
pub(crate) fn in_msg(name: &str, fields: &str) {
    if enabled() {
        tracing::info!(target: "protocol_trace", "IN  {} {}", name, fields);
    }
}

/// Log up to `max` bytes of `data`, sixteen to a line.
pub(crate) fn hexdump(prefix: &str, data: &[u8], max: usize) {
    if !enabled() || data.is_empty() {
        return;
    }
    for line in hex_lines(&data[..max.min(data.len())]) {
        tracing::info!(target: "protocol_trace", "{}{}", prefix, line);
    }
}

fn hex_lines(data: &[u8]) -> Vec<String> {
    use std::fmt::Write as _;

    data.chunks(16)
        .map(|chunk| {
            let mut line = String::with_capacity(chunk.len() * 3);
            for b in chunk {
                let _ = write!(line, " {:02X}", b);
            }
            line
        })
        .collect()
}
