//! Process-scoped network bring-up.
//!
//! Hosting applications call [`initialize`] once before constructing any
//! client and [`deinitialize`] once no client remains. Both are idempotent.
//! The standard socket layer needs no global setup on the supported
//! platforms, so the pair only tracks whether the process has opted in.

use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

static INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Bring up process-wide networking. Returns `true` on the first call.
pub fn initialize() -> bool {
    let first = !INITIALIZED.swap(true, Ordering::AcqRel);
    if first {
        debug!("network layer initialized");
    }
    first
}

/// Tear down process-wide networking. Returns `true` if it was initialized.
pub fn deinitialize() -> bool {
    let was = INITIALIZED.swap(false, Ordering::AcqRel);
    if was {
        debug!("network layer torn down");
    }
    was
}

/// Whether [`initialize`] has been called without a matching teardown.
pub fn is_initialized() -> bool {
    INITIALIZED.load(Ordering::Acquire)
}
