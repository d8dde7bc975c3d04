//! Wall-clock timestamps in microseconds since the Unix epoch.
//!
//! All persisted timestamps use the `_us` suffix and this resolution.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time in microseconds since the Unix epoch.
///
/// Saturates instead of panicking on clock skew or far-future clocks.
#[must_use]
pub fn now_us() -> i64 {
    let micros = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_micros();
    i64::try_from(micros).unwrap_or(i64::MAX)
}
