//! Manual-refresh cooldown.
//!
//! The gate is a pure timestamp comparison; any countdown shown to the user
//! is recomputed from the timestamp on every tick so a drifting counter can
//! never disagree with the authoritative check.

use chrono::{DateTime, Duration, Utc};

/// Minimum spacing between two manual refreshes.
pub const MIN_REFRESH_INTERVAL_MS: i64 = 120_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshGate {
    pub allowed: bool,
    pub remaining_ms: i64,
}

impl RefreshGate {
    pub fn remaining_secs(&self) -> i64 {
        // Coarse 1s resolution, rounded up so the label never shows 0 while
        // the gate is still closed.
        (self.remaining_ms + 999) / 1000
    }
}

/// Checks whether a manual refresh is allowed at `now`.
pub fn can_refresh_at(last_manual: Option<DateTime<Utc>>, now: DateTime<Utc>) -> RefreshGate {
    match last_manual {
        None => RefreshGate {
            allowed: true,
            remaining_ms: 0,
        },
        Some(last) => {
            let elapsed = (now - last).num_milliseconds();
            if elapsed >= MIN_REFRESH_INTERVAL_MS {
                RefreshGate {
                    allowed: true,
                    remaining_ms: 0,
                }
            } else {
                RefreshGate {
                    allowed: false,
                    remaining_ms: MIN_REFRESH_INTERVAL_MS - elapsed,
                }
            }
        }
    }
}

/// Convenience wrapper over [`can_refresh_at`] using the current time.
pub fn can_refresh(last_manual: Option<DateTime<Utc>>) -> RefreshGate {
    can_refresh_at(last_manual, Utc::now())
}
