// Rate Window Domain Model

use serde::{Deserialize, Serialize};

/// Minimum spacing between successive uses of the rate-limited provider.
///
/// `last_completed_at == None` is the cold-start state: nothing has used the
/// provider since the window was created, so the first claim is free.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateWindow {
    pub last_completed_at: Option<i64>,
    pub interval_ms: i64,
}

impl RateWindow {
    pub fn new(interval_ms: i64) -> Self {
        Self {
            last_completed_at: None,
            interval_ms: interval_ms.max(0),
        }
    }

    /// Earliest instant at which a new claim may succeed
    pub fn free_at(&self) -> Option<i64> {
        self.last_completed_at.map(|ts| ts + self.interval_ms)
    }

    pub fn is_satisfied(&self, now_millis: i64) -> bool {
        match self.free_at() {
            Some(free_at) => now_millis >= free_at,
            None => true,
        }
    }

    /// Milliseconds until the window opens (0 when already open)
    pub fn remaining(&self, now_millis: i64) -> i64 {
        self.free_at()
            .map(|free_at| (free_at - now_millis).max(0))
            .unwrap_or(0)
    }

    pub fn record_completion(&mut self, now_millis: i64) {
        // Keep the latest completion so an out-of-order clock cannot reopen the window early
        self.last_completed_at = Some(match self.last_completed_at {
            Some(prev) => prev.max(now_millis),
            None => now_millis,
        });
    }

    /// Re-install a completion timestamp loaded from persistent storage
    pub fn restore(&mut self, last_completed_at: i64) {
        self.record_completion(last_completed_at);
    }
}
