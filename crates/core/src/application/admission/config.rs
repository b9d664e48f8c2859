// Admission controller configuration

use crate::application::constants::{
    DEFAULT_PROCESSING_CEILING_MS, DEFAULT_RATE_INTERVAL_MS, DEFAULT_RETRY_HINT_MS,
    DEFAULT_WAITING_TTL_MS,
};

/// Controller tuning (all values in milliseconds)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmissionConfig {
    /// Minimum spacing between generations enforced by the provider
    pub interval_ms: i64,

    /// Retry hint returned with NotHead / SlotOccupied
    pub retry_hint_ms: i64,

    /// Processing items older than this are force-released by the sweep
    pub processing_ceiling_ms: i64,

    /// Waiting items not polled within this window are evicted by the sweep
    pub waiting_ttl_ms: i64,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_RATE_INTERVAL_MS,
            retry_hint_ms: DEFAULT_RETRY_HINT_MS,
            processing_ceiling_ms: DEFAULT_PROCESSING_CEILING_MS,
            waiting_ttl_ms: DEFAULT_WAITING_TTL_MS,
        }
    }
}

impl AdmissionConfig {
    pub fn with_interval(interval_ms: i64) -> Self {
        Self {
            interval_ms,
            ..Default::default()
        }
    }
}
