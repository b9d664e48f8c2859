// Client coordinator configuration

use std::time::Duration;

use crate::application::constants::{
    DEFAULT_MAX_REJOINS, DEFAULT_POLL_INTERVAL, DEFAULT_READY_MARGIN_MS, DEFAULT_START_GRACE,
};
use crate::application::retry::RetryPolicy;

#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Status poll cadence while waiting
    pub poll_interval: Duration,

    /// Pause between "ready" and `start`, absorbs clock skew
    pub start_grace: Duration,

    /// Head of queue with a known wait below this counts as ready
    pub ready_margin_ms: i64,

    /// Re-joins allowed after the controller forgets us
    pub max_rejoins: u32,

    /// Backoff for transport failures
    pub retry: RetryPolicy,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            start_grace: DEFAULT_START_GRACE,
            ready_margin_ms: DEFAULT_READY_MARGIN_MS,
            max_rejoins: DEFAULT_MAX_REJOINS,
            retry: RetryPolicy::default(),
        }
    }
}
