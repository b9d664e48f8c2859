// Queue constants (No magic values)
use std::time::Duration;

/// Provider rate limit: one generation per 68 seconds
pub const DEFAULT_RATE_INTERVAL_MS: i64 = 68_000;

/// Retry hint for NotHead / SlotOccupied rejections (matches the poll interval)
pub const DEFAULT_RETRY_HINT_MS: i64 = 10_000;

/// Processing items older than this are force-released (10 minutes)
pub const DEFAULT_PROCESSING_CEILING_MS: i64 = 10 * 60 * 1000;

/// Waiting items not polled for this long are evicted (6 missed polls)
pub const DEFAULT_WAITING_TTL_MS: i64 = 60_000;

/// How often the liveness sweep runs
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(15);

/// Client status poll interval
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Client treats position 1 with a wait below this as ready
pub const DEFAULT_READY_MARGIN_MS: i64 = 1_000;

/// Extra pause between "ready" and `start` to absorb clock skew
pub const DEFAULT_START_GRACE: Duration = Duration::from_secs(2);

/// Client delay after a failed status call
pub const DEFAULT_ERROR_RETRY_DELAY_MS: i64 = 5_000;

/// Client re-joins allowed after lost membership
pub const DEFAULT_MAX_REJOINS: u32 = 5;

/// Client attempts per gateway call before giving up
pub const DEFAULT_MAX_GATEWAY_ATTEMPTS: u32 = 5;

/// Upper bound for any single client backoff sleep
pub const MAX_BACKOFF_MS: i64 = 60_000;
