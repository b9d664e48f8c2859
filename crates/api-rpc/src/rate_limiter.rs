//! Rate Limiter (Token Bucket Algorithm)
//!
//! Keeps request floods (many tabs polling `queue.status.v1`) from starving
//! the controller. Lock-free: tokens and the refill clock share one atomic.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

pub const DEFAULT_BURST: u32 = 50;
pub const DEFAULT_RATE_PER_SEC: u32 = 20;

/// Token bucket limiter
pub struct RateLimiter {
    // Upper 32 bits: tokens; lower 32 bits: refill clock (ms since creation).
    // The clock wraps every ~49 days, so deltas use wrapping arithmetic.
    packed: AtomicU64,
    creation_time: Instant,
    max_tokens: u32,
    refill_rate: u32, // tokens per second
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_BURST, DEFAULT_RATE_PER_SEC)
    }
}

impl RateLimiter {
    /// `max_tokens` is the burst size, `refill_rate` the sustained requests per second
    pub fn new(max_tokens: u32, refill_rate: u32) -> Self {
        Self {
            packed: AtomicU64::new(pack(max_tokens, 0)),
            creation_time: Instant::now(),
            max_tokens,
            refill_rate,
        }
    }

    /// Consume one token; false when rate limited
    pub fn try_acquire(&self) -> bool {
        let now_ms = self.creation_time.elapsed().as_millis() as u32;

        loop {
            let packed = self.packed.load(Ordering::Acquire);
            let (available, clock) = self.refill(packed, now_ms);

            if available == 0 {
                // Nothing to take; the clock is left where whole tokens stopped
                return false;
            }

            let next = pack(available - 1, clock);
            if self
                .packed
                .compare_exchange(packed, next, Ordering::Release, Ordering::Acquire)
                .is_ok()
            {
                return true;
            }
        }
    }

    /// Tokens currently in the bucket (for stats)
    pub fn remaining(&self) -> u32 {
        let now_ms = self.creation_time.elapsed().as_millis() as u32;
        let (available, _) = self.refill(self.packed.load(Ordering::Acquire), now_ms);
        available
    }

    /// Returns (tokens after refill, new refill clock).
    ///
    /// The clock only advances by the time that produced whole tokens, so
    /// frequent polling never discards fractional refill progress.
    fn refill(&self, packed: u64, now_ms: u32) -> (u32, u32) {
        let tokens = (packed >> 32) as u32;
        let clock = packed as u32;
        let delta_ms = now_ms.wrapping_sub(clock) as u64;
        let earned = delta_ms * self.refill_rate as u64 / 1000;

        if tokens as u64 + earned >= self.max_tokens as u64 {
            return (self.max_tokens, now_ms);
        }
        if earned == 0 {
            return (tokens, clock);
        }
        let spent_ms = (earned * 1000 / self.refill_rate as u64) as u32;
        (tokens + earned as u32, clock.wrapping_add(spent_ms))
    }
}

fn pack(tokens: u32, clock_ms: u32) -> u64 {
    ((tokens as u64) << 32) | clock_ms as u64
}
