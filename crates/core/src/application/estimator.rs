//! Position Estimator - wait-time estimate for a queue position
//!
//! Pure functions over the rate window; the controller recomputes on every
//! status call so no client-side timer precision is ever relied upon.

use crate::domain::{RateWindow, WaitEstimate};

/// Estimate the wait for `position` (0 = slot occupant, 1 = head, ...).
///
/// - occupant: `Known(0)`
/// - head behind a running job: `Unknown` (depends on pipeline latency)
/// - head with a free slot: time left in the rate window
/// - further back: head estimate plus one interval per item ahead
///
/// Positions behind an `Unknown` head are `Unknown` as well. The estimate is
/// an upper bound: items ahead leaving early only shortens the real wait.
pub fn estimate_wait(
    position: usize,
    slot_occupied: bool,
    window: &RateWindow,
    now_millis: i64,
) -> WaitEstimate {
    if position == 0 {
        return WaitEstimate::Known(0);
    }
    if slot_occupied {
        return WaitEstimate::Unknown;
    }

    let head_wait = window.remaining(now_millis);
    let ahead = (position - 1) as i64;
    WaitEstimate::known(head_wait.saturating_add(ahead.saturating_mul(window.interval_ms)))
}

/// Client-side readiness rule: head of the queue with (almost) no wait left
pub fn is_ready(position: usize, estimate: WaitEstimate, margin_ms: i64) -> bool {
    position == 1 && matches!(estimate, WaitEstimate::Known(ms) if ms < margin_ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    const INTERVAL: i64 = 68_000;

    fn window_completed_at(ts: Option<i64>) -> RateWindow {
        let mut w = RateWindow::new(INTERVAL);
        if let Some(ts) = ts {
            w.record_completion(ts);
        }
        w
    }

    #[test]
    fn test_occupant_waits_zero() {
        let w = window_completed_at(Some(1_000));
        assert_eq!(estimate_wait(0, true, &w, 1_000), WaitEstimate::Known(0));
    }

    #[test]
    fn test_head_behind_running_job_is_unknown() {
        let w = window_completed_at(None);
        assert_eq!(estimate_wait(1, true, &w, 0), WaitEstimate::Unknown);
        assert_eq!(estimate_wait(3, true, &w, 0), WaitEstimate::Unknown);
    }

    #[test]
    fn test_head_with_free_slot_waits_for_window() {
        let w = window_completed_at(Some(10_000));
        assert_eq!(estimate_wait(1, false, &w, 20_000), WaitEstimate::Known(58_000));
        assert_eq!(estimate_wait(1, false, &w, 90_000), WaitEstimate::Known(0));
    }

    #[test]
    fn test_cold_start_head_waits_zero() {
        let w = window_completed_at(None);
        assert_eq!(estimate_wait(1, false, &w, 5), WaitEstimate::Known(0));
    }

    #[test]
    fn test_later_positions_chain_from_head() {
        let w = window_completed_at(Some(10_000));
        // Head waits 58s, then one interval per item ahead
        assert_eq!(
            estimate_wait(2, false, &w, 20_000),
            WaitEstimate::Known(58_000 + INTERVAL)
        );
        assert_eq!(
            estimate_wait(3, false, &w, 20_000),
            WaitEstimate::Known(58_000 + 2 * INTERVAL)
        );
    }

    #[test]
    fn test_estimates_never_negative() {
        let w = window_completed_at(Some(0));
        for position in 0..5 {
            for now in [-10_000, 0, 50_000, 1_000_000] {
                for occupied in [true, false] {
                    match estimate_wait(position, occupied, &w, now) {
                        WaitEstimate::Known(ms) => assert!(ms >= 0),
                        WaitEstimate::Unknown => {}
                    }
                }
            }
        }
    }

    #[test]
    fn test_ready_rule() {
        assert!(is_ready(1, WaitEstimate::Known(0), 1_000));
        assert!(is_ready(1, WaitEstimate::Known(999), 1_000));
        assert!(!is_ready(1, WaitEstimate::Known(1_000), 1_000));
        assert!(!is_ready(1, WaitEstimate::Unknown, 1_000));
        assert!(!is_ready(2, WaitEstimate::Known(0), 1_000));
        assert!(!is_ready(0, WaitEstimate::Known(0), 1_000));
    }
}
