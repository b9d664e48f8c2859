//! Unit tests for the admission controller

use super::*;
use crate::domain::WaitEstimate;
use crate::port::id_provider::mocks::SequentialIdProvider;
use crate::port::rate_window_repository::mocks::InMemoryRateWindowRepository;
use crate::port::time_provider::mocks::ManualClock;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio_test::{assert_err, assert_ok};

const INTERVAL: i64 = 68_000;
const T0: i64 = 1_700_000_000_000;

struct Harness {
    controller: Arc<AdmissionController>,
    clock: Arc<ManualClock>,
    repo: Arc<InMemoryRateWindowRepository>,
}

fn harness_with(config: AdmissionConfig, repo: InMemoryRateWindowRepository) -> Harness {
    let clock = Arc::new(ManualClock::new(T0));
    let repo = Arc::new(repo);
    let controller = Arc::new(AdmissionController::new(
        config,
        Arc::new(SequentialIdProvider::new()),
        clock.clone(),
        repo.clone(),
    ));
    Harness {
        controller,
        clock,
        repo,
    }
}

fn harness() -> Harness {
    harness_with(
        AdmissionConfig::with_interval(INTERVAL),
        InMemoryRateWindowRepository::new(),
    )
}

fn fp(s: &str) -> Fingerprint {
    Fingerprint::from_content(s, "content")
}

#[tokio::test]
async fn test_cold_start_join_is_granted() {
    let h = harness();

    let outcome = h.controller.join("alice", fp("a")).await.unwrap();

    assert!(outcome.can_process);
    assert_eq!(outcome.status.position, 0);
    assert!(outcome.status.is_processing);
    assert_eq!(outcome.status.estimated_wait, WaitEstimate::Known(0));
}

#[tokio::test]
async fn test_three_client_scenario() {
    let h = harness();
    let c = &h.controller;

    // A is granted immediately, B and C queue behind the running job
    let a = c.join("alice", fp("a")).await.unwrap();
    let b = c.join("bob", fp("b")).await.unwrap();
    let cc = c.join("carol", fp("c")).await.unwrap();
    assert!(a.can_process);
    assert!(!b.can_process);
    assert!(!cc.can_process);

    let b_status = c.status(&b.queue_item_id).await.unwrap();
    let c_status = c.status(&cc.queue_item_id).await.unwrap();
    assert_eq!(b_status.position, 1);
    assert_eq!(c_status.position, 2);
    assert_eq!(b_status.estimated_wait, WaitEstimate::Unknown);
    assert_eq!(c_status.estimated_wait, WaitEstimate::Unknown);
    assert_eq!(b_status.total_in_queue, 3);

    // A finishes; the rate window starts counting from now
    h.clock.advance(30_000);
    assert!(c.complete("alice").await.unwrap().released);

    let b_status = c.status(&b.queue_item_id).await.unwrap();
    let c_status = c.status(&cc.queue_item_id).await.unwrap();
    assert_eq!(b_status.estimated_wait, WaitEstimate::Known(INTERVAL));
    assert_eq!(c_status.estimated_wait, WaitEstimate::Known(2 * INTERVAL));

    // Too early: B gets the exact remaining wait back
    assert_eq!(
        c.start("bob").await.unwrap(),
        StartOutcome::Rejected {
            reason: ClaimRejection::RateWindowNotElapsed,
            retry_after_ms: INTERVAL,
        }
    );

    // Window elapsed: B is ready and starts
    h.clock.advance(INTERVAL);
    let b_status = c.status(&b.queue_item_id).await.unwrap();
    assert_eq!(b_status.position, 1);
    assert_eq!(b_status.estimated_wait, WaitEstimate::Known(0));
    assert!(c.start("bob").await.unwrap().is_started());

    // C moved to the head but waits on B's job
    let c_status = c.status(&cc.queue_item_id).await.unwrap();
    assert_eq!(c_status.position, 1);
    assert_eq!(c_status.estimated_wait, WaitEstimate::Unknown);
    assert_eq!(
        c.start("carol").await.unwrap(),
        StartOutcome::Rejected {
            reason: ClaimRejection::SlotOccupied,
            retry_after_ms: c.config().retry_hint_ms,
        }
    );

    c.complete("bob").await.unwrap();
    let c_status = c.status(&cc.queue_item_id).await.unwrap();
    assert_eq!(c_status.estimated_wait, WaitEstimate::Known(INTERVAL));
}

#[tokio::test]
async fn test_start_out_of_turn_is_not_head() {
    let h = harness();
    let c = &h.controller;

    c.join("alice", fp("a")).await.unwrap();
    c.complete("alice").await.unwrap();
    c.join("bob", fp("b")).await.unwrap();
    c.join("carol", fp("c")).await.unwrap();

    let outcome = c.start("carol").await.unwrap();
    assert_eq!(
        outcome,
        StartOutcome::Rejected {
            reason: ClaimRejection::NotHead,
            retry_after_ms: c.config().retry_hint_ms,
        }
    );
}

#[tokio::test]
async fn test_duplicate_start_fails_closed() {
    let h = harness();
    let c = &h.controller;

    h.clock.advance(1);
    c.join("alice", fp("a")).await.unwrap();

    let outcome = c.start("alice").await.unwrap();
    assert!(matches!(
        outcome,
        StartOutcome::Rejected {
            reason: ClaimRejection::AlreadyProcessing,
            ..
        }
    ));
    assert_eq!(c.stats().unwrap().waiting, 0);
}

#[tokio::test]
async fn test_retried_join_after_fast_claim_returns_held_slot() {
    let h = harness();
    let c = &h.controller;

    let first = c.join("alice", fp("a")).await.unwrap();
    assert!(first.can_process);

    // Same submission again, e.g. the first response never reached the client
    h.clock.advance(300);
    let second = c.join("alice", fp("a")).await.unwrap();

    assert!(second.can_process);
    assert_eq!(second.queue_item_id, first.queue_item_id);
    assert_eq!(second.status.position, 0);
    assert!(second.status.is_processing);
    assert_eq!(second.status.total_in_queue, 1);
    assert_eq!(c.stats().unwrap().waiting, 0);

    let outcome = c.start("alice").await.unwrap();
    assert_eq!(
        outcome,
        StartOutcome::Rejected {
            reason: ClaimRejection::AlreadyProcessing,
            retry_after_ms: 0,
        }
    );
}

#[tokio::test]
async fn test_occupant_with_new_submission_fails_closed_on_start() {
    let h = harness();
    let c = &h.controller;

    c.join("alice", fp("a")).await.unwrap();
    let next = c.join("alice", fp("a-second")).await.unwrap();

    assert!(!next.can_process);
    assert_eq!(next.status.position, 1);
    assert!(matches!(
        c.start("alice").await.unwrap(),
        StartOutcome::Rejected {
            reason: ClaimRejection::AlreadyProcessing,
            ..
        }
    ));
}

#[tokio::test]
async fn test_start_without_membership() {
    let h = harness();
    let outcome = h.controller.start("nobody").await.unwrap();
    assert!(matches!(
        outcome,
        StartOutcome::Rejected {
            reason: ClaimRejection::NotFound,
            retry_after_ms: 0,
        }
    ));
}

#[tokio::test]
async fn test_complete_is_idempotent() {
    let h = harness();
    let c = &h.controller;

    c.join("alice", fp("a")).await.unwrap();
    h.clock.advance(5_000);

    let first = assert_ok!(c.complete("alice").await);
    h.clock.advance(5_000);
    let second = assert_ok!(c.complete("alice").await);

    assert!(first.released);
    assert!(!second.released);
    // Duplicate completion must not push the window further out
    assert_eq!(c.stats().unwrap().last_completed_at, Some(T0 + 5_000));
    assert_eq!(h.repo.save_count(), 1);
}

#[tokio::test]
async fn test_complete_survives_persistence_failure() {
    let h = harness();
    h.repo.fail_saves(true);

    h.controller.join("alice", fp("a")).await.unwrap();
    let outcome = assert_ok!(h.controller.complete("alice").await);

    assert!(outcome.released);
    assert_eq!(h.controller.stats().unwrap().last_completed_at, Some(T0));
}

#[tokio::test]
async fn test_status_unknown_id_reports_not_in_queue() {
    let h = harness();
    h.controller.join("alice", fp("a")).await.unwrap();

    let status = h.controller.status("stale-id").await.unwrap();

    assert!(!status.in_queue);
    assert_eq!(status.total_in_queue, 1);
}

#[tokio::test]
async fn test_rejoin_keeps_place_in_line() {
    let h = harness();
    let c = &h.controller;

    c.join("alice", fp("a")).await.unwrap();
    let bob = c.join("bob", fp("b")).await.unwrap();
    c.join("carol", fp("c")).await.unwrap();

    let again = c.join("bob", fp("b2")).await.unwrap();

    assert_eq!(again.queue_item_id, bob.queue_item_id);
    assert_eq!(again.status.position, 1);
    assert_eq!(c.stats().unwrap().waiting, 2);
}

#[tokio::test]
async fn test_leave_waiting_and_processing() {
    let h = harness();
    let c = &h.controller;

    let a = c.join("alice", fp("a")).await.unwrap();
    let b = c.join("bob", fp("b")).await.unwrap();

    assert!(c.leave("bob", &b.queue_item_id).await.unwrap().removed);
    assert!(!c.leave("bob", &b.queue_item_id).await.unwrap().removed);

    // Leaving while processing frees the slot and restarts the window
    h.clock.advance(1_000);
    assert!(c.leave("alice", &a.queue_item_id).await.unwrap().removed);
    let stats = c.stats().unwrap();
    assert_eq!(stats.processing, None);
    assert_eq!(stats.last_completed_at, Some(T0 + 1_000));
}

#[tokio::test]
async fn test_leave_foreign_item_is_ignored() {
    let h = harness();
    let c = &h.controller;

    c.join("alice", fp("a")).await.unwrap();
    let b = c.join("bob", fp("b")).await.unwrap();

    assert!(!c.leave("mallory", &b.queue_item_id).await.unwrap().removed);
    assert!(c.status(&b.queue_item_id).await.unwrap().in_queue);
}

#[tokio::test]
async fn test_validation_errors() {
    let h = harness();
    let c = &h.controller;

    assert_err!(c.join("", fp("a")).await);
    assert_err!(c.status("").await);
    assert_err!(c.leave("alice", "").await);
}

#[tokio::test]
async fn test_restore_honours_persisted_window() {
    let h = harness_with(
        AdmissionConfig::with_interval(INTERVAL),
        InMemoryRateWindowRepository::with_value(T0 - 10_000),
    );

    let restored = h.controller.restore().await.unwrap();
    assert_eq!(restored, Some(T0 - 10_000));

    // Fresh process, empty queue, but the provider window is still closed
    let outcome = h.controller.join("alice", fp("a")).await.unwrap();
    assert!(!outcome.can_process);
    assert_eq!(outcome.status.position, 1);
    assert_eq!(
        outcome.status.estimated_wait,
        WaitEstimate::Known(INTERVAL - 10_000)
    );
}

#[tokio::test]
async fn test_sweep_reclaims_stuck_slot_and_idle_waiters() {
    let config = AdmissionConfig {
        interval_ms: 0,
        processing_ceiling_ms: 60_000,
        waiting_ttl_ms: 20_000,
        ..Default::default()
    };
    let h = harness_with(config, InMemoryRateWindowRepository::new());
    let c = &h.controller;

    c.join("crashed", fp("a")).await.unwrap();
    let idle = c.join("idle", fp("b")).await.unwrap();
    let alive = c.join("alive", fp("c")).await.unwrap();

    h.clock.advance(30_000);
    c.status(&alive.queue_item_id).await.unwrap();
    let report = c.sweep().await.unwrap();
    assert!(report.reclaimed.is_none());
    assert_eq!(report.evicted.len(), 1);
    assert_eq!(report.evicted[0].id, idle.queue_item_id);

    h.clock.advance(31_000);
    c.status(&alive.queue_item_id).await.unwrap();
    let report = c.sweep().await.unwrap();
    assert_eq!(report.reclaimed.map(|i| i.owner_id), Some("crashed".to_string()));
    assert!(report.evicted.is_empty());

    // The evicted client finds out on its next poll
    assert!(!c.status(&idle.queue_item_id).await.unwrap().in_queue);
    assert!(c.start("alive").await.unwrap().is_started());
    assert_eq!(h.repo.value(), Some(T0 + 61_000));
}

#[tokio::test]
async fn test_fifo_fairness() {
    let h = harness_with(AdmissionConfig::with_interval(0), InMemoryRateWindowRepository::new());
    let c = &h.controller;

    c.join("first", fp("0")).await.unwrap();
    for owner in ["o1", "o2", "o3", "o4"] {
        c.join(owner, fp(owner)).await.unwrap();
    }
    c.complete("first").await.unwrap();

    let mut order = Vec::new();
    for _ in 0..4 {
        // Only the head can ever start
        for owner in ["o1", "o2", "o3", "o4"] {
            if c.start(owner).await.unwrap().is_started() {
                order.push(owner);
                c.complete(owner).await.unwrap();
                break;
            }
        }
    }

    assert_eq!(order, vec!["o1", "o2", "o3", "o4"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_mutual_exclusion_under_concurrency() {
    let h = harness_with(AdmissionConfig::with_interval(0), InMemoryRateWindowRepository::new());
    let in_flight = Arc::new(AtomicUsize::new(0));
    let max_seen = Arc::new(AtomicUsize::new(0));

    let mut handles = vec![];
    for i in 0..32 {
        let controller = h.controller.clone();
        let in_flight = in_flight.clone();
        let max_seen = max_seen.clone();
        handles.push(tokio::spawn(async move {
            let owner = format!("owner-{}", i);
            let joined = controller.join(&owner, fp(&owner)).await.unwrap();
            if !joined.can_process {
                while !controller.start(&owner).await.unwrap().is_started() {
                    tokio::task::yield_now().await;
                }
            }

            let now_running = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            max_seen.fetch_max(now_running, Ordering::SeqCst);
            tokio::task::yield_now().await;
            in_flight.fetch_sub(1, Ordering::SeqCst);

            controller.complete(&owner).await.unwrap();
        }));
    }

    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    let stats = h.controller.stats().unwrap();
    assert_eq!(stats.waiting, 0);
    assert_eq!(stats.processing, None);
}
