// Queue Store - authoritative waiting sequence + processing slot
//
// Pure synchronous state machine. Callers serialize access (see
// AdmissionController, which keeps it behind a single mutex).

use std::collections::VecDeque;

use crate::domain::admission::ClaimRejection;
use crate::domain::queue_item::{Fingerprint, ItemState, QueueItem, QueueItemId};
use crate::domain::rate_window::RateWindow;

/// What `remove` did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Removal {
    /// Waiting item dropped from the sequence
    Dequeued(QueueItem),
    /// Processing item released (rate window restarted)
    Released(QueueItem),
    /// Nothing matched
    Absent,
}

impl Removal {
    pub fn is_absent(&self) -> bool {
        matches!(self, Removal::Absent)
    }
}

#[derive(Debug, Clone)]
pub struct QueueStore {
    waiting: VecDeque<QueueItem>,
    slot: Option<QueueItem>,
    window: RateWindow,
}

impl QueueStore {
    pub fn new(window: RateWindow) -> Self {
        Self {
            waiting: VecDeque::new(),
            slot: None,
            window,
        }
    }

    /// Append a Waiting item, or refresh the owner's existing Waiting item in place.
    ///
    /// Re-joins keep the original id, `submitted_at` and position so a
    /// reloading client never jumps the line. A re-join carrying the same
    /// fingerprint as the owner's slot occupant returns the occupant.
    pub fn enqueue(
        &mut self,
        id: impl Into<String>,
        owner_id: &str,
        fingerprint: Fingerprint,
        now_millis: i64,
    ) -> QueueItem {
        if let Some(occupant) = self
            .slot
            .as_mut()
            .filter(|i| i.owner_id == owner_id && i.fingerprint == fingerprint)
        {
            occupant.touch(now_millis);
            return occupant.clone();
        }
        if let Some(existing) = self.waiting.iter_mut().find(|i| i.owner_id == owner_id) {
            existing.fingerprint = fingerprint;
            existing.touch(now_millis);
            return existing.clone();
        }

        let item = QueueItem::new(id, owner_id, fingerprint, now_millis);
        self.waiting.push_back(item.clone());
        item
    }

    pub fn peek_head(&self) -> Option<&QueueItem> {
        self.waiting.front()
    }

    /// Move the head item into the processing slot.
    ///
    /// Checks, in order: duplicate claim, membership, head, slot, rate window.
    pub fn claim(&mut self, id: &str, now_millis: i64) -> Result<QueueItem, ClaimRejection> {
        if self.slot.as_ref().is_some_and(|occupant| occupant.id == id) {
            return Err(ClaimRejection::AlreadyProcessing);
        }
        let rank = self
            .waiting
            .iter()
            .position(|i| i.id == id)
            .ok_or(ClaimRejection::NotFound)?;
        if rank != 0 {
            return Err(ClaimRejection::NotHead);
        }
        if self.slot.is_some() {
            return Err(ClaimRejection::SlotOccupied);
        }
        if !self.window.is_satisfied(now_millis) {
            return Err(ClaimRejection::RateWindowNotElapsed);
        }

        let mut item = self.waiting.pop_front().ok_or(ClaimRejection::NotFound)?;
        if item.claim(now_millis).is_err() {
            // Waiting sequence only ever holds Waiting items; put it back untouched
            self.waiting.push_front(item);
            return Err(ClaimRejection::AlreadyProcessing);
        }
        self.slot = Some(item.clone());
        Ok(item)
    }

    /// Free the slot if `id` occupies it. Idempotent.
    pub fn release(&mut self, id: &str, now_millis: i64) -> Option<QueueItem> {
        match &self.slot {
            Some(occupant) if occupant.id == id => {
                self.window.record_completion(now_millis);
                self.slot.take()
            }
            _ => None,
        }
    }

    pub fn remove(&mut self, id: &str, now_millis: i64) -> Removal {
        if let Some(rank) = self.waiting.iter().position(|i| i.id == id) {
            if let Some(item) = self.waiting.remove(rank) {
                return Removal::Dequeued(item);
            }
        }
        match self.release(id, now_millis) {
            Some(item) => Removal::Released(item),
            None => Removal::Absent,
        }
    }

    /// 0 for the processing occupant, otherwise 1-based waiting rank
    pub fn position_of(&self, id: &str) -> Option<usize> {
        if self.slot.as_ref().is_some_and(|occupant| occupant.id == id) {
            return Some(0);
        }
        self.waiting
            .iter()
            .position(|i| i.id == id)
            .map(|rank| rank + 1)
    }

    pub fn find(&self, id: &str) -> Option<&QueueItem> {
        self.slot
            .iter()
            .chain(self.waiting.iter())
            .find(|i| i.id == id)
    }

    pub fn waiting_item_of(&self, owner_id: &str) -> Option<&QueueItem> {
        self.waiting.iter().find(|i| i.owner_id == owner_id)
    }

    pub fn processing_item_of(&self, owner_id: &str) -> Option<&QueueItem> {
        self.slot.as_ref().filter(|i| i.owner_id == owner_id)
    }

    /// Record a status poll; returns false when the id is unknown
    pub fn touch(&mut self, id: &str, now_millis: i64) -> bool {
        match self
            .slot
            .iter_mut()
            .chain(self.waiting.iter_mut())
            .find(|i| i.id == id)
        {
            Some(item) => {
                item.touch(now_millis);
                true
            }
            None => false,
        }
    }

    pub fn slot(&self) -> Option<&QueueItem> {
        self.slot.as_ref()
    }

    pub fn is_slot_free(&self) -> bool {
        self.slot.is_none()
    }

    pub fn waiting_len(&self) -> usize {
        self.waiting.len()
    }

    /// Everyone in the system: waiters plus the slot occupant
    pub fn total_len(&self) -> usize {
        self.waiting.len() + usize::from(self.slot.is_some())
    }

    pub fn waiting_ids(&self) -> Vec<QueueItemId> {
        self.waiting.iter().map(|i| i.id.clone()).collect()
    }

    pub fn window(&self) -> &RateWindow {
        &self.window
    }

    pub fn restore_window(&mut self, last_completed_at: i64) {
        self.window.restore(last_completed_at);
    }

    /// Force-release an occupant that has held the slot longer than `ceiling_ms`
    pub fn reclaim_stale_slot(&mut self, now_millis: i64, ceiling_ms: i64) -> Option<QueueItem> {
        let stale = self
            .slot
            .as_ref()
            .filter(|occupant| {
                occupant.state == ItemState::Processing
                    && occupant
                        .claimed_at
                        .map_or(true, |claimed_at| now_millis - claimed_at > ceiling_ms)
            })
            .map(|occupant| occupant.id.clone())?;
        self.release(&stale, now_millis)
    }

    /// Drop Waiting items whose owners stopped polling more than `ttl_ms` ago
    pub fn evict_idle_waiters(&mut self, now_millis: i64, ttl_ms: i64) -> Vec<QueueItem> {
        let (idle, alive): (VecDeque<_>, VecDeque<_>) = self
            .waiting
            .drain(..)
            .partition(|i| now_millis - i.last_seen_at > ttl_ms);
        self.waiting = alive;
        idle.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INTERVAL: i64 = 68_000;

    fn store() -> QueueStore {
        QueueStore::new(RateWindow::new(INTERVAL))
    }

    fn fp(s: &str) -> Fingerprint {
        Fingerprint::new(s)
    }

    #[test]
    fn test_enqueue_is_fifo() {
        let mut s = store();
        s.enqueue("a", "owner-a", fp("a"), 1);
        s.enqueue("b", "owner-b", fp("b"), 2);
        s.enqueue("c", "owner-c", fp("c"), 3);

        assert_eq!(s.peek_head().map(|i| i.id.as_str()), Some("a"));
        assert_eq!(s.position_of("a"), Some(1));
        assert_eq!(s.position_of("b"), Some(2));
        assert_eq!(s.position_of("c"), Some(3));
        assert_eq!(s.position_of("zzz"), None);
    }

    #[test]
    fn test_rejoin_same_owner_keeps_position() {
        let mut s = store();
        s.enqueue("a", "owner-a", fp("a1"), 1);
        s.enqueue("b", "owner-b", fp("b"), 2);

        let again = s.enqueue("a-new", "owner-a", fp("a2"), 50);

        assert_eq!(again.id, "a");
        assert_eq!(again.submitted_at, 1);
        assert_eq!(again.fingerprint, fp("a2"));
        assert_eq!(again.last_seen_at, 50);
        assert_eq!(s.waiting_len(), 2);
        assert_eq!(s.position_of("a"), Some(1));
        assert_eq!(s.position_of("a-new"), None);
    }

    #[test]
    fn test_rejoin_matching_occupant_returns_slot_item() {
        let mut s = store();
        s.enqueue("a", "owner-a", fp("a"), 1);
        s.claim("a", 1).unwrap();

        let again = s.enqueue("a-retry", "owner-a", fp("a"), 40);

        assert_eq!(again.id, "a");
        assert!(again.is_processing());
        assert_eq!(again.last_seen_at, 40);
        assert_eq!(s.waiting_len(), 0);
        assert_eq!(s.total_len(), 1);
    }

    #[test]
    fn test_new_submission_from_occupant_waits() {
        let mut s = store();
        s.enqueue("a", "owner-a", fp("a1"), 1);
        s.claim("a", 1).unwrap();

        let next = s.enqueue("a2", "owner-a", fp("a2"), 40);

        assert_eq!(next.id, "a2");
        assert_eq!(s.position_of("a2"), Some(1));
        assert_eq!(s.total_len(), 2);
    }

    #[test]
    fn test_claim_requires_head() {
        let mut s = store();
        s.enqueue("a", "owner-a", fp("a"), 1);
        s.enqueue("b", "owner-b", fp("b"), 2);

        assert_eq!(s.claim("b", 10), Err(ClaimRejection::NotHead));
        let claimed = s.claim("a", 10).unwrap();
        assert_eq!(claimed.state, ItemState::Processing);
        assert_eq!(claimed.claimed_at, Some(10));
        assert_eq!(s.position_of("a"), Some(0));
        assert_eq!(s.position_of("b"), Some(1));
    }

    #[test]
    fn test_claim_rejects_when_slot_occupied() {
        let mut s = store();
        s.enqueue("a", "owner-a", fp("a"), 1);
        s.enqueue("b", "owner-b", fp("b"), 2);
        s.claim("a", 10).unwrap();

        assert_eq!(s.claim("b", 20), Err(ClaimRejection::SlotOccupied));
    }

    #[test]
    fn test_duplicate_claim_fails_closed() {
        let mut s = store();
        s.enqueue("a", "owner-a", fp("a"), 1);
        s.claim("a", 10).unwrap();

        assert_eq!(s.claim("a", 11), Err(ClaimRejection::AlreadyProcessing));
        assert_eq!(s.total_len(), 1);
    }

    #[test]
    fn test_claim_unknown_id() {
        let mut s = store();
        assert_eq!(s.claim("ghost", 0), Err(ClaimRejection::NotFound));
    }

    #[test]
    fn test_rate_window_gates_claim() {
        let mut s = store();
        s.enqueue("a", "owner-a", fp("a"), 0);
        s.claim("a", 0).unwrap();
        s.release("a", 1_000);

        s.enqueue("b", "owner-b", fp("b"), 1_100);
        assert_eq!(
            s.claim("b", 1_000 + INTERVAL - 1),
            Err(ClaimRejection::RateWindowNotElapsed)
        );
        assert!(s.claim("b", 1_000 + INTERVAL).is_ok());
    }

    #[test]
    fn test_release_is_idempotent() {
        let mut s = store();
        s.enqueue("a", "owner-a", fp("a"), 0);
        s.claim("a", 0).unwrap();

        assert!(s.release("a", 500).is_some());
        assert!(s.release("a", 900).is_none());
        // Second call must not move the window
        assert_eq!(s.window().last_completed_at, Some(500));
    }

    #[test]
    fn test_release_ignores_other_occupant() {
        let mut s = store();
        s.enqueue("a", "owner-a", fp("a"), 0);
        s.claim("a", 0).unwrap();

        assert!(s.release("b", 500).is_none());
        assert_eq!(s.slot().map(|i| i.id.as_str()), Some("a"));
        assert_eq!(s.window().last_completed_at, None);
    }

    #[test]
    fn test_remove_waiting_and_processing() {
        let mut s = store();
        s.enqueue("a", "owner-a", fp("a"), 0);
        s.enqueue("b", "owner-b", fp("b"), 1);
        s.claim("a", 5).unwrap();

        assert!(matches!(s.remove("b", 6), Removal::Dequeued(_)));
        assert!(matches!(s.remove("a", 7), Removal::Released(_)));
        assert!(s.remove("a", 8).is_absent());
        assert_eq!(s.window().last_completed_at, Some(7));
        assert_eq!(s.total_len(), 0);
    }

    #[test]
    fn test_reclaim_stale_slot() {
        let mut s = store();
        s.enqueue("a", "owner-a", fp("a"), 0);
        s.claim("a", 1_000).unwrap();

        assert!(s.reclaim_stale_slot(5_000, 10_000).is_none());
        let reclaimed = s.reclaim_stale_slot(11_001, 10_000).unwrap();
        assert_eq!(reclaimed.id, "a");
        assert!(s.is_slot_free());
        assert_eq!(s.window().last_completed_at, Some(11_001));
    }

    #[test]
    fn test_evict_idle_waiters_keeps_order() {
        let mut s = store();
        s.enqueue("a", "owner-a", fp("a"), 0);
        s.enqueue("b", "owner-b", fp("b"), 0);
        s.enqueue("c", "owner-c", fp("c"), 0);
        s.touch("a", 9_000);
        s.touch("c", 9_000);

        let evicted = s.evict_idle_waiters(10_000, 5_000);

        assert_eq!(evicted.len(), 1);
        assert_eq!(evicted[0].id, "b");
        assert_eq!(s.waiting_ids(), vec!["a".to_string(), "c".to_string()]);
    }
}
