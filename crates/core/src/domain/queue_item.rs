// Queue Item Domain Model

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::error::{DomainError, Result};

/// Queue item ID (opaque capability token handed to clients)
pub type QueueItemId = String;

/// Owner identifier supplied by the identity provider
pub type OwnerId = String;

/// Namespace for request fingerprints (UUIDv5)
const FINGERPRINT_NAMESPACE: Uuid = Uuid::from_u128(0x6f1c_2b7e_94d3_4a51_8e0f_5c7a_3d29_b184);

/// Identifies the logical request behind a queue item.
///
/// Two joins with the same title and content produce the same fingerprint,
/// regardless of which tab submitted them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Derive a fingerprint from the submitted title and content
    pub fn from_content(title: &str, content: &str) -> Self {
        let mut material = Vec::with_capacity(title.len() + content.len() + 1);
        material.extend_from_slice(title.as_bytes());
        material.push(0);
        material.extend_from_slice(content.as_bytes());
        Self(Uuid::new_v5(&FINGERPRINT_NAMESPACE, &material).to_string())
    }

    /// Wrap an externally computed fingerprint
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Queue item state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemState {
    Waiting,
    Processing,
}

impl std::fmt::Display for ItemState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemState::Waiting => write!(f, "WAITING"),
            ItemState::Processing => write!(f, "PROCESSING"),
        }
    }
}

/// Queue Item Entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueItem {
    pub id: QueueItemId,
    pub owner_id: OwnerId,
    pub fingerprint: Fingerprint,
    pub submitted_at: i64, // epoch ms
    pub state: ItemState,
    pub claimed_at: Option<i64>,
    /// Last time the owner showed signs of life (join or status poll)
    pub last_seen_at: i64,
}

impl QueueItem {
    /// Create a new Waiting item
    ///
    /// # Arguments
    ///
    /// * `id` - Unique item ID (injected, not generated)
    /// * `owner_id` - Owner supplied by the identity provider
    /// * `fingerprint` - Logical request fingerprint
    /// * `submitted_at` - Enqueue timestamp in epoch ms (injected, not system time)
    pub fn new(
        id: impl Into<String>,
        owner_id: impl Into<String>,
        fingerprint: Fingerprint,
        submitted_at: i64,
    ) -> Self {
        Self {
            id: id.into(),
            owner_id: owner_id.into(),
            fingerprint,
            submitted_at,
            state: ItemState::Waiting,
            claimed_at: None,
            last_seen_at: submitted_at,
        }
    }

    /// Transition Waiting -> Processing with explicit timestamp
    pub fn claim(&mut self, now_millis: i64) -> Result<()> {
        if self.state != ItemState::Waiting {
            return Err(DomainError::InvalidStateTransition {
                from: self.state.to_string(),
                to: ItemState::Processing.to_string(),
            });
        }
        self.state = ItemState::Processing;
        self.claimed_at = Some(now_millis);
        self.last_seen_at = now_millis;
        Ok(())
    }

    pub fn is_processing(&self) -> bool {
        self.state == ItemState::Processing
    }

    /// Record client activity
    pub fn touch(&mut self, now_millis: i64) {
        self.last_seen_at = self.last_seen_at.max(now_millis);
    }
}
