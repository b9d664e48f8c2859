// Rate Window Repository Port
//
// Queue membership is deliberately in-memory, but the provider's rate limit
// outlives our process: a restart must not let a claim through early.

use crate::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait RateWindowRepository: Send + Sync {
    /// Last recorded completion (epoch ms), if any
    async fn load(&self) -> Result<Option<i64>>;

    /// Persist a completion timestamp
    async fn save(&self, last_completed_at: i64) -> Result<()>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::error::AppError;
    use std::sync::Mutex;

    /// Keeps the timestamp in memory; can be told to fail
    #[derive(Default)]
    pub struct InMemoryRateWindowRepository {
        value: Mutex<Option<i64>>,
        fail_saves: Mutex<bool>,
        save_count: Mutex<usize>,
    }

    impl InMemoryRateWindowRepository {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_value(last_completed_at: i64) -> Self {
            let repo = Self::default();
            *repo.value.lock().unwrap() = Some(last_completed_at);
            repo
        }

        pub fn fail_saves(&self, fail: bool) {
            *self.fail_saves.lock().unwrap() = fail;
        }

        pub fn value(&self) -> Option<i64> {
            *self.value.lock().unwrap()
        }

        pub fn save_count(&self) -> usize {
            *self.save_count.lock().unwrap()
        }
    }

    #[async_trait]
    impl RateWindowRepository for InMemoryRateWindowRepository {
        async fn load(&self) -> Result<Option<i64>> {
            Ok(*self.value.lock().unwrap())
        }

        async fn save(&self, last_completed_at: i64) -> Result<()> {
            if *self.fail_saves.lock().unwrap() {
                return Err(AppError::Database("simulated write failure".to_string()));
            }
            *self.save_count.lock().unwrap() += 1;
            let mut value = self.value.lock().unwrap();
            *value = Some(value.map_or(last_completed_at, |v| v.max(last_completed_at)));
            Ok(())
        }
    }
}
