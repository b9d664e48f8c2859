// Generation Pipeline Port
// The long-running step gated by the queue (split sections, fetch images, render).
// The queue never looks inside it; it only needs to know it finished.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::Fingerprint;

/// User content handed to the pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub owner_id: String,
    pub title: String,
    pub content: String,
}

impl GenerationRequest {
    pub fn new(
        owner_id: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            owner_id: owner_id.into(),
            title: title.into(),
            content: content.into(),
        }
    }

    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::from_content(&self.title, &self.content)
    }
}

/// Finished artifact (opaque to the queue)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationArtifact {
    pub body: String,
    pub duration_ms: i64,
}

/// Pipeline errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error("Spawn failed: {0}")]
    SpawnFailed(String),

    #[error("Pipeline timeout after {0}ms")]
    Timeout(i64),

    #[error("Pipeline failed (exit code {exit_code:?}): {message}")]
    Failed {
        exit_code: Option<i32>,
        message: String,
    },

    #[error("Pipeline panicked: {0}")]
    Panicked(String),

    #[error("IO error: {0}")]
    IoError(String),
}

/// Generation pipeline trait
///
/// Implementations:
/// - SubprocessPipeline (infra-system): runs an external command
/// - MockPipeline: scripted behavior for tests
#[async_trait]
pub trait GenerationPipeline: Send + Sync {
    /// Run the pipeline for one request
    ///
    /// # Errors
    /// Any `PipelineError`; the caller still releases the processing slot.
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationArtifact, PipelineError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Mock pipeline behavior
    #[derive(Debug, Clone)]
    pub enum MockBehavior {
        /// Always succeed
        Success,
        /// Always fail with message
        Fail(String),
        /// Panic with message (for panic isolation testing)
        Panic(String),
        /// Sleep, then succeed
        Delay(Duration),
    }

    /// Mock pipeline for testing
    pub struct MockPipeline {
        behavior: Mutex<MockBehavior>,
        call_count: AtomicUsize,
    }

    impl MockPipeline {
        pub fn new(behavior: MockBehavior) -> Self {
            Self {
                behavior: Mutex::new(behavior),
                call_count: AtomicUsize::new(0),
            }
        }

        pub fn new_success() -> Self {
            Self::new(MockBehavior::Success)
        }

        pub fn new_fail(message: impl Into<String>) -> Self {
            Self::new(MockBehavior::Fail(message.into()))
        }

        pub fn new_panic_inducing(message: impl Into<String>) -> Self {
            Self::new(MockBehavior::Panic(message.into()))
        }

        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl GenerationPipeline for MockPipeline {
        async fn generate(
            &self,
            request: &GenerationRequest,
        ) -> Result<GenerationArtifact, PipelineError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);

            let behavior = self.behavior.lock().unwrap().clone();

            match behavior {
                MockBehavior::Success => Ok(GenerationArtifact {
                    body: format!("<article>{}</article>", request.title),
                    duration_ms: 0,
                }),
                MockBehavior::Fail(msg) => Err(PipelineError::Failed {
                    exit_code: Some(1),
                    message: msg,
                }),
                MockBehavior::Panic(msg) => {
                    panic!("{}", msg);
                }
                MockBehavior::Delay(delay) => {
                    tokio::time::sleep(delay).await;
                    Ok(GenerationArtifact {
                        body: format!("<article>{}</article>", request.title),
                        duration_ms: delay.as_millis() as i64,
                    })
                }
            }
        }
    }
}
