//! Vivid Queue Client Implementation

use crate::error::{Result, SdkError};
use crate::types::{
    CheckRequest, CheckResponse, CompleteResponse, LeaveRequest, LeaveResponse, OwnerRequest,
    StartResponse, StatsResponse, StatusRequest, StatusResponse,
};
use async_trait::async_trait;
use jsonrpsee::core::client::ClientT;
use jsonrpsee::core::params::ObjectParams;
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use jsonrpsee::rpc_params;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use vivid_core::domain::{
    CompleteOutcome, Fingerprint, JoinOutcome, LeaveOutcome, QueueStatus, StartOutcome,
};
use vivid_core::port::AdmissionGateway;

/// Per-request timeout; every queue call is a short critical section
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Vivid queue daemon client
///
/// # Example
///
/// ```no_run
/// use vivid_queue_sdk::VividQueueClient;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = VividQueueClient::connect("http://127.0.0.1:9627").await?;
/// let stats = client.stats().await?;
/// println!("{} waiting", stats.waiting);
/// # Ok(())
/// # }
/// ```
pub struct VividQueueClient {
    client: HttpClient,
}

impl VividQueueClient {
    /// Connect to the daemon at `url` (e.g. `http://127.0.0.1:9627`)
    pub async fn connect(url: impl AsRef<str>) -> Result<Self> {
        let url = url.as_ref();

        let client = HttpClientBuilder::default()
            .request_timeout(REQUEST_TIMEOUT)
            .build(url)
            .map_err(|e| SdkError::Connection(format!("Failed to create client: {}", e)))?;

        Ok(Self { client })
    }

    async fn call<P, R>(&self, method: &str, params: &P) -> Result<R>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let response: R = self.client.request(method, object_params(params)?).await?;
        Ok(response)
    }

    /// Join the queue with the submission text (queue.check.v1)
    pub async fn check(&self, owner_id: &str, title: &str, content: &str) -> Result<CheckResponse> {
        let request = CheckRequest {
            owner_id,
            title: Some(title),
            content: Some(content),
            fingerprint: None,
        };
        self.call("queue.check.v1", &request).await
    }

    /// Join the queue with a precomputed fingerprint (queue.check.v1)
    pub async fn check_fingerprint(
        &self,
        owner_id: &str,
        fingerprint: &Fingerprint,
    ) -> Result<CheckResponse> {
        let request = CheckRequest {
            owner_id,
            title: None,
            content: None,
            fingerprint: Some(fingerprint.as_str()),
        };
        self.call("queue.check.v1", &request).await
    }

    /// Position and wait estimate (queue.status.v1)
    pub async fn status(&self, queue_item_id: &str) -> Result<StatusResponse> {
        self.call("queue.status.v1", &StatusRequest { queue_item_id })
            .await
    }

    /// Claim the processing slot (queue.start.v1)
    pub async fn start(&self, owner_id: &str) -> Result<StartResponse> {
        self.call("queue.start.v1", &OwnerRequest { owner_id }).await
    }

    /// Release the processing slot (queue.complete.v1)
    pub async fn complete(&self, owner_id: &str) -> Result<CompleteResponse> {
        self.call("queue.complete.v1", &OwnerRequest { owner_id })
            .await
    }

    /// Abandon a queue item (queue.leave.v1)
    pub async fn leave(&self, owner_id: &str, queue_item_id: &str) -> Result<LeaveResponse> {
        self.call(
            "queue.leave.v1",
            &LeaveRequest {
                owner_id,
                queue_item_id,
            },
        )
        .await
    }

    /// Queue counters (admin.stats.v1)
    pub async fn stats(&self) -> Result<StatsResponse> {
        let response: StatsResponse = self.client.request("admin.stats.v1", rpc_params![]).await?;
        Ok(response)
    }
}

/// Send a struct as named (by-name) JSON-RPC params
fn object_params<P: Serialize>(value: &P) -> Result<ObjectParams> {
    let mut params = ObjectParams::new();
    match serde_json::to_value(value)? {
        serde_json::Value::Object(map) => {
            for (name, value) in map {
                params.insert(&name, value)?;
            }
            Ok(params)
        }
        other => Err(SdkError::Other(format!(
            "params must serialize to an object, got {}",
            other
        ))),
    }
}

#[async_trait]
impl AdmissionGateway for VividQueueClient {
    async fn join(
        &self,
        owner_id: &str,
        fingerprint: &Fingerprint,
    ) -> vivid_core::Result<JoinOutcome> {
        Ok(self.check_fingerprint(owner_id, fingerprint).await?.into())
    }

    async fn status(&self, queue_item_id: &str) -> vivid_core::Result<QueueStatus> {
        Ok(VividQueueClient::status(self, queue_item_id).await?.into())
    }

    async fn start(&self, owner_id: &str) -> vivid_core::Result<StartOutcome> {
        Ok(VividQueueClient::start(self, owner_id).await?.into_outcome())
    }

    async fn complete(&self, owner_id: &str) -> vivid_core::Result<CompleteOutcome> {
        let response = VividQueueClient::complete(self, owner_id).await?;
        Ok(CompleteOutcome {
            released: response.released,
        })
    }

    async fn leave(&self, owner_id: &str, queue_item_id: &str) -> vivid_core::Result<LeaveOutcome> {
        let response = VividQueueClient::leave(self, owner_id, queue_item_id).await?;
        Ok(LeaveOutcome {
            removed: response.removed,
        })
    }
}
