// Minimal JSON-RPC client for one-shot commands

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tabled::Tabled;

#[derive(Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    params: serde_json::Value,
    id: u64,
}

#[derive(Deserialize)]
struct JsonRpcResponse {
    result: Option<serde_json::Value>,
    error: Option<JsonRpcError>,
}

#[derive(Deserialize)]
struct JsonRpcError {
    code: i32,
    message: String,
}

pub async fn call_rpc<T: DeserializeOwned>(
    url: &str,
    method: &str,
    params: serde_json::Value,
) -> Result<T> {
    let request = JsonRpcRequest {
        jsonrpc: "2.0",
        method,
        params,
        id: 1,
    };

    let client = reqwest::Client::new();
    let response: JsonRpcResponse = client
        .post(url)
        .json(&request)
        .send()
        .await
        .context("Failed to connect to daemon")?
        .json()
        .await
        .context("Failed to parse response")?;

    if let Some(error) = response.error {
        anyhow::bail!("RPC error ({}): {}", error.code, error.message);
    }

    let result = response
        .result
        .ok_or_else(|| anyhow::anyhow!("No result in response"))?;
    serde_json::from_value(result).with_context(|| format!("Unexpected {} result", method))
}

fn format_wait(ms: &i64) -> String {
    if *ms < 0 {
        "unknown".to_string()
    } else {
        format!("{:.1}s", *ms as f64 / 1000.0)
    }
}

#[derive(Deserialize, Tabled)]
#[serde(rename_all = "camelCase")]
pub struct CheckResult {
    #[tabled(rename = "queue item")]
    pub queue_item_id: String,
    #[tabled(rename = "can process")]
    pub can_process: bool,
    pub position: usize,
    #[tabled(rename = "in queue")]
    pub total_in_queue: usize,
    #[tabled(rename = "est. wait", display_with = "format_wait")]
    pub estimated_wait_time: i64,
}

#[derive(Deserialize, Tabled)]
#[serde(rename_all = "camelCase")]
pub struct StatusResult {
    #[tabled(rename = "in queue")]
    pub in_queue: bool,
    pub position: usize,
    #[tabled(rename = "total")]
    pub total_in_queue: usize,
    #[tabled(rename = "est. wait", display_with = "format_wait")]
    pub estimated_wait_time: i64,
    #[tabled(rename = "processing")]
    pub is_processing: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartResult {
    pub success: bool,
    pub queue_item_id: Option<String>,
    pub error: Option<String>,
    pub retry_after: Option<i64>,
}

#[derive(Deserialize)]
pub struct CompleteResult {
    pub released: bool,
}

#[derive(Deserialize)]
pub struct LeaveResult {
    pub removed: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResult {
    pub waiting: usize,
    pub processing: Option<String>,
    pub processing_since: Option<i64>,
    pub oldest_waiting_since: Option<i64>,
    pub interval_ms: i64,
    pub last_completed_at: Option<i64>,
    pub rate_window_remaining_ms: i64,
    pub rate_limit_tokens: u32,
    pub uptime_seconds: i64,
}
