//! JSON-RPC transport used by the chain backend.

use std::{future::Future, time::Duration};

use anyhow::Context;
use backon::{ConstantBuilder, Retryable};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::Value;

/// Per-request timeout. Receipt waits are bounded separately by the poller.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    #[serde(default)]
    code: i64,
    message: String,
}

pub fn create_client() -> Result<reqwest::Client, anyhow::Error> {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .context("Failed to build JSON-RPC client")
}

/// Send one JSON-RPC request to `url` and decode its `result` as `T`.
///
/// A node-side error (`{"error": {...}}`, e.g. a revert during `eth_call`) becomes an
/// `Err` carrying the node's code and message. A `null` result decodes into `T` as
/// JSON `null`, so pending lookups should ask for an `Option`.
pub async fn json_rpc_call<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
    method: &str,
    params: Vec<Value>,
) -> Result<T, anyhow::Error> {
    let request = serde_json::json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": method,
        "params": params,
    });

    let response: RpcResponse = client
        .post(url)
        .json(&request)
        .send()
        .await
        .with_context(|| format!("{} request to {} failed", method, url))?
        .json()
        .await
        .with_context(|| format!("{} returned a malformed response", method))?;

    if let Some(error) = response.error {
        anyhow::bail!("{} failed ({}): {}", method, error.code, error.message);
    }

    serde_json::from_value(response.result.unwrap_or(Value::Null))
        .with_context(|| format!("Unexpected {} result", method))
}

/// Poll `check_fn` until it yields a value.
///
/// Used for reads that become available later (a transaction receipt). `Ok(None)` and
/// errors both count as "not yet"; the last error is returned once `timeout` elapses.
pub async fn poll_until_some<T, F, Fut>(
    name: &str,
    interval: Duration,
    timeout: Duration,
    check_fn: F,
) -> Result<T, anyhow::Error>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<Option<T>, anyhow::Error>>,
{
    let attempts = (timeout.as_millis() / interval.as_millis().max(1)).max(1) as usize;

    let check_fn = &check_fn;
    let poll = move || async move {
        check_fn()
            .await?
            .with_context(|| format!("{} not available yet", name))
    };

    poll.retry(
        ConstantBuilder::default()
            .with_delay(interval)
            .with_max_times(attempts),
    )
    .notify(|err: &anyhow::Error, dur: Duration| {
        tracing::trace!(error = %err, target = %name, retry_in = ?dur, "Polling...");
    })
    .await
    .with_context(|| format!("Timeout waiting for {} after {:?}", name, timeout))
}
