//! Automation bridge HTTP client
//!
//! Mobile and desktop targets are driven through an external bridge process
//! (an Appium-style server or a desktop accessibility agent). The bridge owns
//! element lookup; this side only forwards commands.
//!
//! Contract: `POST {bridge}/commands` with `{action, params, timeoutMs}`
//! answered by `{ok, error?, value?}`. Readiness is `GET {bridge}/status`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

/// One command forwarded to the bridge
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeCommand {
    pub action: String,
    pub params: Map<String, Value>,
    pub timeout_ms: u64,
}

impl BridgeCommand {
    pub fn new(action: impl Into<String>, params: Map<String, Value>, timeout_ms: u64) -> Self {
        Self {
            action: action.into(),
            params,
            timeout_ms,
        }
    }
}

/// Bridge answer to a command
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BridgeReply {
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
    /// Command-specific payload (e.g. element text)
    #[serde(default)]
    pub value: Option<Value>,
}

impl BridgeReply {
    pub fn ok() -> Self {
        Self {
            ok: true,
            ..Default::default()
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(error.into()),
            value: None,
        }
    }
}

/// Transport to an automation bridge
#[async_trait]
pub trait BridgeClient: Send + Sync {
    /// Endpoint description for logs
    fn endpoint(&self) -> &str;

    async fn send(&self, command: &BridgeCommand) -> Result<BridgeReply>;

    /// End the bridge-side session
    async fn close(&self) -> Result<()>;
}

/// Bridge client over HTTP
pub struct HttpBridgeClient {
    /// Base URL for the bridge (e.g., "http://127.0.0.1:4723")
    base_url: String,
    /// HTTP client
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    #[serde(default = "ready_by_default")]
    ready: bool,
}

fn ready_by_default() -> bool {
    true
}

impl HttpBridgeClient {
    /// Connect to a bridge, failing when it is unreachable or not ready
    pub async fn connect(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let bridge = Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        };

        if !bridge.is_ready().await? {
            anyhow::bail!("Bridge at {} is not ready", bridge.base_url);
        }
        Ok(bridge)
    }

    /// Check if the bridge is ready
    pub async fn is_ready(&self) -> Result<bool> {
        let url = format!("{}/status", self.base_url);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Bridge unreachable at {}", self.base_url))?;

        if !resp.status().is_success() {
            return Ok(false);
        }
        // An empty or non-JSON body from a 2xx still counts as ready
        match resp.json::<StatusResponse>().await {
            Ok(status) => Ok(status.ready),
            Err(_) => Ok(true),
        }
    }
}

#[async_trait]
impl BridgeClient for HttpBridgeClient {
    fn endpoint(&self) -> &str {
        &self.base_url
    }

    async fn send(&self, command: &BridgeCommand) -> Result<BridgeReply> {
        let url = format!("{}/commands", self.base_url);
        debug!("Bridge {} <- {}", self.base_url, command.action);

        let resp = self
            .client
            .post(&url)
            .timeout(Duration::from_millis(command.timeout_ms.max(1)))
            .json(command)
            .send()
            .await
            .with_context(|| format!("Failed to send '{}' to bridge", command.action))?;

        let status = resp.status();
        let reply: BridgeReply = resp
            .json()
            .await
            .with_context(|| format!("Invalid bridge reply (HTTP {})", status))?;
        Ok(reply)
    }

    async fn close(&self) -> Result<()> {
        let command = BridgeCommand::new("endSession", Map::new(), 10_000);
        let reply = self.send(&command).await?;
        if !reply.ok {
            anyhow::bail!(
                "Bridge refused to end session: {}",
                reply.error.unwrap_or_default()
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_wire_shape() {
        let mut params = Map::new();
        params.insert("selector".to_string(), Value::from("~login"));
        let command = BridgeCommand::new("tap", params, 5000);

        let json = serde_json::to_value(&command).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"action": "tap", "params": {"selector": "~login"}, "timeoutMs": 5000})
        );
    }

    #[test]
    fn test_reply_parsing() {
        let reply: BridgeReply =
            serde_json::from_str(r#"{"ok": false, "error": "no such element"}"#).unwrap();
        assert_eq!(reply, BridgeReply::failed("no such element"));

        let reply: BridgeReply = serde_json::from_str(r#"{"ok": true, "value": "Hello"}"#).unwrap();
        assert!(reply.ok);
        assert_eq!(reply.value, Some(Value::from("Hello")));
    }
}
