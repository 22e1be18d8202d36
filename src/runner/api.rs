//! HTTP API step execution

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::debug;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

use super::executor::StepExecutor;
use crate::driver::join_url;
use crate::error::FlowError;
use crate::parser::{RunnerKind, Step, StepAction};
use crate::utils::config::RunConfig;

/// Last response, kept for the `expect*` steps that follow a request
#[derive(Debug, Clone, Default)]
pub struct ApiResponse {
    pub status: u16,
    /// Header names lowercased
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl ApiResponse {
    pub fn json(&self) -> Result<Value, FlowError> {
        serde_json::from_str(&self.body)
            .map_err(|e| FlowError::step(format!("Response body is not JSON: {}", e)))
    }
}

pub struct ApiRunner {
    client: reqwest::Client,
    base_url: Option<String>,
    config: RunConfig,
    last: Option<ApiResponse>,
}

impl ApiRunner {
    pub fn new(config: &RunConfig, base_url: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            client,
            base_url,
            config: config.clone(),
            last: None,
        })
    }

    fn last_response(&self) -> Result<&ApiResponse, FlowError> {
        self.last
            .as_ref()
            .ok_or_else(|| FlowError::step("No response to assert on; run a request first"))
    }

    async fn send(
        &mut self,
        method: &str,
        url: &str,
        headers: &std::collections::BTreeMap<String, String>,
        body: Option<&Value>,
        timeout_ms: u64,
    ) -> Result<&ApiResponse> {
        let method = method
            .to_uppercase()
            .parse::<reqwest::Method>()
            .map_err(|_| FlowError::step(format!("Invalid HTTP method: {}", method)))?;
        let url = join_url(self.base_url.as_deref(), url);

        let mut req = self
            .client
            .request(method.clone(), &url)
            .timeout(Duration::from_millis(timeout_ms));
        for (k, v) in headers {
            req = req.header(k, v);
        }
        if let Some(body) = body {
            req = req.json(body);
        }

        let res = req
            .send()
            .await
            .with_context(|| format!("{} {} failed", method, url))?;
        let status = res.status().as_u16();
        let headers = res
            .headers()
            .iter()
            .map(|(k, v)| {
                (
                    k.as_str().to_lowercase(),
                    v.to_str().unwrap_or_default().to_string(),
                )
            })
            .collect();
        let body = res.text().await.context("Failed to read response body")?;
        debug!("{} {} -> {}", method, url, status);

        Ok(self.last.insert(ApiResponse {
            status,
            headers,
            body,
        }))
    }
}

#[async_trait]
impl StepExecutor for ApiRunner {
    fn kind(&self) -> RunnerKind {
        RunnerKind::Api
    }

    async fn execute(&mut self, step: &Step) -> Result<()> {
        let timeout_ms = self.config.step_timeout(step.timeout);

        match &step.action {
            StepAction::Request {
                method,
                url,
                headers,
                body,
                expect_status,
            } => {
                let response = self
                    .send(method, url, headers, body.as_ref(), timeout_ms)
                    .await?;
                if let Some(expected) = expect_status {
                    check_status(response, *expected)?;
                }
            }
            StepAction::ExpectStatus { status } => {
                check_status(self.last_response()?, *status)?;
            }
            StepAction::ExpectBody { contains } => {
                let response = self.last_response()?;
                if !response.body.contains(contains.as_str()) {
                    return Err(FlowError::step(format!(
                        "Response body does not contain '{}'",
                        contains
                    ))
                    .into());
                }
            }
            StepAction::ExpectJson { path, equals } => {
                let json = self.last_response()?.json()?;
                let pointer = json_pointer(path);
                let actual = json.pointer(&pointer).ok_or_else(|| {
                    FlowError::step(format!("JSON path '{}' not found in response", path))
                })?;
                if !json_equals(actual, equals) {
                    return Err(FlowError::step(format!(
                        "JSON mismatch at '{}': expected {}, got {}",
                        path, equals, actual
                    ))
                    .into());
                }
            }
            StepAction::ExpectHeader { name, equals } => {
                let response = self.last_response()?;
                let actual = response.headers.get(&name.to_lowercase()).ok_or_else(|| {
                    FlowError::step(format!("Header '{}' missing from response", name))
                })?;
                if let Some(expected) = equals {
                    if actual != expected {
                        return Err(FlowError::step(format!(
                            "Header '{}' mismatch: expected '{}', got '{}'",
                            name, expected, actual
                        ))
                        .into());
                    }
                }
            }
            StepAction::Wait { duration } => {
                tokio::time::sleep(Duration::from_millis(*duration)).await;
            }
            other => {
                return Err(FlowError::unsupported_action(other.name(), self.kind().as_str()).into())
            }
        }

        Ok(())
    }

    async fn shutdown(&mut self) -> Result<()> {
        self.last = None;
        Ok(())
    }
}

fn check_status(response: &ApiResponse, expected: u16) -> Result<(), FlowError> {
    if response.status == expected {
        Ok(())
    } else {
        Err(FlowError::step(format!(
            "Expected status {}, got {}",
            expected, response.status
        )))
    }
}

/// Convert a dotted path ("data.items.0.id") to a JSON pointer ("/data/items/0/id").
/// Paths already starting with `/` are used as-is.
pub fn json_pointer(path: &str) -> String {
    if path.starts_with('/') {
        return path.to_string();
    }
    if path.is_empty() || path == "$" {
        return String::new();
    }
    let path = path.strip_prefix("$.").unwrap_or(path);
    path.split('.')
        .map(|segment| format!("/{}", segment.replace('~', "~0").replace('/', "~1")))
        .collect()
}

/// Value equality where numbers compare by value (`1` equals `1.0`)
fn json_equals(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => actual == expected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_pointer() {
        assert_eq!(json_pointer("data.items.0.id"), "/data/items/0/id");
        assert_eq!(json_pointer("$.token"), "/token");
        assert_eq!(json_pointer("/already/pointer"), "/already/pointer");
        assert_eq!(json_pointer("a/b.c"), "/a~1b/c");
        assert_eq!(json_pointer("$"), "");
    }

    #[test]
    fn test_json_equals_numbers() {
        assert!(json_equals(&json!(1), &json!(1.0)));
        assert!(!json_equals(&json!("1"), &json!(1)));
        assert!(json_equals(&json!({"a": [1]}), &json!({"a": [1]})));
    }

    #[tokio::test]
    async fn test_assertions_need_a_response() {
        let mut runner = ApiRunner::new(&RunConfig::default(), None).unwrap();
        let err = runner
            .execute(&Step::new(StepAction::ExpectStatus { status: 200 }))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("run a request first"));
    }

    #[tokio::test]
    async fn test_assertions_against_last_response() {
        let mut runner = ApiRunner::new(&RunConfig::default(), None).unwrap();
        runner.last = Some(ApiResponse {
            status: 201,
            headers: HashMap::from([("content-type".to_string(), "application/json".to_string())]),
            body: r#"{"data": {"id": 7, "tags": ["new"]}}"#.to_string(),
        });

        let steps = [
            StepAction::ExpectStatus { status: 201 },
            StepAction::ExpectBody {
                contains: "\"id\"".to_string(),
            },
            StepAction::ExpectJson {
                path: "data.tags.0".to_string(),
                equals: json!("new"),
            },
            StepAction::ExpectHeader {
                name: "Content-Type".to_string(),
                equals: Some("application/json".to_string()),
            },
        ];
        for action in steps {
            runner.execute(&Step::new(action)).await.unwrap();
        }

        let err = runner
            .execute(&Step::new(StepAction::ExpectJson {
                path: "data.id".to_string(),
                equals: json!(8),
            }))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "JSON mismatch at 'data.id': expected 8, got 7");
    }
}
