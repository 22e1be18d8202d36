//! HTTP load generation for performance flows

use crate::parser::Metric;
use anyhow::{Context, Result};
use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use log::debug;
use serde::Serialize;
use std::time::{Duration, Instant};

/// What to send
#[derive(Debug, Clone, PartialEq)]
pub struct LoadPlan {
    pub url: String,
    pub method: String,
    pub requests: u32,
    pub concurrency: u32,
    /// Per-request timeout
    pub timeout_ms: u64,
}

/// Latency samples of one load test
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadReport {
    /// Latencies (ms) of requests that got a response
    pub latencies_ms: Vec<f64>,
    /// Transport failures and non-2xx responses
    pub errors: u32,
    pub total: u32,
}

impl LoadReport {
    pub fn avg(&self) -> f64 {
        if self.latencies_ms.is_empty() {
            return 0.0;
        }
        self.latencies_ms.iter().sum::<f64>() / self.latencies_ms.len() as f64
    }

    /// Nearest-rank 95th percentile
    pub fn p95(&self) -> f64 {
        if self.latencies_ms.is_empty() {
            return 0.0;
        }
        let mut sorted = self.latencies_ms.clone();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let rank = (0.95 * sorted.len() as f64).ceil() as usize;
        sorted[rank.clamp(1, sorted.len()) - 1]
    }

    pub fn max(&self) -> f64 {
        self.latencies_ms.iter().copied().fold(0.0, f64::max)
    }

    /// Fraction of failed requests in `[0, 1]`
    pub fn error_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.errors as f64 / self.total as f64
    }

    pub fn metric(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Avg => self.avg(),
            Metric::P95 => self.p95(),
            Metric::Max => self.max(),
            Metric::ErrorRate => self.error_rate(),
        }
    }
}

/// Traffic source for the performance runner
#[async_trait]
pub trait LoadGenerator: Send + Sync {
    async fn run(&self, plan: &LoadPlan) -> Result<LoadReport>;
}

/// Sends real HTTP requests with bounded concurrency
pub struct HttpLoadGenerator {
    client: reqwest::Client,
}

impl HttpLoadGenerator {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl LoadGenerator for HttpLoadGenerator {
    async fn run(&self, plan: &LoadPlan) -> Result<LoadReport> {
        let method = reqwest::Method::from_bytes(plan.method.to_uppercase().as_bytes())
            .with_context(|| format!("Invalid HTTP method: {}", plan.method))?;
        let timeout = Duration::from_millis(plan.timeout_ms);

        let outcomes: Vec<Option<f64>> = stream::iter(0..plan.requests)
            .map(|_| {
                let request = self
                    .client
                    .request(method.clone(), &plan.url)
                    .timeout(timeout);
                async move {
                    let start = Instant::now();
                    match request.send().await {
                        Ok(resp) if resp.status().is_success() => {
                            Some(start.elapsed().as_secs_f64() * 1000.0)
                        }
                        Ok(resp) => {
                            debug!("Load request returned {}", resp.status());
                            None
                        }
                        Err(e) => {
                            debug!("Load request failed: {}", e);
                            None
                        }
                    }
                }
            })
            .buffer_unordered(plan.concurrency.max(1) as usize)
            .collect()
            .await;

        let latencies_ms: Vec<f64> = outcomes.iter().flatten().copied().collect();
        Ok(LoadReport {
            errors: (outcomes.len() - latencies_ms.len()) as u32,
            total: outcomes.len() as u32,
            latencies_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(latencies: &[f64], errors: u32) -> LoadReport {
        LoadReport {
            latencies_ms: latencies.to_vec(),
            errors,
            total: latencies.len() as u32 + errors,
        }
    }

    #[test]
    fn test_metrics() {
        let samples: Vec<f64> = (1..=20).map(|n| n as f64 * 10.0).collect();
        let report = report(&samples, 0);
        assert_eq!(report.avg(), 105.0);
        assert_eq!(report.p95(), 190.0);
        assert_eq!(report.max(), 200.0);
        assert_eq!(report.metric(Metric::ErrorRate), 0.0);
    }

    #[test]
    fn test_error_rate_and_empty_report() {
        let report = report(&[12.0], 3);
        assert_eq!(report.error_rate(), 0.75);

        let empty = LoadReport::default();
        assert_eq!(empty.avg(), 0.0);
        assert_eq!(empty.p95(), 0.0);
        assert_eq!(empty.error_rate(), 0.0);
    }
}
