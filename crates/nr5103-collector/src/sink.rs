//! Metrics sink: writes observations to InfluxDB v2.
//!
//! One observation per request (batch size 1). Transient failures retry with
//! exponential backoff bounded by attempt count, per-delay cap and total
//! elapsed time.

use std::future::Future;
use std::time::{Duration, Instant};

use nr5103_radio::Observation;
use reqwest::StatusCode;
use thiserror::Error;

use crate::config::InfluxConfig;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("building HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("write request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("write rejected with HTTP {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("write failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: Box<SinkError>,
    },
}

impl SinkError {
    /// Network errors, throttling and server errors are worth retrying;
    /// anything else the server will reject again.
    pub fn is_retryable(&self) -> bool {
        match self {
            SinkError::Transport(_) => true,
            SinkError::Status { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            SinkError::Client(_) | SinkError::RetriesExhausted { .. } => false,
        }
    }
}

/// Destination for normalized observations.
pub trait MetricsSink: Send + Sync {
    fn write(&self, observation: &Observation) -> impl Future<Output = Result<(), SinkError>> + Send;
}

// ── Retry policy ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay before the first retry.
    pub interval: Duration,
    pub max_retries: u32,
    /// Cap on any single delay.
    pub max_delay: Duration,
    /// Give up once this much time has passed since the first attempt.
    pub max_time: Duration,
    pub exponential_base: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            max_retries: 5,
            max_delay: Duration::from_millis(125_000),
            max_time: Duration::from_millis(180_000),
            exponential_base: 2,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (0-based):
    /// `interval * base^retry`, capped at `max_delay`.
    pub fn delay(&self, retry: u32) -> Duration {
        let factor = self.exponential_base.max(1).saturating_pow(retry);
        self.interval
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

// ── InfluxDB writer ─────────────────────────────────────────────────

pub struct InfluxWriter {
    http: reqwest::Client,
    write_url: String,
    auth_header: String,
    org: String,
    bucket: String,
    retry: RetryPolicy,
}

impl InfluxWriter {
    pub fn new(cfg: &InfluxConfig) -> Result<Self, SinkError> {
        let http = reqwest::Client::builder()
            .timeout(cfg.timeout)
            .build()
            .map_err(SinkError::Client)?;

        Ok(Self {
            http,
            write_url: format!("{}/api/v2/write", cfg.url),
            auth_header: format!("Token {}", cfg.token),
            org: cfg.org.clone(),
            bucket: cfg.bucket.clone(),
            retry: cfg.retry,
        })
    }

    async fn post(&self, body: &str) -> Result<(), SinkError> {
        let response = self
            .http
            .post(&self.write_url)
            .query(&[
                ("org", self.org.as_str()),
                ("bucket", self.bucket.as_str()),
                ("precision", "ns"),
            ])
            .header(reqwest::header::AUTHORIZATION, &self.auth_header)
            .header(reqwest::header::CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(body.to_string())
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(SinkError::Status { status, body })
    }

    /// POST with retries. Returns the error of the last attempt when giving up.
    async fn post_with_retry(&self, body: &str) -> Result<(), SinkError> {
        let started = Instant::now();
        let mut retry = 0u32;
        loop {
            let err = match self.post(body).await {
                Ok(()) => return Ok(()),
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => e,
            };

            let delay = self.retry.delay(retry);
            if retry >= self.retry.max_retries || started.elapsed() + delay > self.retry.max_time {
                return Err(SinkError::RetriesExhausted {
                    attempts: retry + 1,
                    last: Box::new(err),
                });
            }

            tracing::warn!(
                error = %err,
                retry = retry + 1,
                delay_ms = delay.as_millis() as u64,
                "influxdb write failed, retrying"
            );
            tokio::time::sleep(delay).await;
            retry += 1;
        }
    }
}

impl MetricsSink for InfluxWriter {
    async fn write(&self, observation: &Observation) -> Result<(), SinkError> {
        let line = observation.to_line_protocol();
        tracing::trace!(%line, "writing observation");
        self.post_with_retry(&line).await
    }
}
