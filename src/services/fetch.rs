// src/services/fetch.rs

//! Source document fetching with request pacing and bounded retry.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use reqwest::{Client, StatusCode};
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::error::FetchError;
use crate::models::RetryConfig;

/// Capability to acquire the raw bytes behind a URI.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, uri: &str) -> Result<Vec<u8>, FetchError>;
}

/// Exponential backoff with an attempt bound.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Fraction of each delay that may be randomly shaved off
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            jitter: clamp_jitter(config.jitter),
        }
    }

    /// Single attempt, no retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            jitter: 0.0,
        }
    }

    /// Delay before retry number `attempt_index + 1`, without jitter.
    pub fn delay_for_attempt(&self, attempt_index: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt_index).unwrap_or(u32::MAX);
        let delay = self.base_delay.saturating_mul(factor);
        delay.min(self.max_delay)
    }

    fn jittered(&self, delay: Duration) -> Duration {
        let jitter = clamp_jitter(self.jitter);
        if jitter <= 0.0 || delay.is_zero() {
            return delay;
        }
        let shave = rand::thread_rng().gen_range(0.0..=jitter);
        delay.mul_f64(1.0 - shave)
    }

    /// Drive `op` until it succeeds, fails permanently, or runs out of attempts.
    ///
    /// `op` receives the 1-based attempt number. A transient error on the last
    /// attempt is returned as permanent.
    pub async fn run<T, F, Fut>(&self, uri: &str, mut op: F) -> Result<T, FetchError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < max_attempts => {
                    let delay = self.jittered(self.delay_for_attempt(attempt - 1));
                    log::warn!(
                        "Attempt {}/{} for {} failed ({}), retrying in {:?}",
                        attempt,
                        max_attempts,
                        uri,
                        err.message,
                        delay
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    attempt += 1;
                }
                Err(err) if err.is_transient() => return Err(err.exhausted(attempt)),
                Err(err) => return Err(err),
            }
        }
    }
}

/// NaN and infinities disable jitter.
fn clamp_jitter(jitter: f64) -> f64 {
    if jitter.is_finite() {
        jitter.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Enforces a minimum gap between consecutive requests.
#[derive(Debug)]
pub struct Pacer {
    delay: Duration,
    last: Mutex<Option<Instant>>,
}

impl Pacer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            last: Mutex::new(None),
        }
    }

    /// Wait until the next request may be sent, then claim the slot.
    pub async fn wait(&self) {
        let mut last = self.last.lock().await;
        if let Some(prev) = *last {
            let next = prev + self.delay;
            if Instant::now() < next {
                tokio::time::sleep_until(next).await;
            }
        }
        *last = Some(Instant::now());
    }
}

/// Whether an HTTP status is worth retrying.
pub fn is_transient_status(status: StatusCode) -> bool {
    status.is_server_error() || matches!(status.as_u16(), 408 | 425 | 429)
}

fn classify_reqwest_error(uri: &str, err: &reqwest::Error) -> FetchError {
    if err.is_timeout() || err.is_connect() || err.is_request() || err.is_body() {
        FetchError::transient(uri, err)
    } else {
        FetchError::permanent(uri, err)
    }
}

/// HTTP implementation of [`Fetcher`].
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
    pacer: Arc<Pacer>,
    retry: RetryPolicy,
}

impl HttpFetcher {
    pub fn new(client: Client, pacer: Arc<Pacer>, retry: RetryPolicy) -> Self {
        Self {
            client,
            pacer,
            retry,
        }
    }

    async fn fetch_once(&self, uri: &str) -> Result<Vec<u8>, FetchError> {
        self.pacer.wait().await;

        let response = self
            .client
            .get(uri)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(uri, &e))?;

        let status = response.status();
        if !status.is_success() {
            let message = format!("HTTP {status}");
            return Err(if is_transient_status(status) {
                FetchError::transient(uri, message)
            } else {
                FetchError::permanent(uri, message)
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| classify_reqwest_error(uri, &e))?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, uri: &str) -> Result<Vec<u8>, FetchError> {
        log::debug!("Fetching {}", uri);
        self.retry.run(uri, |_| self.fetch_once(uri)).await
    }
}
