use std::{future::Future, time::Duration};

use grid_client::ApiError;

/// Linear backoff retry for provider calls: attempt `n` waits `backoff * n`.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff: Duration) -> Self {
        Self { max_retries, backoff }
    }

    pub async fn run<T, F, Fut>(&self, operation: &'static str, mut call: F) -> Result<T, ApiError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let mut attempt: u32 = 0;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    metrics::counter!("provider_retries_total", "operation" => operation).increment(1);
                    tracing::warn!(
                        error = %e,
                        operation,
                        attempt,
                        "provider call failed, retrying with backoff"
                    );
                    tokio::time::sleep(self.backoff * attempt).await;
                }
                Err(e) => {
                    tracing::error!(error = %e, operation, attempt, "provider call failed, giving up");
                    return Err(e);
                }
            }
        }
    }
}
