//! Retry with exponential back-off and jitter for the pickups client.
//!
//! [`retry_with_backoff`] wraps any fallible async operation and retries on
//! transient errors (network failures, 429, 5xx). Non-transient errors are
//! returned immediately; retrying a malformed response or an application-level
//! rejection cannot change the outcome.

use std::future::Future;
use std::time::Duration;

use crate::error::RezdyError;

/// Returns `true` for errors that are worth retrying after a back-off delay.
///
/// **Retriable:**
/// - [`RezdyError::RateLimited`]: the server asked us to back off.
/// - [`RezdyError::Http`]: network-level failure (timeout, connection reset).
/// - [`RezdyError::UnexpectedStatus`] with a 5xx status.
///
/// **Not retriable:**
/// - [`RezdyError::Api`]: application-level rejection; retrying won't fix it.
/// - [`RezdyError::Deserialize`]: malformed response; retrying won't fix it.
/// - [`RezdyError::UnexpectedStatus`] with a 4xx status.
pub(crate) fn is_retriable(err: &RezdyError) -> bool {
    match err {
        RezdyError::Http(e) => {
            e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
        }
        RezdyError::RateLimited { .. } => true,
        RezdyError::UnexpectedStatus { status, .. } => *status >= 500,
        RezdyError::Api(_) | RezdyError::Deserialize { .. } => false,
    }
}

/// Runs `operation` with up to `max_retries` additional attempts on transient errors.
///
/// Back-off schedule with `backoff_base_ms = 500`:
///
/// | Attempt | Sleep before next attempt    |
/// |---------|------------------------------|
/// | 1       | 500 ms × 2⁰ ± 25 % jitter   |
/// | 2       | 500 ms × 2¹ ± 25 % jitter   |
/// | 3       | 500 ms × 2² ± 25 % jitter   |
///
/// Delay is capped at 60 s. A server-provided `Retry-After` on a 429 takes
/// precedence over the computed delay when it is longer. Non-retriable errors
/// are returned immediately.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_ms: u64,
    mut operation: F,
) -> Result<T, RezdyError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RezdyError>>,
{
    const MAX_DELAY_MS: u64 = 60_000;
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= max_retries {
                    return Err(err);
                }
                attempt += 1;
                let computed = backoff_base_ms.saturating_mul(1u64 << (attempt - 1).min(10));
                let capped = computed.min(MAX_DELAY_MS);
                #[allow(
                    clippy::cast_possible_truncation,
                    clippy::cast_sign_loss,
                    clippy::cast_precision_loss
                )]
                let mut delay_ms = (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
                if let RezdyError::RateLimited { retry_after_secs } = &err {
                    delay_ms = delay_ms.max(retry_after_secs.saturating_mul(1000).min(MAX_DELAY_MS));
                }
                tracing::warn!(
                    attempt,
                    max_retries,
                    delay_ms,
                    error = %err,
                    "transient upstream error, retrying after back-off"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}
