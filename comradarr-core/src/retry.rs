//! Bounded exponential-backoff wrapper for upstream calls (`spec.md` §4.B).

use std::future::Future;

use tracing::warn;

use crate::error::{UpstreamError, UpstreamErrorKind};
use crate::time::BackoffShape;

/// Wraps a single upstream call attempt in bounded exponential backoff.
///
/// A `RateLimit` error with `retry_after_seconds` set sleeps for exactly that
/// long; otherwise the delay follows [`BackoffShape::http_retry`].
/// Non-retryable errors propagate on the first attempt.
///
/// `max_attempts` counts the first try, so `max_attempts = 1` never retries.
pub async fn request_with_retry<T, F, Fut>(
    max_attempts: u32,
    mut attempt: F,
) -> Result<T, UpstreamError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, UpstreamError>>,
{
    let shape = BackoffShape::http_retry();
    let mut last_err = None;
    for n in 0..max_attempts {
        match attempt().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !err.retryable() || n + 1 == max_attempts {
                    return Err(err);
                }
                let delay_ms = match (err.kind, err.retry_after_seconds) {
                    (UpstreamErrorKind::RateLimit, Some(secs)) => secs.saturating_mul(1000),
                    _ => shape.delay_ms(n, &mut rand::rng()),
                };
                warn!(attempt = n, delay_ms, kind = ?err.kind, "retrying upstream call");
                tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
                last_err = Some(err);
            }
        }
    }
    // Unreachable in practice: the loop above always returns before falling through,
    // except when max_attempts == 0, in which case there was no attempt at all.
    Err(last_err.unwrap_or_else(|| UpstreamError::new(UpstreamErrorKind::Network, "no attempts made")))
}
