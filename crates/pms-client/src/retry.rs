//! Backoff for transport failures.
//!
//! Only failures to get any response are retried. Every HTTP response,
//! 4xx and 5xx included, goes back to the caller unchanged, since the
//! harness asserts on status codes.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Delays before each retry; the request is attempted once more than this.
pub(crate) const BACKOFF: [Duration; 3] = [
    Duration::from_millis(200),
    Duration::from_millis(400),
    Duration::from_millis(800),
];

/// Run `attempt` until it succeeds or the backoff schedule is used up,
/// returning the last error in that case.
pub(crate) async fn with_backoff<T, E, F, Fut>(endpoint: &str, attempt: F) -> Result<T, E>
where
    E: Display,
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut delays = BACKOFF.iter();
    loop {
        let err = match attempt().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        let Some(delay) = delays.next() else {
            tracing::warn!(endpoint, %err, "PMS API unreachable, giving up");
            return Err(err);
        };
        tracing::debug!(endpoint, %err, ?delay, "PMS API request failed, backing off");
        tokio::time::sleep(*delay).await;
    }
}
