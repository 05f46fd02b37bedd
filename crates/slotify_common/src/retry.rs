// --- File: crates/slotify_common/src/retry.rs ---
//! Retry with exponential backoff.
//!
//! A generic utility available to collaborators (outbound HTTP, token
//! refresh). It is deliberately NOT wired into the hot booking path: database
//! and classifier calls in the core run once and degrade on failure.

use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Retries an async operation with exponential backoff.
///
/// The delay doubles after each failed attempt, starting at `base_delay`.
/// The last error is returned once `max_retries` attempts are exhausted.
pub async fn retry_with_backoff<T, E, F, Fut>(
    mut operation: F,
    max_retries: u32,
    base_delay: Duration,
) -> Result<T, E>
where
    E: std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                attempt += 1;
                if attempt >= max_retries {
                    return Err(err);
                }
                let delay = base_delay * 2u32.saturating_pow(attempt - 1);
                warn!("Attempt {} failed, retrying in {:?}: {}", attempt, delay, err);
                tokio::time::sleep(delay).await;
            }
        }
    }
}
