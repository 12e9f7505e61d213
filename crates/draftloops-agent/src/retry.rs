use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::warn;

/// Execute an async operation with bounded exponential backoff.
///
/// Makes `max_retries + 1` attempts; waits `base_delay * 2^attempt` after
/// each failure. Both agent roles route their completion calls through this
/// one utility, parameterized by their own budgets.
pub async fn with_retry<F, Fut, T, E>(
    max_retries: u32,
    base_delay: Duration,
    op: F,
) -> Result<T, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < max_retries => {
                let delay = base_delay * 2u32.pow(attempt);
                warn!(
                    attempt = attempt + 1,
                    error = %e,
                    "Attempt failed, retrying in {:?}",
                    delay
                );
                sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
