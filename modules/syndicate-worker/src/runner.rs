use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

/// Attempts per task per pass. The pass itself recurs, so anything still
/// failing after these gets another round next interval.
pub const MAX_ATTEMPTS: u32 = 5;

const BACKOFF_BASE: Duration = Duration::from_secs(10);
const BACKOFF_CAP: Duration = Duration::from_secs(15 * 60);

/// Backoff ceiling for the sleep after failed attempt `attempt` (0-based):
/// 10s, 20s, 40s, 80s, 160s, capped at 15 minutes.
pub fn backoff_ceiling(attempt: u32) -> Duration {
    BACKOFF_BASE
        .saturating_mul(2u32.saturating_pow(attempt))
        .min(BACKOFF_CAP)
}

/// Full jitter: sleep a uniform sample from `[0, ceiling)`. Sources that
/// failed together (platform outage) come back spread out.
pub fn jittered(ceiling: Duration) -> Duration {
    let millis = ceiling.as_millis().max(1) as u64;
    Duration::from_millis(rand::rng().random_range(0..millis))
}

/// Run a task with retries. Each attempt executes in its own spawned task so
/// a panic inside is contained and counted as an ordinary failed attempt.
/// Returns the last attempt's error message on exhaustion.
pub async fn run_with_retries<F, Fut, T>(label: &str, task: F) -> Result<T, String>
where
    F: Fn() -> Fut,
    Fut: Future<Output = syndicate_common::Result<T>> + Send + 'static,
    T: Send + 'static,
{
    let mut last_error = String::new();

    for attempt in 0..MAX_ATTEMPTS {
        match tokio::spawn(task()).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(err)) => last_error = err.to_string(),
            Err(join_err) if join_err.is_panic() => {
                last_error = format!("attempt panicked: {join_err}");
            }
            Err(join_err) => last_error = join_err.to_string(),
        }

        warn!(
            label,
            attempt = attempt + 1,
            max_attempts = MAX_ATTEMPTS,
            error = %last_error,
            "Sync attempt failed"
        );

        if attempt + 1 < MAX_ATTEMPTS {
            tokio::time::sleep(jittered(backoff_ceiling(attempt))).await;
        }
    }

    Err(last_error)
}
