//! Generic retry helper.
//!
//! A plain async function over policy parameters — no builder, no trait
//! objects, just a closure and two numbers.

use std::future::Future;
use std::time::Duration;

/// Calls `f` up to `try_count` times (at least 1), sleeping `interval`
/// between attempts, until it returns `Ok`. Returns the last error if every
/// attempt fails.
pub async fn do_with_retry<T, E, F, Fut>(
    mut f: F,
    interval: Duration,
    try_count: u32,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let attempts = try_count.max(1);
    let mut last_err = None;
    for attempt in 0..attempts {
        match f().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                last_err = Some(err);
                if attempt + 1 < attempts {
                    tokio::time::sleep(interval).await;
                }
            }
        }
    }
    Err(last_err.expect("loop runs at least once"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn succeeds_on_first_try() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, &str> = do_with_retry(
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(42) }
            },
            Duration::from_millis(1),
            3,
        )
        .await;
        assert_eq!(result, Ok(42));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhausts_try_count_then_returns_last_error() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, &str> = do_with_retry(
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err("nope") }
            },
            Duration::from_millis(1),
            3,
        )
        .await;
        assert_eq!(result, Err("nope"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
