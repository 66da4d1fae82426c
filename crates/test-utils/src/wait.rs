//! Async helpers for tests that observe background work.

use std::future::Future;
use std::time::Duration;

/// Poll `check` every 10 ms until it returns true or `timeout` elapses.
///
/// Returns whether the condition was met.
pub async fn eventually<F>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if check() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Await `future`, panicking if it does not finish within `timeout`.
pub async fn within<F: Future>(timeout: Duration, future: F) -> F::Output {
    match tokio::time::timeout(timeout, future).await {
        Ok(output) => output,
        Err(_) => panic!("future did not complete within {:?}", timeout),
    }
}
