//! Shared poll-until primitive.
//!
//! Both polling stages of the run coordinator (draining a busy thread and
//! waiting for run completion) use this single loop with their own
//! interval and deadline, instead of ad hoc loops per call site.

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Result of one poll attempt.
pub enum Poll<T> {
    Ready(T),
    Pending,
}

/// Repeatedly invoke `attempt` every `interval` until it yields
/// [`Poll::Ready`] or `deadline` elapses.
///
/// The first attempt runs immediately. Returns `Ok(None)` when the
/// deadline elapses without a ready result; errors from the attempt
/// propagate as-is.
pub async fn poll_until<T, E, F, Fut>(
    interval: Duration,
    deadline: Duration,
    mut attempt: F,
) -> Result<Option<T>, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Poll<T>, E>>,
{
    let cutoff = Instant::now() + deadline;
    loop {
        if let Poll::Ready(value) = attempt().await? {
            return Ok(Some(value));
        }
        if Instant::now() + interval > cutoff {
            return Ok(None);
        }
        tokio::time::sleep(interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn returns_on_first_ready_attempt() {
        let result: Result<Option<u32>, Infallible> =
            poll_until(Duration::from_secs(1), Duration::from_secs(30), || async {
                Ok(Poll::Ready(7))
            })
            .await;
        assert_eq!(result.unwrap(), Some(7));
    }

    #[tokio::test(start_paused = true)]
    async fn polls_until_ready() {
        let calls = AtomicU32::new(0);
        let result: Result<Option<u32>, Infallible> =
            poll_until(Duration::from_secs(1), Duration::from_secs(30), || async {
                if calls.fetch_add(1, Ordering::SeqCst) < 3 {
                    Ok(Poll::Pending)
                } else {
                    Ok(Poll::Ready(calls.load(Ordering::SeqCst)))
                }
            })
            .await;
        assert_eq!(result.unwrap(), Some(4));
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_at_the_deadline() {
        let calls = AtomicU32::new(0);
        let result: Result<Option<u32>, Infallible> =
            poll_until(Duration::from_secs(1), Duration::from_secs(5), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(Poll::Pending)
            })
            .await;
        assert_eq!(result.unwrap(), None);
        // Attempts at t=0..=5, never past the deadline.
        assert!(calls.load(Ordering::SeqCst) <= 6);
    }

    #[tokio::test(start_paused = true)]
    async fn propagates_attempt_errors() {
        let result: Result<Option<u32>, &str> =
            poll_until(Duration::from_secs(1), Duration::from_secs(30), || async {
                Err("engine down")
            })
            .await;
        assert_eq!(result.unwrap_err(), "engine down");
    }
}
