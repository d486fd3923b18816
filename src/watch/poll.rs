// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Fixed-interval readiness polling.
//!
//! The fetch/evaluate/sleep loop here never gives up on its own: callers
//! rely on that, and the only unsuccessful exit is external cancellation.

use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Delay between poll attempts. There is deliberately no attempt cap: poll
/// loops retry at this fixed cadence until the predicate holds or the
/// operation's cancellation token fires.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Result of a readiness poll.
#[derive(Debug)]
pub enum PollOutcome<T> {
    /// The predicate held for this resource.
    Satisfied(T),
    /// Cancelled before the predicate held; carries the most recently
    /// fetched resource, if any. An unknown outcome, not a failure.
    Cancelled(Option<T>),
}

impl<T> PollOutcome<T> {
    pub fn is_satisfied(&self) -> bool {
        matches!(self, PollOutcome::Satisfied(_))
    }
}

/// Fetch the resource, evaluate `predicate` against it, and return it as
/// soon as the predicate holds; otherwise sleep [`POLL_INTERVAL`] and retry.
///
/// Fetch errors are transient by policy: they are logged at debug level and
/// retried on the same cadence without affecting anything else. Each
/// iteration re-checks `cancel`, so one cancellation unblocks the loop
/// within a single tick.
pub async fn poll_until<T, F, Fut, P>(
    fetch: F,
    predicate: P,
    cancel: &CancellationToken,
) -> PollOutcome<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
    P: Fn(&T) -> bool,
{
    let mut latest: Option<T> = None;
    loop {
        if cancel.is_cancelled() {
            return PollOutcome::Cancelled(latest);
        }

        match fetch().await {
            Ok(resource) => {
                if predicate(&resource) {
                    return PollOutcome::Satisfied(resource);
                }
                latest = Some(resource);
            }
            Err(error) => {
                debug!(error = %error, "poll fetch failed, retrying");
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => return PollOutcome::Cancelled(latest),
            _ = tokio::time::sleep(POLL_INTERVAL) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    use anyhow::anyhow;

    use super::*;
    use crate::watch::cancel::cancel_after;

    #[tokio::test(start_paused = true)]
    async fn returns_when_predicate_holds() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let fetch_attempts = Arc::clone(&attempts);
        let outcome = poll_until(
            move || {
                let n = fetch_attempts.fetch_add(1, Ordering::SeqCst);
                async move { Ok(n) }
            },
            |n| *n >= 2,
            &CancellationToken::new(),
        )
        .await;

        match outcome {
            PollOutcome::Satisfied(n) => assert_eq!(n, 2),
            PollOutcome::Cancelled(_) => panic!("expected satisfied"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_poll_returns_latest_fetch() {
        let cancel = CancellationToken::new();
        let _ = cancel_after(&cancel, Duration::from_millis(100));

        let started = Instant::now();
        let outcome = poll_until(
            || async { Ok::<_, anyhow::Error>("pending-resource") },
            |_| false,
            &cancel,
        )
        .await;

        // One tick past the timer at most, and no error: the wait is an
        // unknown outcome carrying the last fetched state.
        assert!(started.elapsed() <= POLL_INTERVAL + Duration::from_millis(200));
        match outcome {
            PollOutcome::Cancelled(latest) => assert_eq!(latest, Some("pending-resource")),
            PollOutcome::Satisfied(_) => panic!("predicate never held"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_errors_are_retried_on_the_fixed_cadence() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let fetch_attempts = Arc::clone(&attempts);
        let outcome = poll_until(
            move || {
                let n = fetch_attempts.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 3 {
                        Err(anyhow!("transient"))
                    } else {
                        Ok(n)
                    }
                }
            },
            |n| *n >= 3,
            &CancellationToken::new(),
        )
        .await;

        assert!(outcome.is_satisfied());
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn already_cancelled_token_returns_without_fetching() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let outcome = poll_until(
            || async { Ok::<_, anyhow::Error>(1) },
            |_| true,
            &cancel,
        )
        .await;
        match outcome {
            PollOutcome::Cancelled(latest) => assert!(latest.is_none()),
            PollOutcome::Satisfied(_) => panic!("must not fetch after cancellation"),
        }
    }
}
