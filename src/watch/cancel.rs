// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Cancellation helpers.
//!
//! One [`CancellationToken`] is created per logical operation (one `logs -f`
//! invocation, one build observation) and shared by every nested watcher,
//! tailer, and poller. The token type makes cancellation idempotent; there
//! is no close-twice failure mode.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// A token that is already cancelled.
///
/// Handing this to a watcher turns it into a snapshot-only lister: it emits
/// the list-time items and returns without entering the event loop.
pub fn cancelled_token() -> CancellationToken {
    let token = CancellationToken::new();
    token.cancel();
    token
}

/// Cancel `token` once `timeout` elapses, unless it is cancelled first.
///
/// This is the only timeout mechanism in the watch pipeline: bounded waits
/// are expressed as a timer that fires the shared token.
pub fn cancel_after(token: &CancellationToken, timeout: Duration) -> JoinHandle<()> {
    let token = token.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = token.cancelled() => {}
            _ = tokio::time::sleep(timeout) => {
                debug!(timeout = ?timeout, "wait deadline reached, cancelling");
                token.cancel();
            }
        }
    })
}

/// Cancel `token` when the process receives an interrupt (Ctrl-C).
pub fn cancel_on_interrupt(token: &CancellationToken) -> JoinHandle<()> {
    let token = token.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = token.cancelled() => {}
            signal = tokio::signal::ctrl_c() => {
                if signal.is_ok() {
                    token.cancel();
                }
            }
        }
    })
}
