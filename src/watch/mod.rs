// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Resource discovery pipeline: list+watch primitives, parent/child fan-out
//! with de-duplicated fan-in, and fixed-interval readiness polling.
//!
//! Everything in this module is coordinated through channels and joined task
//! sets; cancellation flows through a single [`CancellationToken`] per
//! logical operation.
//!
//! [`CancellationToken`]: tokio_util::sync::CancellationToken

pub mod cancel;
pub mod cascade;
pub mod event;
pub mod poll;
pub mod watcher;

pub use cascade::CascadingWatcher;
pub use event::{Change, ChangeStream};
pub use poll::{PollOutcome, poll_until};
pub use watcher::{ResourceWatcher, WatchApi, WatchTarget};

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Stable identity and naming for watched resources.
///
/// The UID is the de-duplication key: fan-in stages deliver each UID to the
/// consumer at most once per session.
pub trait ResourceIdentity {
    fn uid(&self) -> Option<&str>;
    fn name(&self) -> &str;
}

/// A producer of discovered resources.
///
/// Implementors write items into `output` until they are done or cancelled,
/// then return; the caller observes completion by the channel closing once
/// every sender is dropped. Both [`ResourceWatcher`] and [`CascadingWatcher`]
/// satisfy this contract.
#[async_trait]
pub trait ResourceSource<T>: Send + Sync {
    async fn run(&self, output: mpsc::Sender<T>, cancel: CancellationToken) -> Result<()>;
}
