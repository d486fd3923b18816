// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Two-level parent/child watch composition with de-duplicated fan-in.
//!
//! One parent watcher discovers a changing set of parent resources; each
//! first-seen parent spawns a child watcher scoped to it (pods labeled with
//! the parent's UID). All child streams merge into a single consumer-facing
//! channel that delivers each child UID at most once per session.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::watcher::{ResourceWatcher, WatchApi, WatchTarget};
use super::{ResourceIdentity, ResourceSource};

/// Computes the child watch target for a discovered parent. Returning `None`
/// skips the parent (e.g., when it carries no usable identity).
pub type ChildTargetFn<P> = dyn Fn(&P) -> Option<WatchTarget> + Send + Sync;

pub struct CascadingWatcher<P: WatchApi, C: WatchApi> {
    parent_api: Arc<P>,
    parent_target: WatchTarget,
    child_api: Arc<C>,
    child_target: Box<ChildTargetFn<P::Item>>,
}

impl<P: WatchApi, C: WatchApi> CascadingWatcher<P, C> {
    pub fn new(
        parent_api: Arc<P>,
        parent_target: WatchTarget,
        child_api: Arc<C>,
        child_target: impl Fn(&P::Item) -> Option<WatchTarget> + Send + Sync + 'static,
    ) -> Self {
        Self {
            parent_api,
            parent_target,
            child_api,
            child_target: Box::new(child_target),
        }
    }

    /// Run the cascade until the parent watch finishes and every spawned
    /// child watcher has returned. `output` delivers each child UID at most
    /// once; it is closed only after the last child is done, so observing
    /// closure means no further items.
    ///
    /// `cancel` reaches every level unmodified: the parent watcher, each
    /// child watcher, and the fan-in stage all stop cooperatively. Errors
    /// inside spawned watchers are logged and do not abort their siblings.
    pub async fn run(
        &self,
        output: mpsc::Sender<C::Item>,
        cancel: CancellationToken,
    ) -> Result<()> {
        let (parent_tx, mut parent_rx) = mpsc::channel::<P::Item>(1);
        let (child_tx, mut child_rx) = mpsc::channel::<C::Item>(1);

        let parent_watcher =
            ResourceWatcher::new(Arc::clone(&self.parent_api), self.parent_target.clone());
        let parent_kind = self.parent_target.kind;
        let parent_task = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                if let Err(error) = parent_watcher.run(parent_tx, cancel).await {
                    warn!(kind = parent_kind, error = %error, "parent watch ended with error");
                }
            })
        };

        // Fan-in: first sighting of a UID wins. Guards against the same
        // child surfacing through more than one parent-scoped watch.
        let fan_in = tokio::spawn(async move {
            let mut seen: HashSet<String> = HashSet::new();
            while let Some(item) = child_rx.recv().await {
                let Some(uid) = item.uid().map(str::to_owned) else {
                    continue;
                };
                if !seen.insert(uid) {
                    continue;
                }
                if output.send(item).await.is_err() {
                    break;
                }
            }
        });

        // Fan-out loop. It is the sole owner of the started-set, so no
        // synchronization is needed: parents re-observed via list+watch
        // overlap are skipped here.
        let mut started: HashSet<String> = HashSet::new();
        let mut children: JoinSet<()> = JoinSet::new();
        while let Some(parent) = parent_rx.recv().await {
            let Some(uid) = parent.uid().map(str::to_owned) else {
                debug!(kind = parent_kind, name = parent.name(), "parent without uid, skipping");
                continue;
            };
            if started.contains(&uid) {
                continue;
            }
            let Some(target) = (self.child_target)(&parent) else {
                continue;
            };
            started.insert(uid);

            let watcher = ResourceWatcher::new(Arc::clone(&self.child_api), target);
            let tx = child_tx.clone();
            let child_cancel = cancel.clone();
            let parent_name = parent.name().to_string();
            children.spawn(async move {
                if let Err(error) = watcher.run(tx, child_cancel).await {
                    warn!(parent = %parent_name, error = %error, "child watch ended with error");
                }
            });
        }

        // Parent watch is done; wait for in-flight children, then close the
        // shared channel. This is the fan-in completion signal.
        while children.join_next().await.is_some() {}
        drop(child_tx);

        let _ = parent_task.await;
        let _ = fan_in.await;
        Ok(())
    }
}

#[async_trait]
impl<P: WatchApi, C: WatchApi> ResourceSource<C::Item> for CascadingWatcher<P, C> {
    async fn run(&self, output: mpsc::Sender<C::Item>, cancel: CancellationToken) -> Result<()> {
        CascadingWatcher::run(self, output, cancel).await
    }
}
