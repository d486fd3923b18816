// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Generic list+watch primitive over one resource collection.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::event::{Change, ChangeStream};
use super::{ResourceIdentity, ResourceSource};
use crate::platform::ApiFilters;

/// What a watcher observes: one resource collection in one namespace,
/// narrowed by a selector. Immutable once the watcher is constructed.
#[derive(Debug, Clone)]
pub struct WatchTarget {
    /// Resource kind, for diagnostics only.
    pub kind: &'static str,
    pub namespace: String,
    pub filters: ApiFilters,
}

impl WatchTarget {
    pub fn new(kind: &'static str, namespace: impl Into<String>, filters: ApiFilters) -> Self {
        Self {
            kind,
            namespace: namespace.into(),
            filters,
        }
    }
}

/// The narrow resource-API surface the watch pipeline consumes.
///
/// Implementations wrap a concrete client (or a test double); the pipeline
/// is agnostic to the wire format behind it.
#[async_trait]
pub trait WatchApi: Send + Sync + 'static {
    type Item: ResourceIdentity + Clone + Send + Sync + 'static;

    /// One-shot listing of every item matching the target.
    async fn list(&self, target: &WatchTarget) -> Result<Vec<Self::Item>>;

    /// Open a change subscription for the target.
    async fn watch(&self, target: &WatchTarget) -> Result<ChangeStream<Self::Item>>;
}

/// List-then-watch over a single collection.
///
/// The subscription is opened *before* the list call so that items created
/// in between still arrive as `Added` events. Only `Added` events are
/// forwarded after the initial list; `Modified` and `Deleted` are received
/// and discarded — consumers that care about state transitions re-fetch
/// explicitly through the polling watchers.
pub struct ResourceWatcher<A: WatchApi> {
    api: Arc<A>,
    target: WatchTarget,
}

impl<A: WatchApi> ResourceWatcher<A> {
    pub fn new(api: Arc<A>, target: WatchTarget) -> Self {
        Self { api, target }
    }

    /// Emit every item present at list time plus every subsequently added
    /// item, each exactly once, until the stream ends or `cancel` fires.
    ///
    /// A `cancel` that is already cancelled short-circuits after the initial
    /// list (snapshot-only mode). Stream errors propagate to the caller; no
    /// retry happens here.
    pub async fn run(
        &self,
        output: mpsc::Sender<A::Item>,
        cancel: CancellationToken,
    ) -> Result<()> {
        // Subscribe first to close the list/subscribe race window.
        let mut events = self.api.watch(&self.target).await?;
        let initial = self.api.list(&self.target).await?;

        debug!(
            kind = self.target.kind,
            namespace = %self.target.namespace,
            listed = initial.len(),
            "watch started"
        );

        for item in initial {
            if output.send(item).await.is_err() {
                // Consumer went away; nothing left to do.
                return Ok(());
            }
        }

        if cancel.is_cancelled() {
            return Ok(());
        }

        loop {
            tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                event = events.next() => match event {
                    Some(Ok(Change::Added(item))) => {
                        if output.send(item).await.is_err() {
                            return Ok(());
                        }
                    }
                    // Added-only pipeline: state transitions on known items
                    // are not propagated.
                    Some(Ok(Change::Modified(_) | Change::Deleted(_))) => {}
                    Some(Ok(Change::Closed)) | None => {
                        debug!(kind = self.target.kind, "watch stream closed by server");
                        return Ok(());
                    }
                    Some(Err(error)) => return Err(error),
                },
            }
        }
    }
}

#[async_trait]
impl<A: WatchApi> ResourceSource<A::Item> for ResourceWatcher<A> {
    async fn run(&self, output: mpsc::Sender<A::Item>, cancel: CancellationToken) -> Result<()> {
        ResourceWatcher::run(self, output, cancel).await
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted in-memory implementation of [`WatchApi`] shared by the
    //! watcher, cascade, and log-view tests.

    use std::collections::HashMap;
    use std::sync::Mutex;

    use anyhow::anyhow;
    use futures::stream;

    use super::*;

    /// Minimal watched item: a (uid, name) pair.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct FakeItem {
        pub uid: String,
        pub name: String,
    }

    impl FakeItem {
        pub fn new(uid: &str, name: &str) -> Self {
            Self {
                uid: uid.to_string(),
                name: name.to_string(),
            }
        }
    }

    impl ResourceIdentity for FakeItem {
        fn uid(&self) -> Option<&str> {
            Some(&self.uid)
        }

        fn name(&self) -> &str {
            &self.name
        }
    }

    /// One scripted feed: the initial list plus the change sequence the
    /// watch subscription will replay. An empty script keeps the stream
    /// open (pending) until cancellation.
    #[derive(Default)]
    pub struct Feed {
        pub initial: Vec<FakeItem>,
        pub changes: Vec<Change<FakeItem>>,
        /// Keep the stream open after the scripted changes instead of
        /// ending it, mimicking a live follow-mode subscription.
        pub stay_open: bool,
    }

    /// Scripted [`WatchApi`]: feeds are keyed by the target's label or
    /// field selector so a cascade can route parent and child watches to
    /// different scripts.
    #[derive(Default)]
    pub struct ScriptedApi {
        feeds: Mutex<HashMap<String, Feed>>,
        watches_opened: Mutex<Vec<String>>,
    }

    impl ScriptedApi {
        pub fn with_feed(self, key: &str, feed: Feed) -> Self {
            self.feeds.lock().unwrap().insert(key.to_string(), feed);
            self
        }

        /// Selector keys for which a watch subscription was opened, in
        /// order. Each child watcher opens exactly one.
        pub fn watches_opened(&self) -> Vec<String> {
            self.watches_opened.lock().unwrap().clone()
        }

        fn key_of(target: &WatchTarget) -> String {
            target
                .filters
                .label_selector
                .clone()
                .or_else(|| target.filters.field_selector.clone())
                .unwrap_or_default()
        }
    }

    #[async_trait]
    impl WatchApi for ScriptedApi {
        type Item = FakeItem;

        async fn list(&self, target: &WatchTarget) -> Result<Vec<FakeItem>> {
            let feeds = self.feeds.lock().unwrap();
            let feed = feeds
                .get(&Self::key_of(target))
                .ok_or_else(|| anyhow!("no feed for {:?}", target.filters))?;
            Ok(feed.initial.clone())
        }

        async fn watch(&self, target: &WatchTarget) -> Result<ChangeStream<FakeItem>> {
            let key = Self::key_of(target);
            self.watches_opened.lock().unwrap().push(key.clone());
            let feeds = self.feeds.lock().unwrap();
            let feed = feeds
                .get(&key)
                .ok_or_else(|| anyhow!("no feed for {:?}", target.filters))?;
            let scripted = stream::iter(feed.changes.clone().into_iter().map(Ok));
            if feed.stay_open {
                Ok(scripted.chain(stream::pending()).boxed())
            } else {
                Ok(scripted.boxed())
            }
        }
    }

    pub fn target_with_labels(selector: &str) -> WatchTarget {
        WatchTarget::new("Fake", "default", ApiFilters::labels(selector))
    }
}
