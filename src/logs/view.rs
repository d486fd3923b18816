// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Fan a discovered pod stream into concurrent log tailers.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use k8s_openapi::api::core::v1::Pod;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::options::{TailOptions, TailOptionsError};
use super::sink::LogSink;
use super::tail::{LogStreamSource, LogTailer};
use crate::platform::resources;
use crate::watch::{ResourceIdentity, ResourceSource};

/// Tag attached to every line from a pod: `<revision> > <pod>` when the pod
/// belongs to a revision, the bare pod name otherwise (build pods).
fn pod_tag(pod: &Pod) -> String {
    let revision = pod
        .metadata
        .labels
        .as_ref()
        .and_then(|labels| labels.get(resources::REVISION_LABEL));
    match revision {
        Some(revision) => format!("{revision} > {}", pod.name()),
        None => pod.name().to_string(),
    }
}

/// Tails one fixed container across every pod a source discovers, joining
/// all tailers before returning.
pub struct LogAggregationView<S> {
    logs: Arc<S>,
    container: String,
    options: TailOptions,
    sink: Arc<dyn LogSink>,
}

impl<S: LogStreamSource> LogAggregationView<S> {
    pub fn new(
        logs: Arc<S>,
        container: impl Into<String>,
        options: TailOptions,
        sink: Arc<dyn LogSink>,
    ) -> Result<Self, TailOptionsError> {
        options.validate()?;
        Ok(Self {
            logs,
            container: container.into(),
            options,
            sink,
        })
    }

    /// Run the pod source, spawn one tailer per first-seen pod UID, and
    /// wait for every tailer to finish.
    ///
    /// In non-follow mode the pod source gets an already-cancelled token,
    /// so it only performs its snapshot listing and the bounded tailers
    /// terminate on their own.
    pub async fn show(
        &self,
        pods: Arc<dyn ResourceSource<Pod>>,
        cancel: CancellationToken,
    ) -> Result<()> {
        let source_cancel = if self.options.follow {
            cancel.clone()
        } else {
            crate::watch::cancel::cancelled_token()
        };

        let (pod_tx, mut pod_rx) = mpsc::channel::<Pod>(1);
        let source_task = {
            let pods = Arc::clone(&pods);
            tokio::spawn(async move {
                if let Err(error) = pods.run(pod_tx, source_cancel).await {
                    warn!(error = %error, "pod discovery ended with error");
                }
            })
        };

        let mut seen: HashSet<String> = HashSet::new();
        let mut tailers: JoinSet<()> = JoinSet::new();
        while let Some(pod) = pod_rx.recv().await {
            let Some(uid) = ResourceIdentity::uid(&pod).map(str::to_owned) else {
                continue;
            };
            if !seen.insert(uid) {
                // Re-listed after a reconnect; already tailing.
                continue;
            }

            let name = pod.name().to_string();
            let tailer = LogTailer::new(
                Arc::clone(&self.logs),
                name.clone(),
                self.container.clone(),
                pod_tag(&pod),
                self.options.clone(),
            )?;
            let sink = Arc::clone(&self.sink);
            let tail_cancel = cancel.clone();
            tailers.spawn(async move {
                if let Err(error) = tailer.tail(sink, tail_cancel).await {
                    warn!(pod = %name, error = %error, "log tail ended with error");
                }
            });
        }

        while tailers.join_next().await.is_some() {}
        let _ = source_task.await;
        Ok(())
    }
}
