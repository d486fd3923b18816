// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Concrete implementations of the narrow interfaces the watch pipeline
//! consumes, backed by the Kubernetes API.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use k8s_openapi::api::core::v1::Pod;
use kube::api::{
    Api, ApiResource, AttachParams, DeleteParams, DynamicObject, ListParams, LogParams,
    PostParams, WatchEvent, WatchParams,
};
use kube::Client;
use tokio::io::AsyncWriteExt;
use tokio_util::compat::FuturesAsyncReadCompatExt;

use crate::build::PodExec;
use crate::logs::{LogByteStream, LogStreamSource, TailOptions};
use crate::platform::ApiFilters;
use crate::watch::{Change, ChangeStream, WatchApi, WatchTarget};

fn list_params(filters: &ApiFilters) -> ListParams {
    let mut params = ListParams::default();
    if let Some(ref labels) = filters.label_selector {
        params = params.labels(labels);
    }
    if let Some(ref fields) = filters.field_selector {
        params = params.fields(fields);
    }
    params
}

fn watch_params(filters: &ApiFilters) -> WatchParams {
    let mut params = WatchParams::default();
    if let Some(ref labels) = filters.label_selector {
        params = params.labels(labels);
    }
    if let Some(ref fields) = filters.field_selector {
        params = params.fields(fields);
    }
    params
}

/// Decode raw watch events into the tagged [`Change`] representation.
///
/// Bookmarks are dropped here; a 410 Gone is the server telling us the
/// subscription is over, surfaced as [`Change::Closed`].
fn decode_events<K>(
    events: impl Stream<Item = kube::Result<WatchEvent<K>>> + Send + 'static,
) -> ChangeStream<K>
where
    K: Send + 'static,
{
    events
        .filter_map(|event| async move {
            match event {
                Ok(WatchEvent::Added(obj)) => Some(Ok(Change::Added(obj))),
                Ok(WatchEvent::Modified(obj)) => Some(Ok(Change::Modified(obj))),
                Ok(WatchEvent::Deleted(obj)) => Some(Ok(Change::Deleted(obj))),
                Ok(WatchEvent::Bookmark(_)) => None,
                Ok(WatchEvent::Error(status)) if status.code == 410 => Some(Ok(Change::Closed)),
                Ok(WatchEvent::Error(status)) => Some(Err(anyhow!(
                    "watch error {}: {}",
                    status.code,
                    status.message
                ))),
                Err(error) => Some(Err(error.into())),
            }
        })
        .boxed()
}

/// Watch/list/CRUD access to one custom-resource collection.
pub struct CustomApi {
    client: Client,
    resource: ApiResource,
}

impl CustomApi {
    pub fn new(client: Client, resource: ApiResource) -> Self {
        Self { client, resource }
    }

    fn scoped(&self, namespace: &str) -> Api<DynamicObject> {
        Api::namespaced_with(self.client.clone(), namespace, &self.resource)
    }

    pub async fn get(&self, namespace: &str, name: &str) -> Result<DynamicObject> {
        self.scoped(namespace)
            .get(name)
            .await
            .with_context(|| format!("Failed to get {} '{name}'", self.resource.kind))
    }

    pub async fn create(&self, namespace: &str, object: &DynamicObject) -> Result<DynamicObject> {
        self.scoped(namespace)
            .create(&PostParams::default(), object)
            .await
            .with_context(|| format!("Failed to create {}", self.resource.kind))
    }

    pub async fn delete(&self, namespace: &str, name: &str) -> Result<()> {
        self.scoped(namespace)
            .delete(name, &DeleteParams::default())
            .await
            .with_context(|| format!("Failed to delete {} '{name}'", self.resource.kind))?;
        Ok(())
    }

    pub async fn list_filtered(
        &self,
        namespace: &str,
        filters: &ApiFilters,
    ) -> Result<Vec<DynamicObject>> {
        let list = self
            .scoped(namespace)
            .list(&list_params(filters))
            .await
            .with_context(|| format!("Failed to list {}", self.resource.kind))?;
        Ok(list.items)
    }
}

#[async_trait]
impl WatchApi for CustomApi {
    type Item = DynamicObject;

    async fn list(&self, target: &WatchTarget) -> Result<Vec<DynamicObject>> {
        self.list_filtered(&target.namespace, &target.filters).await
    }

    async fn watch(&self, target: &WatchTarget) -> Result<ChangeStream<DynamicObject>> {
        let events = self
            .scoped(&target.namespace)
            .watch(&watch_params(&target.filters), "0")
            .await
            .with_context(|| format!("Failed to watch {}", self.resource.kind))?;
        Ok(decode_events(events))
    }
}

/// Watch/list access to core pods.
pub struct PodApi {
    client: Client,
}

impl PodApi {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn scoped(&self, namespace: &str) -> Api<Pod> {
        Api::namespaced(self.client.clone(), namespace)
    }

    pub async fn get(&self, namespace: &str, name: &str) -> Result<Pod> {
        self.scoped(namespace)
            .get(name)
            .await
            .with_context(|| format!("Failed to get pod '{name}'"))
    }

    pub async fn list_filtered(&self, namespace: &str, filters: &ApiFilters) -> Result<Vec<Pod>> {
        let list = self
            .scoped(namespace)
            .list(&list_params(filters))
            .await
            .context("Failed to list pods")?;
        Ok(list.items)
    }
}

#[async_trait]
impl WatchApi for PodApi {
    type Item = Pod;

    async fn list(&self, target: &WatchTarget) -> Result<Vec<Pod>> {
        self.list_filtered(&target.namespace, &target.filters).await
    }

    async fn watch(&self, target: &WatchTarget) -> Result<ChangeStream<Pod>> {
        let events = self
            .scoped(&target.namespace)
            .watch(&watch_params(&target.filters), "0")
            .await
            .context("Failed to watch pods")?;
        Ok(decode_events(events))
    }
}

/// Container log streams for one namespace.
pub struct PodLogApi {
    client: Client,
    namespace: String,
}

impl PodLogApi {
    pub fn new(client: Client, namespace: impl Into<String>) -> Self {
        Self {
            client,
            namespace: namespace.into(),
        }
    }
}

#[async_trait]
impl LogStreamSource for PodLogApi {
    async fn open(
        &self,
        pod: &str,
        container: &str,
        options: &TailOptions,
    ) -> Result<LogByteStream> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), &self.namespace);
        let params = LogParams {
            container: Some(container.to_string()),
            follow: options.follow,
            tail_lines: options.lines,
            ..Default::default()
        };
        let stream = api
            .log_stream(pod, &params)
            .await
            .with_context(|| format!("Failed to open log stream for pod '{pod}'"))?;
        Ok(Box::pin(stream.compat()) as LogByteStream)
    }
}

/// One-shot exec into a pod's container with stdin piping.
pub struct PodExecApi {
    client: Client,
    namespace: String,
}

impl PodExecApi {
    pub fn new(client: Client, namespace: impl Into<String>) -> Self {
        Self {
            client,
            namespace: namespace.into(),
        }
    }
}

#[async_trait]
impl PodExec for PodExecApi {
    async fn exec_with_stdin(
        &self,
        pod: &str,
        container: &str,
        command: &[String],
        stdin: Vec<u8>,
    ) -> Result<()> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), &self.namespace);
        let params = AttachParams::default().container(container).stdin(true);
        let mut process = api
            .exec(pod, command.to_vec(), &params)
            .await
            .with_context(|| format!("Failed to exec into pod '{pod}'"))?;

        let mut writer = process
            .stdin()
            .ok_or_else(|| anyhow!("exec stdin was not attached"))?;
        writer
            .write_all(&stdin)
            .await
            .context("Failed to stream archive over exec stdin")?;
        writer.shutdown().await.context("Failed to close exec stdin")?;
        drop(writer);

        process.join().await.context("exec did not complete")?;
        Ok(())
    }
}
