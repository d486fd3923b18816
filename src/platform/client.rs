// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use tracing::info;

use super::api::{CustomApi, PodApi, PodExecApi, PodLogApi};
use super::resources;

/// Timeout for connecting to the cluster API
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection to one cluster context, handing out the per-resource API
/// handles the commands and the watch pipeline consume.
pub struct PlatformClient {
    client: Client,
    context: String,
    namespace: String,
}

impl PlatformClient {
    /// Connect using the kubeconfig's current context, or an explicit one.
    pub async fn connect(context: Option<&str>, namespace: &str) -> Result<Self> {
        let kubeconfig = Kubeconfig::read().context("Failed to read kubeconfig")?;

        let context_name = context
            .map(String::from)
            .or_else(|| kubeconfig.current_context.clone())
            .ok_or_else(|| anyhow!("No context specified and no current context in kubeconfig"))?;

        if !kubeconfig.contexts.iter().any(|c| c.name == context_name) {
            return Err(anyhow!(
                "Context '{}' not found in kubeconfig",
                context_name
            ));
        }

        let mut config = Config::from_custom_kubeconfig(
            kubeconfig,
            &KubeConfigOptions {
                context: Some(context_name.clone()),
                ..Default::default()
            },
        )
        .await
        .with_context(|| format!("Failed to load kubeconfig for context '{}'", context_name))?;

        // Connect timeout only. Follow-mode watches and log streams are
        // long-lived, so a read timeout would sever them mid-session.
        config.connect_timeout = Some(CONNECT_TIMEOUT);

        let client = Client::try_from(config)
            .with_context(|| format!("Failed to create client for context '{}'", context_name))?;

        info!(context = %context_name, namespace = %namespace, "connected");

        Ok(Self {
            client,
            context: context_name,
            namespace: namespace.to_string(),
        })
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn services(&self) -> CustomApi {
        CustomApi::new(self.client.clone(), resources::service_resource())
    }

    pub fn revisions(&self) -> CustomApi {
        CustomApi::new(self.client.clone(), resources::revision_resource())
    }

    pub fn builds(&self) -> CustomApi {
        CustomApi::new(self.client.clone(), resources::build_resource())
    }

    pub fn pods(&self) -> PodApi {
        PodApi::new(self.client.clone())
    }

    /// Log streams in the client's default namespace.
    pub fn pod_logs(&self) -> PodLogApi {
        self.pod_logs_in(&self.namespace)
    }

    /// Log streams in an explicit namespace (build pods may live elsewhere).
    pub fn pod_logs_in(&self, namespace: &str) -> PodLogApi {
        PodLogApi::new(self.client.clone(), namespace)
    }

    pub fn pod_exec_in(&self, namespace: &str) -> PodExecApi {
        PodExecApi::new(self.client.clone(), namespace)
    }
}
