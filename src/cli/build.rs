// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Build commands, including the create-and-watch flow: create the object,
//! block on each readiness transition, upload local source when asked, and
//! stream build logs until the execution pod reaches a terminal phase.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, bail};
use kube::api::{DynamicObject, ObjectMeta, TypeMeta};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{OutputFormat, print_object, stream_logs, tail_options};
use crate::build::readiness::{
    TerminalPhase, wait_builder_assigned, wait_init_container_running, wait_pod_assigned,
    wait_terminal_phase,
};
use crate::build::source::upload_source;
use crate::logs::{ConsoleSink, LogAggregationView, LogSink, TailOptions};
use crate::output::{Listing, format_age};
use crate::platform::resources::{
    self, BUILD_GROUP, BUILD_STEP_CONTAINER, BUILD_UID_LABEL, SOURCE_LOADER_CONTAINER, VERSION,
};
use crate::platform::{ApiFilters, PlatformClient};
use crate::ui::create_spinner;
use crate::watch::cancel::{cancel_after, cancel_on_interrupt};
use crate::watch::poll::PollOutcome;
use crate::watch::{CascadingWatcher, ResourceIdentity, WatchTarget};

pub async fn list(client: &PlatformClient, format: &OutputFormat, no_headers: bool) -> Result<()> {
    let builds = client
        .builds()
        .list_filtered(client.namespace(), &ApiFilters::default())
        .await?;

    let mut listing = Listing::new(&["NAME", "BUILDER", "SUCCEEDED", "AGE"]);
    for build in &builds {
        listing.push_row(vec![
            build.name().to_string(),
            resources::builder_name(build).unwrap_or("<none>").to_string(),
            resources::condition_status(build, "Succeeded")
                .unwrap_or("Unknown")
                .to_string(),
            format_age(build.metadata.creation_timestamp.as_ref()),
        ]);
    }
    println!("{}", listing.format(format, no_headers));
    Ok(())
}

pub async fn show(client: &PlatformClient, name: &str, format: &OutputFormat) -> Result<()> {
    let build = client.builds().get(client.namespace(), name).await?;
    print_object(&build, format)
}

pub async fn delete(client: &PlatformClient, name: &str) -> Result<()> {
    client.builds().delete(client.namespace(), name).await?;
    println!("Build '{name}' deleted");
    Ok(())
}

pub async fn logs(
    client: &PlatformClient,
    name: &str,
    follow: bool,
    lines: Option<i64>,
) -> Result<()> {
    let options = tail_options(follow, lines)?;
    let target = WatchTarget::new("Build", client.namespace(), ApiFilters::by_name(name));
    stream_logs(
        client,
        client.builds(),
        target,
        BUILD_UID_LABEL,
        BUILD_STEP_CONTAINER,
        options,
    )
    .await
}

fn build_manifest(name: &str, image: &str, with_source: bool) -> DynamicObject {
    let spec = if with_source {
        json!({ "image": image, "source": { "upload": {} } })
    } else {
        json!({ "image": image })
    };
    DynamicObject {
        types: Some(TypeMeta {
            api_version: format!("{BUILD_GROUP}/{VERSION}"),
            kind: "Build".to_string(),
        }),
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            ..Default::default()
        },
        data: json!({ "spec": spec }),
    }
}

/// Create a build, then observe it to completion.
///
/// Every wait below shares one cancellation token, fired by Ctrl-C or by
/// the `--wait-timeout` timer. A cancelled wait is an unknown outcome: the
/// command reports what it knows and stops without inventing a failure.
pub async fn create(
    client: &PlatformClient,
    name: &str,
    image: &str,
    source: Option<&Path>,
    wait_timeout: u64,
) -> Result<()> {
    let builds = client.builds();
    let namespace = client.namespace();

    builds
        .create(namespace, &build_manifest(name, image, source.is_some()))
        .await?;
    println!("Build '{name}' created");

    let cancel = CancellationToken::new();
    let _ = cancel_on_interrupt(&cancel);
    let _ = cancel_after(&cancel, Duration::from_secs(wait_timeout));

    // Stage 1: a builder takes the build.
    let spinner = create_spinner("Waiting for builder assignment...");
    let builder = wait_builder_assigned(|| builds.get(namespace, name), &cancel).await;
    spinner.finish_and_clear();
    let builder = match builder {
        PollOutcome::Satisfied(builder) => builder,
        PollOutcome::Cancelled(_) => {
            eprintln!("Gave up waiting for builder assignment; build outcome unknown");
            return Ok(());
        }
    };
    println!("Builder: {builder}");

    // Stage 2: the builder schedules the execution pod.
    let spinner = create_spinner("Waiting for the build pod...");
    let pod_ref = wait_pod_assigned(|| builds.get(namespace, name), &cancel).await;
    spinner.finish_and_clear();
    let pod_ref = match pod_ref {
        PollOutcome::Satisfied(pod_ref) => pod_ref,
        PollOutcome::Cancelled(_) => {
            eprintln!("Gave up waiting for the build pod; build outcome unknown");
            return Ok(());
        }
    };
    debug!(pod = %pod_ref.name, namespace = %pod_ref.namespace, "build pod assigned");

    // Stage 3 (upload builds only): the source-loader init container is
    // running and ready to receive the archive.
    if let Some(dir) = source {
        let pods = client.pods();
        let spinner = create_spinner("Waiting for the source loader...");
        let ready = wait_init_container_running(
            || pods.get(&pod_ref.namespace, &pod_ref.name),
            SOURCE_LOADER_CONTAINER,
            &cancel,
        )
        .await;
        spinner.finish_and_clear();
        if !ready.is_satisfied() {
            eprintln!("Gave up waiting for the source loader; build outcome unknown");
            return Ok(());
        }

        let exec = client.pod_exec_in(&pod_ref.namespace);
        upload_source(&exec, &pod_ref.name, dir).await?;
        println!("Source uploaded from {}", dir.display());
    }

    // Stage 4: stream build-step logs while waiting for the pod to reach a
    // terminal phase. The log view runs on a child token so finishing the
    // wait tears it down with everything else.
    let build_namespace = pod_ref.namespace.clone();
    let cascade = CascadingWatcher::new(
        Arc::new(client.builds()),
        WatchTarget::new("Build", namespace, ApiFilters::by_name(name)),
        Arc::new(client.pods()),
        move |build: &DynamicObject| {
            let uid = ResourceIdentity::uid(build)?;
            Some(WatchTarget::new(
                "Pod",
                build_namespace.clone(),
                ApiFilters::labels(format!("{BUILD_UID_LABEL}={uid}")),
            ))
        },
    );
    let view = LogAggregationView::new(
        Arc::new(client.pod_logs_in(&pod_ref.namespace)),
        BUILD_STEP_CONTAINER,
        TailOptions::follow(),
        Arc::new(ConsoleSink) as Arc<dyn LogSink>,
    )?;
    let view_cancel = cancel.child_token();
    let view_task = tokio::spawn(async move { view.show(Arc::new(cascade), view_cancel).await });

    let pods = client.pods();
    let phase = wait_terminal_phase(|| pods.get(&pod_ref.namespace, &pod_ref.name), &cancel).await;
    cancel.cancel();
    let _ = view_task.await;

    match phase {
        PollOutcome::Satisfied(TerminalPhase::Succeeded) => {
            debug!(build = name, "build pod succeeded");
        }
        PollOutcome::Satisfied(TerminalPhase::Failed) => {
            debug!(build = name, "build pod failed");
        }
        PollOutcome::Cancelled(_) => {
            eprintln!("Gave up waiting for the build to finish; build outcome unknown");
            return Ok(());
        }
    }

    // The build's own condition is the definitive verdict.
    let build = builds.get(namespace, name).await?;
    match resources::condition_status(&build, "Succeeded") {
        Some("True") => {
            println!("Build '{name}' succeeded");
            Ok(())
        }
        Some("False") => bail!("Build '{name}' failed"),
        _ => {
            eprintln!("Build '{name}' finished with an unknown outcome");
            Ok(())
        }
    }
}
