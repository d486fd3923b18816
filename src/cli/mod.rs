mod args;
pub mod build;
pub mod pod;
pub mod revision;
pub mod service;

pub use args::{
    Args, BuildCommand, Command, ConfigCommand, OutputFormat, PodCommand, RevisionCommand,
    ServiceCommand,
};

use std::sync::Arc;

use anyhow::Result;
use kube::api::DynamicObject;
use tokio_util::sync::CancellationToken;

use crate::logs::{ConsoleSink, LogAggregationView, LogSink, TailOptions};
use crate::platform::{ApiFilters, CustomApi, PlatformClient};
use crate::watch::cancel::cancel_on_interrupt;
use crate::watch::{CascadingWatcher, ResourceIdentity, WatchTarget};

/// Trailing lines per container when `--lines` is not given in non-follow
/// mode.
const DEFAULT_TAIL_LINES: i64 = 50;

pub(crate) fn tail_options(follow: bool, lines: Option<i64>) -> Result<TailOptions> {
    if follow {
        Ok(TailOptions::follow())
    } else {
        Ok(TailOptions::fixed(lines.unwrap_or(DEFAULT_TAIL_LINES))?)
    }
}

/// Shared logs flow: watch a parent collection, fan out to pods labeled
/// with each parent's UID, and aggregate the chosen container's logs.
pub(crate) async fn stream_logs(
    client: &PlatformClient,
    parent_api: CustomApi,
    parent_target: WatchTarget,
    pod_uid_label: &'static str,
    container: &'static str,
    options: TailOptions,
) -> Result<()> {
    let namespace = client.namespace().to_string();

    let cancel = CancellationToken::new();
    if options.follow {
        let _ = cancel_on_interrupt(&cancel);
    }

    let child_namespace = namespace.clone();
    let cascade = CascadingWatcher::new(
        Arc::new(parent_api),
        parent_target,
        Arc::new(client.pods()),
        move |parent: &DynamicObject| {
            let uid = ResourceIdentity::uid(parent)?;
            Some(WatchTarget::new(
                "Pod",
                child_namespace.clone(),
                ApiFilters::labels(format!("{pod_uid_label}={uid}")),
            ))
        },
    );

    let view = LogAggregationView::new(
        Arc::new(client.pod_logs()),
        container,
        options,
        Arc::new(ConsoleSink) as Arc<dyn LogSink>,
    )?;
    view.show(Arc::new(cascade), cancel).await
}

/// Print one object in full, honoring `-o json`; everything else renders
/// as YAML.
pub(crate) fn print_object(object: &DynamicObject, format: &OutputFormat) -> Result<()> {
    let rendered = match format {
        OutputFormat::Json => serde_json::to_string_pretty(object)?,
        OutputFormat::Table | OutputFormat::Yaml => serde_yaml::to_string(object)?,
    };
    println!("{rendered}");
    Ok(())
}
