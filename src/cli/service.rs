// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

use anyhow::Result;

use super::{OutputFormat, print_object, stream_logs, tail_options};
use crate::output::{Listing, format_age};
use crate::platform::resources::{self, REVISION_UID_LABEL, SERVICE_LABEL, USER_CONTAINER};
use crate::platform::{ApiFilters, PlatformClient};
use crate::watch::{ResourceIdentity, WatchTarget};

pub async fn list(client: &PlatformClient, format: &OutputFormat, no_headers: bool) -> Result<()> {
    let services = client
        .services()
        .list_filtered(client.namespace(), &ApiFilters::default())
        .await?;

    let mut listing = Listing::new(&["NAME", "LATEST REVISION", "READY", "AGE"]);
    for service in &services {
        listing.push_row(vec![
            service.name().to_string(),
            resources::latest_revision(service)
                .unwrap_or("<none>")
                .to_string(),
            resources::condition_status(service, "Ready")
                .unwrap_or("Unknown")
                .to_string(),
            format_age(service.metadata.creation_timestamp.as_ref()),
        ]);
    }
    println!("{}", listing.format(format, no_headers));
    Ok(())
}

pub async fn show(client: &PlatformClient, name: &str, format: &OutputFormat) -> Result<()> {
    let service = client.services().get(client.namespace(), name).await?;
    print_object(&service, format)
}

pub async fn delete(client: &PlatformClient, name: &str) -> Result<()> {
    client.services().delete(client.namespace(), name).await?;
    println!("Service '{name}' deleted");
    Ok(())
}

/// Aggregate logs across every revision of the service: one revision
/// watcher fans out to per-revision pod watchers, and every pod's
/// user container is tailed into stdout.
pub async fn logs(
    client: &PlatformClient,
    name: &str,
    follow: bool,
    lines: Option<i64>,
) -> Result<()> {
    let options = tail_options(follow, lines)?;
    let target = WatchTarget::new(
        "Revision",
        client.namespace(),
        ApiFilters::labels(format!("{SERVICE_LABEL}={name}")),
    );
    stream_logs(
        client,
        client.revisions(),
        target,
        REVISION_UID_LABEL,
        USER_CONTAINER,
        options,
    )
    .await
}
