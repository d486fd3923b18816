// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

use anyhow::Result;

use super::{OutputFormat, print_object, stream_logs, tail_options};
use crate::output::{Listing, format_age};
use crate::platform::resources::{self, REVISION_UID_LABEL, SERVICE_LABEL, USER_CONTAINER};
use crate::platform::{ApiFilters, PlatformClient};
use crate::watch::{ResourceIdentity, WatchTarget};

pub async fn list(
    client: &PlatformClient,
    service: Option<&str>,
    format: &OutputFormat,
    no_headers: bool,
) -> Result<()> {
    let filters = match service {
        Some(service) => ApiFilters::labels(format!("{SERVICE_LABEL}={service}")),
        None => ApiFilters::default(),
    };
    let revisions = client
        .revisions()
        .list_filtered(client.namespace(), &filters)
        .await?;

    let mut listing = Listing::new(&["NAME", "SERVICE", "READY", "AGE"]);
    for revision in &revisions {
        let service = revision
            .metadata
            .labels
            .as_ref()
            .and_then(|labels| labels.get(SERVICE_LABEL))
            .map(String::as_str)
            .unwrap_or("<none>");
        listing.push_row(vec![
            revision.name().to_string(),
            service.to_string(),
            resources::condition_status(revision, "Ready")
                .unwrap_or("Unknown")
                .to_string(),
            format_age(revision.metadata.creation_timestamp.as_ref()),
        ]);
    }
    println!("{}", listing.format(format, no_headers));
    Ok(())
}

pub async fn show(client: &PlatformClient, name: &str, format: &OutputFormat) -> Result<()> {
    let revision = client.revisions().get(client.namespace(), name).await?;
    print_object(&revision, format)
}

pub async fn delete(client: &PlatformClient, name: &str) -> Result<()> {
    client.revisions().delete(client.namespace(), name).await?;
    println!("Revision '{name}' deleted");
    Ok(())
}

/// Same cascade as service logs, with the parent watch narrowed to a single
/// revision by name.
pub async fn logs(
    client: &PlatformClient,
    name: &str,
    follow: bool,
    lines: Option<i64>,
) -> Result<()> {
    let options = tail_options(follow, lines)?;
    let target = WatchTarget::new("Revision", client.namespace(), ApiFilters::by_name(name));
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
