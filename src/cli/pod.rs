// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

use anyhow::Result;

use super::OutputFormat;
use crate::output::{Listing, format_age};
use crate::platform::resources::{REVISION_LABEL, SERVICE_LABEL};
use crate::platform::{ApiFilters, PlatformClient};
use crate::watch::ResourceIdentity;

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
    let pods = client
        .pods()
        .list_filtered(client.namespace(), &filters)
        .await?;

    let mut listing = Listing::new(&["NAME", "REVISION", "PHASE", "AGE"]);
    for pod in &pods {
        let revision = pod
            .metadata
            .labels
            .as_ref()
            .and_then(|labels| labels.get(REVISION_LABEL))
            .map(String::as_str)
            .unwrap_or("<none>");
        let phase = pod
            .status
            .as_ref()
            .and_then(|status| status.phase.as_deref())
            .unwrap_or("Unknown");
        listing.push_row(vec![
            pod.name().to_string(),
            revision.to_string(),
            phase.to_string(),
            format_age(pod.metadata.creation_timestamp.as_ref()),
        ]);
    }
    println!("{}", listing.format(format, no_headers));
    Ok(())
}
