// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Local source upload into a build's init container.
//!
//! The build pod starts with a `source-loader` init container that blocks
//! on an archive arriving over exec stdin. Once the readiness watcher
//! confirms the container is running, the CLI streams a gzip'd tarball of
//! the source directory into `tar xzf -` inside it.

use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use flate2::Compression;
use flate2::write::GzEncoder;
use tracing::debug;

use crate::platform::resources::SOURCE_LOADER_CONTAINER;

/// Destination directory inside the init container.
const WORKSPACE_DIR: &str = "/workspace";

/// One-shot command execution inside a pod's container, with bytes piped
/// to stdin. Used only by the source-upload flow.
#[async_trait]
pub trait PodExec: Send + Sync {
    async fn exec_with_stdin(
        &self,
        pod: &str,
        container: &str,
        command: &[String],
        stdin: Vec<u8>,
    ) -> Result<()>;
}

/// Produce a gzip'd tar of the directory's contents (relative paths, the
/// directory itself is not a tar member).
pub fn archive_source(dir: &Path) -> Result<Vec<u8>> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut archive = tar::Builder::new(encoder);
    archive
        .append_dir_all(".", dir)
        .with_context(|| format!("Failed to archive source directory: {}", dir.display()))?;
    let encoder = archive.into_inner().context("Failed to finalize archive")?;
    let bytes = encoder.finish().context("Failed to compress archive")?;
    debug!(dir = %dir.display(), bytes = bytes.len(), "source archived");
    Ok(bytes)
}

/// Archive `dir` and extract it into the build pod's workspace.
pub async fn upload_source(exec: &dyn PodExec, pod: &str, dir: &Path) -> Result<()> {
    let archive = archive_source(dir)?;
    let command: Vec<String> = ["tar", "xzf", "-", "-C", WORKSPACE_DIR]
        .iter()
        .map(ToString::to_string)
        .collect();
    exec.exec_with_stdin(pod, SOURCE_LOADER_CONTAINER, &command, archive)
        .await
        .with_context(|| format!("Failed to upload source into pod {pod}"))
}
