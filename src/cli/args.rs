// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "svctl")]
#[command(author, version, about = "Operate services, revisions, and builds on the svctl platform")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Kubernetes context to use (defaults to the saved or current context)
    #[arg(short, long, value_name = "CONTEXT", global = true)]
    pub context: Option<String>,

    /// Namespace to operate in
    #[arg(short, long, global = true)]
    pub namespace: Option<String>,

    /// Output format for list commands
    #[arg(short, long, value_enum, default_value = "table", global = true)]
    pub output: OutputFormat,

    /// Omit column headers in table output
    #[arg(long, global = true)]
    pub no_headers: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage services
    #[command(subcommand)]
    Service(ServiceCommand),

    /// Manage revisions
    #[command(subcommand)]
    Revision(RevisionCommand),

    /// Manage builds
    #[command(subcommand)]
    Build(BuildCommand),

    /// Inspect pods
    #[command(subcommand)]
    Pod(PodCommand),

    /// Show or change saved defaults
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand, Debug)]
pub enum ServiceCommand {
    /// List services in the namespace
    List,

    /// Print one service in full
    Show { name: String },

    /// Delete a service
    Delete { name: String },

    /// Tail logs from every pod of every revision of a service
    Logs {
        name: String,

        /// Keep following new revisions, pods, and log lines
        #[arg(short, long)]
        follow: bool,

        /// Number of trailing lines per container (non-follow mode)
        #[arg(short, long)]
        lines: Option<i64>,
    },
}

#[derive(Subcommand, Debug)]
pub enum RevisionCommand {
    /// List revisions, optionally for one service
    List {
        #[arg(long)]
        service: Option<String>,
    },

    /// Print one revision in full
    Show { name: String },

    /// Delete a revision
    Delete { name: String },

    /// Tail logs from every pod of a revision
    Logs {
        name: String,

        #[arg(short, long)]
        follow: bool,

        #[arg(short, long)]
        lines: Option<i64>,
    },
}

#[derive(Subcommand, Debug)]
pub enum BuildCommand {
    /// List builds in the namespace
    List,

    /// Print one build in full
    Show { name: String },

    /// Delete a build
    Delete { name: String },

    /// Create a build and watch it to completion
    Create {
        name: String,

        /// Target image reference
        #[arg(long)]
        image: String,

        /// Local source directory to upload into the build
        #[arg(long)]
        source: Option<PathBuf>,

        /// Maximum seconds to wait for each build stage
        #[arg(long, default_value_t = 600)]
        wait_timeout: u64,
    },

    /// Tail logs from a build's pods
    Logs {
        name: String,

        #[arg(short, long)]
        follow: bool,

        #[arg(short, long)]
        lines: Option<i64>,
    },
}

#[derive(Subcommand, Debug)]
pub enum PodCommand {
    /// List pods, optionally scoped to one service
    List {
        #[arg(long)]
        service: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the saved defaults
    Show,

    /// Save a default context
    SetContext { context: String },

    /// Save a default namespace
    SetNamespace { namespace: String },
}

#[derive(ValueEnum, Clone, Debug, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Yaml,
}
