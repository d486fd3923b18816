// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

mod build;
mod cli;
pub mod config;
mod logs;
mod output;
mod platform;
mod ui;
mod watch;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::prelude::*;

use cli::{Args, BuildCommand, Command, ConfigCommand, PodCommand, RevisionCommand, ServiceCommand};
use platform::PlatformClient;

/// Initialize logging with file output and optional stderr
fn init_logging(verbose: bool) {
    use tracing_rolling_file::{RollingConditionBase, RollingFileAppenderBase};
    use tracing_subscriber::fmt::format::FmtSpan;

    // Create log directory
    let log_dir = config::base_dir()
        .map(|p| p.join("log"))
        .unwrap_or_else(|_| std::path::PathBuf::from("."));

    if let Err(e) = std::fs::create_dir_all(&log_dir) {
        eprintln!("Warning: Could not create log directory: {}", e);
        return;
    }

    // File appender with size-based rotation:
    // - Max 10MB per file
    // - Keep up to 5 files (total max ~50MB)
    // - Also rotate daily
    let log_path = log_dir.join("svctl.log");
    let condition = RollingConditionBase::new()
        .daily()
        .max_size(10 * 1024 * 1024); // 10MB

    let file_appender = match RollingFileAppenderBase::new(log_path, condition, 5) {
        Ok(appender) => appender,
        Err(e) => {
            eprintln!("Warning: Could not create log file: {}", e);
            return;
        }
    };

    // Use non-blocking writer for better performance
    let (non_blocking, _guard) = file_appender.get_non_blocking_appender();
    // Leak the guard to keep the background writer alive
    std::mem::forget(_guard);

    let filter = if verbose { "svctl=debug" } else { "svctl=info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));

    // File layer (always enabled)
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_span_events(FmtSpan::NONE);

    if verbose {
        // Both file and stderr output
        let stderr_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_span_events(FmtSpan::NONE);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(file_layer)
            .with(stderr_layer)
            .init();
    } else {
        // File only
        tracing_subscriber::registry()
            .with(env_filter)
            .with(file_layer)
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Install rustls crypto provider (aws-lc-rs)
    rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    let args = Args::parse();
    init_logging(args.verbose);

    // Config commands run entirely offline.
    if let Command::Config(ref command) = args.command {
        return run_config(command);
    }

    // Explicit flags win over saved defaults.
    let saved = config::Config::load().unwrap_or_default();
    let context = args.context.clone().or(saved.context);
    let namespace = args
        .namespace
        .clone()
        .or(saved.namespace)
        .unwrap_or_else(|| "default".to_string());

    let client = PlatformClient::connect(context.as_deref(), &namespace).await?;

    match &args.command {
        Command::Service(command) => match command {
            ServiceCommand::List => {
                cli::service::list(&client, &args.output, args.no_headers).await
            }
            ServiceCommand::Show { name } => cli::service::show(&client, name, &args.output).await,
            ServiceCommand::Delete { name } => cli::service::delete(&client, name).await,
            ServiceCommand::Logs {
                name,
                follow,
                lines,
            } => cli::service::logs(&client, name, *follow, *lines).await,
        },
        Command::Revision(command) => match command {
            RevisionCommand::List { service } => {
                cli::revision::list(&client, service.as_deref(), &args.output, args.no_headers)
                    .await
            }
            RevisionCommand::Show { name } => {
                cli::revision::show(&client, name, &args.output).await
            }
            RevisionCommand::Delete { name } => cli::revision::delete(&client, name).await,
            RevisionCommand::Logs {
                name,
                follow,
                lines,
            } => cli::revision::logs(&client, name, *follow, *lines).await,
        },
        Command::Build(command) => match command {
            BuildCommand::List => cli::build::list(&client, &args.output, args.no_headers).await,
            BuildCommand::Show { name } => cli::build::show(&client, name, &args.output).await,
            BuildCommand::Delete { name } => cli::build::delete(&client, name).await,
            BuildCommand::Create {
                name,
                image,
                source,
                wait_timeout,
            } => {
                cli::build::create(&client, name, image, source.as_deref(), *wait_timeout).await
            }
            BuildCommand::Logs {
                name,
                follow,
                lines,
            } => cli::build::logs(&client, name, *follow, *lines).await,
        },
        Command::Pod(command) => match command {
            PodCommand::List { service } => {
                cli::pod::list(&client, service.as_deref(), &args.output, args.no_headers).await
            }
        },
        Command::Config(_) => unreachable!("handled above"),
    }
}

fn run_config(command: &ConfigCommand) -> Result<()> {
    let mut saved = config::Config::load()?;
    match command {
        ConfigCommand::Show => {
            println!("context:   {}", saved.context.as_deref().unwrap_or("<kubeconfig default>"));
            println!("namespace: {}", saved.namespace.as_deref().unwrap_or("default"));
        }
        ConfigCommand::SetContext { context } => {
            saved.context = Some(context.clone());
            saved.save()?;
            println!("Default context set to '{context}'");
        }
        ConfigCommand::SetNamespace { namespace } => {
            saved.namespace = Some(namespace.clone());
            saved.save()?;
            println!("Default namespace set to '{namespace}'");
        }
    }
    Ok(())
}
