//! gpu-info
//!
//! Point-in-time report of node, CPU and GPU usage of a Torque/PBS cluster,
//! built from `pbsnodes <host>` output.
//!
//! # Usage
//!
//! ```bash
//! # Hostnames of a cluster, no status command is run
//! gpu-info hosts genius
//!
//! # One node
//! gpu-info node r22g35
//!
//! # Whole cluster, GPU nodes only, 8 queries in flight
//! gpu-info cluster genius --gpu-only --concurrency 8
//!
//! # Replay captured output as JSON
//! gpu-info --snapshot-dir ./captures --json cluster genius
//! ```

// CLI tools are expected to print to stdout/stderr
#![allow(clippy::print_stdout, clippy::print_stderr)]

mod config;
mod logging;
mod report;
mod snapshot;

use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser, Subcommand};
use pbs_inventory::{Cluster, InventoryCollector, StatusSource};
use tokio_util::sync::CancellationToken;

use crate::config::AppConfig;
use crate::report::{ClusterReport, DiagnosticsReport, NodeReport};
use crate::snapshot::SnapshotDirSource;

/// Node, CPU and GPU utilization of a Torque/PBS cluster
#[derive(Parser, Debug)]
#[command(name = "gpu-info")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log verbosity level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Output results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Treat unknown CPU and GPU status keys as errors
    #[arg(long, global = true)]
    strict: bool,

    /// Read `<DIR>/<hostname>.txt` instead of running the status command
    #[arg(long, global = true, value_name = "DIR")]
    snapshot_dir: Option<PathBuf>,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the GPU and CPU hostnames of a cluster
    Hosts {
        /// Cluster name (thinking, genius, breniac)
        cluster: String,
    },
    /// Show the state, jobs and GPUs of one node
    Node {
        hostname: String,
    },
    /// Show every node of a cluster and a summary
    Cluster {
        /// Cluster name (thinking, genius, breniac)
        cluster: String,

        /// Maximum number of status queries in flight
        #[arg(long)]
        concurrency: Option<usize>,

        /// Only show nodes with GPUs
        #[arg(long)]
        gpu_only: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    // 1) defaults -> 2) YAML -> 3) env (GPU_INFO__*) -> 4) CLI overrides
    let mut config = AppConfig::load(cli.config.as_deref())?;
    if cli.strict {
        config.collector.strict_fields = true;
    }
    if let Some(Commands::Cluster {
        concurrency: Some(concurrency),
        ..
    }) = cli.command
    {
        config.collector.concurrency = concurrency;
    }

    logging::init(&config.logging, cli.verbose);

    if cli.print_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    if !std::io::stdout().is_terminal() {
        colored::control::set_override(false);
    }

    let Some(command) = cli.command else {
        bail!("no command given, see --help");
    };

    let source: Box<dyn StatusSource> = match cli.snapshot_dir {
        Some(dir) => Box::new(SnapshotDirSource::new(dir)),
        None => Box::new(config.status_source()),
    };

    match command {
        Commands::Hosts { cluster } => print_hosts(&cluster, cli.json),
        Commands::Node { hostname } => print_node(source, &config, &hostname, cli.json).await,
        Commands::Cluster {
            cluster, gpu_only, ..
        } => print_cluster(source, &config, &cluster, gpu_only, cli.json).await,
    }
}

fn print_hosts(name: &str, json: bool) -> Result<()> {
    let cluster: Cluster = name.parse()?;
    let hosts = cluster.hostnames();

    if json {
        let output = serde_json::json!({
            "cluster": cluster,
            "gpu": hosts.gpu,
            "cpu": hosts.cpu,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        if hosts.is_empty() {
            eprintln!("No hostnames are known for cluster {cluster}");
        }
        for host in hosts.all() {
            println!("{host}");
        }
    }
    Ok(())
}

async fn print_node(
    source: Box<dyn StatusSource>,
    config: &AppConfig,
    hostname: &str,
    json: bool,
) -> Result<()> {
    let collector = InventoryCollector::with_options(source, config.collect_options(None));
    let (node, diagnostics) = collector
        .collect_node(hostname)
        .await
        .with_context(|| format!("failed to collect the status of {hostname}"))?;

    if json {
        let output = serde_json::json!({
            "node": node,
            "diagnostics": diagnostics,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print!("{}", NodeReport::new(&node));
        print!("{}", DiagnosticsReport::new(&diagnostics));
    }
    Ok(())
}

async fn print_cluster(
    source: Box<dyn StatusSource>,
    config: &AppConfig,
    name: &str,
    gpu_only: bool,
    json: bool,
) -> Result<()> {
    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, aborting the inventory");
            interrupt.cancel();
        }
    });

    let collector = InventoryCollector::with_options(source, config.collect_options(Some(cancel)));
    let mut inventory = collector
        .collect_cluster(name)
        .await
        .with_context(|| format!("failed to build the inventory of cluster '{name}'"))?;

    if json {
        let summary = inventory.summary();
        if gpu_only {
            inventory.nodes.retain(pbs_inventory::NodeStatus::has_gpus);
        }
        let output = serde_json::json!({
            "inventory": inventory,
            "summary": summary,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print!("{}", ClusterReport::new(&inventory, gpu_only));
    }
    Ok(())
}
