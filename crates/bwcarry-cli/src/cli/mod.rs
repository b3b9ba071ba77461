//! CLI for bwcarry.

mod commands;

use anyhow::Result;
use bwcarry_core::config;
use bwcarry_core::{RunMode, RunRequest, Target};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use commands::{run_carry_over, run_check_report, run_list};

/// Top-level CLI for bwcarry.
#[derive(Debug, Parser)]
#[command(name = "bwcarry")]
#[command(about = "bwcarry: carry unused bandwidth into the next period", long_about = None)]
pub struct Cli {
    /// Config file (default: ~/.config/bwcarry/config.toml).
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Reset usage counters and set new limits for one or all servers.
    Run {
        /// `delta` (limit minus usage) or `report` (remaining value from a report file).
        #[arg(long, default_value = "delta")]
        mode: RunMode,
        /// Usage report file; required with `--mode report`.
        #[arg(long, value_name = "PATH", required_if_eq("mode", "report"))]
        report: Option<PathBuf>,
        /// `all` or a single server id.
        #[arg(long, default_value = "all")]
        target: Target,
        /// Concurrent workers (overrides `parallelism` from config).
        #[arg(long, value_name = "N")]
        parallel: Option<usize>,
        /// Skip TLS certificate verification from the first request.
        #[arg(long)]
        insecure: bool,
        /// Compute and log decisions without calling reset or update.
        #[arg(long)]
        dry_run: bool,
    },

    /// List the panel inventory as bwcarry sees it.
    List,

    /// Parse a usage report and show what was accepted and skipped.
    CheckReport {
        /// Path to the report file.
        path: PathBuf,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();

        match cli.command {
            CliCommand::Run {
                mode,
                report,
                target,
                parallel,
                insecure,
                dry_run,
            } => {
                let cfg = config::load(cli.config.as_deref())?;
                let req = RunRequest {
                    mode,
                    target,
                    report_path: report,
                    parallelism: parallel,
                    insecure,
                    dry_run,
                };
                run_carry_over(cfg, req).await?;
            }
            CliCommand::List => {
                let cfg = config::load(cli.config.as_deref())?;
                run_list(cfg).await?;
            }
            CliCommand::CheckReport { path } => run_check_report(&path)?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
