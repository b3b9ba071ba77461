//! `bwcarry run` – one carry-over batch.

use anyhow::{bail, Context, Result};
use bwcarry_core::aggregate::Classification;
use bwcarry_core::config::CarryConfig;
use bwcarry_core::journal::{CHANGE_LOG, VERBOSE_LOG};
use bwcarry_core::{run_batch, RunRequest};

pub async fn run_carry_over(cfg: CarryConfig, req: RunRequest) -> Result<()> {
    if req.parallelism == Some(0) {
        bail!("--parallel must be at least 1");
    }
    let logs_dir = cfg.logs_dir()?;
    tracing::info!(mode = %req.mode, target = %req.target, dry_run = req.dry_run, "starting run");

    // Workers block on libcurl; keep them off the async runtime.
    let report = tokio::task::spawn_blocking(move || run_batch(&cfg, &req))
        .await
        .context("run task panicked")??;

    for unit in &report.units {
        match unit.classification {
            Classification::Success => {}
            Classification::Skipped => println!(
                "skipped  {:<8} {}",
                unit.server_id.to_string(),
                unit.reason.as_deref().unwrap_or("")
            ),
            Classification::Failed => println!(
                "FAILED   {:<8} {}",
                unit.server_id.to_string(),
                unit.reason.as_deref().unwrap_or("")
            ),
        }
    }
    println!("{}", report.summary);
    println!(
        "logs: {} {}",
        logs_dir.join(VERBOSE_LOG).display(),
        logs_dir.join(CHANGE_LOG).display()
    );
    if report.inconsistent {
        eprintln!("warning: worker pool status disagrees with unit results; see verbose log");
    }

    if let Some(err) = report.journal_error {
        bail!("run finished but logs could not be written: {}", err);
    }
    if report.summary.is_failure() {
        bail!("{} of {} servers failed", report.summary.failed, report.summary.total);
    }
    Ok(())
}
