//! Work orchestrator.
//!
//! Builds the worklist from one inventory snapshot, fans it out over a
//! fixed-size pool of workers and hands every result to the aggregator.
//! Per unit the order is strict: reset, then (only if reset succeeded)
//! update. Units are otherwise independent and finish in any order.

mod pool;
mod unit_log;
mod worker;

pub use unit_log::{SKIP_MARKER, STATUS_MARKER};
pub use worker::{ChangeRecord, UnitStatus, WorkerResult};

use std::path::PathBuf;

use crate::aggregate::{aggregate, RunReport};
use crate::api::{ApiClient, CurlTransport, ResponseLogging};
use crate::config::{CarryConfig, ConfigError};
use crate::error::CarryError;
use crate::inventory;
use crate::journal::RunJournal;
use crate::model::{RunMode, ServerRecord, Target, WorkItem};
use crate::panel::PanelApi;
use crate::report::ReportMap;

/// Immutable state shared by every worker in a run.
#[derive(Debug)]
pub struct RunContext {
    pub panel: PanelApi,
    pub mode: RunMode,
    /// Present in report mode.
    pub report: Option<ReportMap>,
    pub parallelism: usize,
    /// Compute and log decisions without calling reset/update.
    pub dry_run: bool,
}

/// What the caller asked for, after CLI parsing.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub mode: RunMode,
    pub target: Target,
    pub report_path: Option<PathBuf>,
    /// Overrides `parallelism` from config.
    pub parallelism: Option<usize>,
    /// Start with TLS verification disabled regardless of config.
    pub insecure: bool,
    pub dry_run: bool,
}

/// Builds the panel client from config.
pub fn connect(cfg: &CarryConfig, insecure: bool) -> Result<PanelApi, ConfigError> {
    let client = ApiClient::new(
        Box::new(CurlTransport::new(&cfg.http)),
        cfg.insecure || insecure,
        ResponseLogging {
            enabled: cfg.log_responses,
            max_chars: cfg.response_log_max_chars,
        },
    );
    PanelApi::new(client, &cfg.panel)
}

/// Selects the units to process: every record, or exactly the one named.
pub fn build_worklist(
    inventory: &[ServerRecord],
    mode: RunMode,
    target: Target,
) -> Result<Vec<WorkItem>, CarryError> {
    match target {
        Target::All => Ok(inventory
            .iter()
            .map(|r| WorkItem::from_record(r, mode))
            .collect()),
        Target::Server(id) => inventory
            .iter()
            .find(|r| r.id == id)
            .map(|r| vec![WorkItem::from_record(r, mode)])
            .ok_or(CarryError::TargetNotFound(id)),
    }
}

/// Runs one batch over an already-fetched inventory snapshot.
pub fn run(
    ctx: &RunContext,
    target: Target,
    inventory: &[ServerRecord],
) -> Result<RunReport, CarryError> {
    if ctx.mode == RunMode::Report && ctx.report.is_none() {
        return Err(ConfigError::Invalid("report mode requires a report".into()).into());
    }
    let worklist = build_worklist(inventory, ctx.mode, target)?;
    tracing::info!(
        units = worklist.len(),
        parallelism = ctx.parallelism,
        mode = %ctx.mode,
        dry_run = ctx.dry_run,
        "dispatching worklist"
    );

    let output = pool::dispatch(&worklist, ctx.parallelism, |item| {
        worker::process_unit(ctx, item)
    });
    let entries = worklist
        .iter()
        .map(|w| w.server_id)
        .zip(output.results)
        .collect();
    Ok(aggregate(entries, output.pool_failed))
}

/// Full batch: load the report (report mode), fetch inventory, run, write logs.
///
/// Fatal errors return before any unit is dispatched. A failure to write the
/// verbose/change logs after the run is reported on the returned report, not
/// as an error, since the mutations have already happened.
pub fn run_batch(cfg: &CarryConfig, req: &RunRequest) -> Result<RunReport, CarryError> {
    let report = match req.mode {
        RunMode::Report => {
            let path = req.report_path.as_deref().ok_or_else(|| {
                ConfigError::Invalid("report mode requires a report file".into())
            })?;
            Some(ReportMap::load(path)?)
        }
        RunMode::Delta => None,
    };
    let journal = RunJournal::in_dir(&cfg.logs_dir()?);

    let panel = connect(cfg, req.insecure)?;
    let inventory = inventory::fetch_all(&panel, &cfg.inventory)?;

    let ctx = RunContext {
        panel,
        mode: req.mode,
        report,
        parallelism: req.parallelism.unwrap_or(cfg.parallelism).max(1),
        dry_run: req.dry_run,
    };
    let mut run_report = run(&ctx, req.target, &inventory)?;

    let header = format!(
        "mode={} target={} parallelism={} dry_run={} insecure={}",
        ctx.mode,
        req.target,
        ctx.parallelism,
        ctx.dry_run,
        ctx.panel.client().is_insecure()
    );
    if let Err(e) = journal.record(&run_report, &header) {
        tracing::error!("could not write run logs: {}", e);
        run_report.journal_error = Some(e.to_string());
    }
    tracing::info!(summary = %run_report.summary, "run finished");
    Ok(run_report)
}
