//! One worker's handling of one unit: decide, reset, update, record.

use std::fmt;
use std::net::Ipv4Addr;

use super::unit_log::UnitLog;
use super::RunContext;
use crate::api::redact;
use crate::calculator::{self, Decision, Normalized, ValidationError};
use crate::error::UnitError;
use crate::journal::timestamp;
use crate::model::{RawAmount, RunMode, ServerId, WorkItem};

/// Terminal status a worker records for its unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitStatus {
    Success,
    Failure,
}

impl UnitStatus {
    pub fn code(self) -> i32 {
        match self {
            UnitStatus::Success => 0,
            UnitStatus::Failure => 1,
        }
    }
}

/// Audit record of a confirmed mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeRecord {
    pub at: String,
    pub server_id: ServerId,
    pub mode: RunMode,
    pub old_limit: i64,
    /// Usage at reset time (delta mode only).
    pub used: Option<i64>,
    /// `None` when only the usage counter was reset.
    pub new_limit: Option<i64>,
    pub plan_id: String,
    /// Report IP that supplied the value (report mode only).
    pub matched_ip: Option<Ipv4Addr>,
}

impl fmt::Display for ChangeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} server={} mode={}", self.at, self.server_id, self.mode)?;
        match self.new_limit {
            Some(n) => write!(
                f,
                " action=reset+update old_limit={} new_limit={}",
                self.old_limit, n
            )?,
            None => write!(f, " action=reset limit={}", self.old_limit)?,
        }
        if let Some(used) = self.used {
            write!(f, " used={}", used)?;
        }
        if let Some(ip) = self.matched_ip {
            write!(f, " report_ip={}", ip)?;
        }
        write!(f, " plan={}", self.plan_id)
    }
}

/// Everything one worker produced for one unit. Never shared with other workers.
#[derive(Debug, Clone)]
pub struct WorkerResult {
    pub server_id: ServerId,
    /// Terminal sentinel; `None` means the worker never finished the unit.
    pub status: Option<UnitStatus>,
    pub skip_reason: Option<String>,
    pub error: Option<String>,
    pub log_lines: Vec<String>,
    pub change: Option<ChangeRecord>,
}

impl WorkerResult {
    pub(crate) fn empty(server_id: ServerId) -> Self {
        Self {
            server_id,
            status: None,
            skip_reason: None,
            error: None,
            log_lines: Vec::new(),
            change: None,
        }
    }
}

enum Outcome {
    Skipped(String),
    Planned,
    Applied(ChangeRecord),
}

pub(crate) fn process_unit(ctx: &RunContext, item: &WorkItem) -> WorkerResult {
    let span = tracing::info_span!("unit", server_id = %item.server_id);
    let _enter = span.enter();

    let mut log = UnitLog::new(item.server_id);
    let mut result = WorkerResult::empty(item.server_id);
    let status = match carry_over(ctx, item, &mut log) {
        Ok(Outcome::Skipped(reason)) => {
            log.skip(&reason);
            result.skip_reason = Some(reason);
            UnitStatus::Success
        }
        Ok(Outcome::Planned) => UnitStatus::Success,
        Ok(Outcome::Applied(change)) => {
            log.info(format_args!("applied: {}", change));
            result.change = Some(change);
            UnitStatus::Success
        }
        Err(e) => {
            log.error(format_args!("failed: {}", e));
            if let UnitError::Transport(t) = &e {
                if !t.body.is_empty() {
                    log.error(format_args!(
                        "response body: {}",
                        crate::api::truncate_for_log(&t.body, 500)
                    ));
                }
            }
            result.error = Some(redact(&e.to_string()));
            UnitStatus::Failure
        }
    };
    result.status = Some(status);
    result.log_lines = log.finish(status);
    result
}

fn normalized(log: &mut UnitLog, what: &str, raw: &RawAmount) -> i64 {
    let n: Normalized = calculator::normalize_amount(raw);
    if n.changed() {
        log.info(format_args!("{} normalized: {} -> {}", what, raw, n.value));
    }
    n.value
}

fn carry_over(
    ctx: &RunContext,
    item: &WorkItem,
    log: &mut UnitLog,
) -> Result<Outcome, UnitError> {
    let limit = normalized(log, "bandwidth limit", &item.bandwidth_limit);
    let (decision, used, matched_ip) = match ctx.mode {
        RunMode::Delta => {
            let raw_used = item
                .bandwidth_used
                .as_ref()
                .ok_or(ValidationError::MissingField("bandwidth usage"))?;
            let used = normalized(log, "bandwidth used", raw_used);
            (calculator::plan_delta(limit, used), Some(used), None)
        }
        RunMode::Report => {
            let ips = item.ip_list.as_deref().unwrap_or(&[]);
            let (decision, ip) = calculator::plan_report(limit, ips, ctx.report.as_ref())?;
            if let Some(ip) = ip {
                log.info(format_args!("report entry matched on {}", ip));
            }
            (decision, None, ip)
        }
    };

    match decision {
        Decision::Skip { limit, used } => {
            return Ok(Outcome::Skipped(format!(
                "used {} exceeds limit {}; left untouched",
                used, limit
            )));
        }
        Decision::ResetOnly => log.info("unlimited plan: resetting usage only"),
        Decision::ResetAndUpdate { new_limit } => {
            log.info(format_args!("limit {} -> {}", limit, new_limit));
            if new_limit == 0 {
                log.warn("new limit is 0, which the panel treats as unlimited");
            }
        }
    }

    if ctx.dry_run {
        log.info("dry run: no API calls issued");
        return Ok(Outcome::Planned);
    }

    ctx.panel.reset_bandwidth(item.server_id)?;
    log.info("usage counter reset");

    let new_limit = match decision {
        Decision::ResetAndUpdate { new_limit } => {
            ctx.panel
                .update_bandwidth(item.server_id, new_limit, &item.plan_id)?;
            log.info(format_args!("limit updated to {} (plan {})", new_limit, item.plan_id));
            Some(new_limit)
        }
        _ => None,
    };

    Ok(Outcome::Applied(ChangeRecord {
        at: timestamp(),
        server_id: item.server_id,
        mode: ctx.mode,
        old_limit: limit,
        used,
        new_limit,
        plan_id: item.plan_id.clone(),
        matched_ip,
    }))
}
