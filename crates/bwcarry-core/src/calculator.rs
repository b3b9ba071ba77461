//! Carry-over calculator.
//!
//! Pure functions: given a server's current limit and usage (delta mode) or
//! its IPs and the report map (report mode), decide what the worker does.

use std::net::Ipv4Addr;
use thiserror::Error;

use crate::model::RawAmount;
use crate::report::{Remaining, ReportMap};

/// A per-unit input problem. The unit fails; the run continues.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("no report entry for any of the server's IPs ({})", fmt_ips(.ips))]
    NoReportMatch { ips: Vec<Ipv4Addr> },
    #[error("report lists {ip} as unlimited; refusing to remove the server's limit")]
    UnlimitedTarget { ip: Ipv4Addr },
    #[error("report value {raw:?} for {ip} is not a number")]
    Unresolved { ip: Ipv4Addr, raw: String },
    #[error("report mode run without a report map")]
    MissingReport,
    #[error("work item has no {0}")]
    MissingField(&'static str),
}

fn fmt_ips(ips: &[Ipv4Addr]) -> String {
    if ips.is_empty() {
        return "none".to_string();
    }
    ips.iter()
        .map(Ipv4Addr::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// What the worker should do for one server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Unlimited plan (limit 0): reset the usage counter, leave the limit alone.
    ResetOnly,
    /// Usage exceeds a positive limit. No API call is made.
    Skip { limit: i64, used: i64 },
    /// Reset usage, then set `new_limit`.
    ResetAndUpdate { new_limit: i64 },
}

/// A normalized amount with the wire text it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    pub value: i64,
    pub original: String,
}

impl Normalized {
    /// True when the wire text is not exactly the integer used.
    pub fn changed(&self) -> bool {
        self.original.trim() != self.value.to_string()
    }
}

/// Integer form of a panel amount: fractional values floor (so negatives move
/// toward negative infinity); empty, null or non-numeric text becomes 0.
pub fn normalize_amount(raw: &RawAmount) -> Normalized {
    let text = raw.as_str().trim();
    let value = match text.parse::<i64>() {
        Ok(v) => v,
        Err(_) => match text.parse::<f64>() {
            Ok(f) if f.is_finite() => f.floor() as i64,
            _ => 0,
        },
    };
    Normalized {
        value,
        original: raw.as_str().to_string(),
    }
}

/// Report remaining value → new limit. Floors fractions; anything below 1 becomes 1
/// so the result can never read as the panel's "0 = unlimited".
pub fn normalize_remaining(remaining: f64) -> i64 {
    let floored = remaining.floor();
    if floored < 1.0 {
        1
    } else {
        floored as i64
    }
}

/// Delta-mode policy.
pub fn plan_delta(limit: i64, used: i64) -> Decision {
    if limit == 0 {
        return Decision::ResetOnly;
    }
    if limit > 0 && used > limit {
        return Decision::Skip { limit, used };
    }
    let new_limit = if limit > 0 {
        limit.saturating_sub(used)
    } else {
        // Negative limits still count remaining allowance by magnitude.
        limit.saturating_add(used)
    };
    Decision::ResetAndUpdate { new_limit }
}

/// Report-mode policy. The report is not consulted at all for unlimited plans.
pub fn plan_report(
    limit: i64,
    ips: &[Ipv4Addr],
    report: Option<&ReportMap>,
) -> Result<(Decision, Option<Ipv4Addr>), ValidationError> {
    if limit == 0 {
        return Ok((Decision::ResetOnly, None));
    }
    let report = report.ok_or(ValidationError::MissingReport)?;
    let (ip, remaining) = report
        .first_match(ips)
        .ok_or_else(|| ValidationError::NoReportMatch { ips: ips.to_vec() })?;
    match remaining {
        Remaining::Amount(r) => Ok((
            Decision::ResetAndUpdate {
                new_limit: normalize_remaining(*r),
            },
            Some(ip),
        )),
        Remaining::Unlimited => Err(ValidationError::UnlimitedTarget { ip }),
        Remaining::Unresolved(raw) => Err(ValidationError::Unresolved {
            ip,
            raw: raw.clone(),
        }),
    }
}
