//! Snapshot types shared across the run: server records, run mode, target and work items.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

/// Panel-assigned server identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ServerId(pub u64);

impl fmt::Display for ServerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ServerId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(ServerId)
            .map_err(|_| format!("invalid server id: {:?}", s))
    }
}

/// A bandwidth amount exactly as the panel sent it (number, numeric string, empty or null).
///
/// Kept verbatim so normalization can log the original next to the value it produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawAmount(String);

impl RawAmount {
    pub fn new(text: impl Into<String>) -> Self {
        RawAmount(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<i64> for RawAmount {
    fn from(v: i64) -> Self {
        RawAmount(v.to_string())
    }
}

impl fmt::Display for RawAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            write!(f, "<empty>")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// One server from the inventory snapshot. Immutable for the run.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerRecord {
    pub id: ServerId,
    /// Bandwidth limit in GB; 0 means unlimited, negative is an accounting convention.
    pub bandwidth_limit: RawAmount,
    /// Bandwidth consumed this period, in GB.
    pub bandwidth_used: RawAmount,
    /// Plan id, passed back to the panel unchanged on update.
    pub plan_id: String,
    /// IPv4 addresses in the order the panel listed them.
    pub ip_addresses: Vec<Ipv4Addr>,
}

/// Which carry-over policy a run applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// New limit derived from the panel's own limit and usage counters.
    Delta,
    /// New limit taken from an external allowance report, matched by IP.
    Report,
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunMode::Delta => write!(f, "delta"),
            RunMode::Report => write!(f, "report"),
        }
    }
}

impl FromStr for RunMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "delta" => Ok(RunMode::Delta),
            "report" => Ok(RunMode::Report),
            other => Err(format!("unknown mode {:?} (expected delta or report)", other)),
        }
    }
}

/// Which servers a run processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    All,
    Server(ServerId),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::All => write!(f, "all"),
            Target::Server(id) => write!(f, "{}", id),
        }
    }
}

impl FromStr for Target {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(Target::All);
        }
        s.parse::<ServerId>().map(Target::Server)
    }
}

/// One server's pending carry-over operation.
///
/// Delta mode carries `bandwidth_used`; report mode carries `ip_list` instead.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkItem {
    pub server_id: ServerId,
    pub bandwidth_limit: RawAmount,
    pub bandwidth_used: Option<RawAmount>,
    pub plan_id: String,
    pub ip_list: Option<Vec<Ipv4Addr>>,
}

impl WorkItem {
    pub fn from_record(record: &ServerRecord, mode: RunMode) -> Self {
        let (bandwidth_used, ip_list) = match mode {
            RunMode::Delta => (Some(record.bandwidth_used.clone()), None),
            RunMode::Report => (None, Some(record.ip_addresses.clone())),
        };
        Self {
            server_id: record.id,
            bandwidth_limit: record.bandwidth_limit.clone(),
            bandwidth_used,
            plan_id: record.plan_id.clone(),
            ip_list,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_parses_all_and_ids() {
        assert_eq!("all".parse::<Target>().unwrap(), Target::All);
        assert_eq!("ALL".parse::<Target>().unwrap(), Target::All);
        assert_eq!(
            "101".parse::<Target>().unwrap(),
            Target::Server(ServerId(101))
        );
        assert!("web-1".parse::<Target>().is_err());
    }

    #[test]
    fn run_mode_parses_case_insensitively() {
        assert_eq!("Delta".parse::<RunMode>().unwrap(), RunMode::Delta);
        assert_eq!("report".parse::<RunMode>().unwrap(), RunMode::Report);
        assert!("monthly".parse::<RunMode>().is_err());
    }

    #[test]
    fn work_item_fields_follow_mode() {
        let record = ServerRecord {
            id: ServerId(7),
            bandwidth_limit: RawAmount::from(100),
            bandwidth_used: RawAmount::from(40),
            plan_id: "3".to_string(),
            ip_addresses: vec![Ipv4Addr::new(10, 0, 0, 7)],
        };
        let delta = WorkItem::from_record(&record, RunMode::Delta);
        assert_eq!(delta.bandwidth_used, Some(RawAmount::from(40)));
        assert!(delta.ip_list.is_none());

        let report = WorkItem::from_record(&record, RunMode::Report);
        assert!(report.bandwidth_used.is_none());
        assert_eq!(report.ip_list.as_deref(), Some(&[Ipv4Addr::new(10, 0, 0, 7)][..]));
        assert_eq!(report.plan_id, "3");
    }
}
