//! Line grammar for allowance reports.
//!
//! ```text
//! line      := ident "- " ip_list [ "|" field ]* "|" remaining
//! ip_list   := ipv4 ( "," ipv4 )*
//! remaining := label ":" value [ "GB" ]
//! value     := number | "unlimited"
//! ```
//!
//! The IP list is taken from the text before the last `|`, after the last
//! `"- "` marker, up to the next `|`. The value follows the last `:` of the
//! final field, so labels may contain colons. Anything that does not fit is
//! skipped with a [`LineSkip`] reason.

use std::fmt;
use std::net::Ipv4Addr;

/// Remaining allowance as written in the report.
#[derive(Debug, Clone, PartialEq)]
pub enum Remaining {
    /// Numeric GB value, possibly fractional or negative.
    Amount(f64),
    Unlimited,
    /// Present but neither numeric nor `unlimited`.
    Unresolved(String),
}

impl fmt::Display for Remaining {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Remaining::Amount(v) => write!(f, "{}GB", v),
            Remaining::Unlimited => write!(f, "unlimited"),
            Remaining::Unresolved(raw) => write!(f, "{:?}", raw),
        }
    }
}

/// One accepted report line: every listed IP shares the remaining value.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportLine {
    pub ips: Vec<Ipv4Addr>,
    pub remaining: Remaining,
}

/// Why a line was not accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineSkip {
    Blank,
    NoFieldSeparator,
    NoIpMarker,
    EmptyIpList,
    InvalidIp(String),
    NoValueSeparator,
    EmptyValue,
}

impl fmt::Display for LineSkip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineSkip::Blank => write!(f, "blank or comment"),
            LineSkip::NoFieldSeparator => write!(f, "no `|` field separator"),
            LineSkip::NoIpMarker => write!(f, "no `- ` marker before the IP list"),
            LineSkip::EmptyIpList => write!(f, "empty IP list"),
            LineSkip::InvalidIp(tok) => write!(f, "not an IPv4 address: {:?}", tok),
            LineSkip::NoValueSeparator => write!(f, "last field has no `:`"),
            LineSkip::EmptyValue => write!(f, "empty remaining value"),
        }
    }
}

const IP_MARKER: &str = "- ";
const UNIT_SUFFIX: &str = "GB";

pub fn parse_line(line: &str) -> Result<ReportLine, LineSkip> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Err(LineSkip::Blank);
    }

    let (head, last) = line.rsplit_once('|').ok_or(LineSkip::NoFieldSeparator)?;
    let marker = head.rfind(IP_MARKER).ok_or(LineSkip::NoIpMarker)?;
    let after = &head[marker + IP_MARKER.len()..];
    let ip_field = after.split('|').next().unwrap_or(after);
    let ips = parse_ip_list(ip_field)?;

    let (_, value) = last.rsplit_once(':').ok_or(LineSkip::NoValueSeparator)?;
    let remaining = parse_remaining(value)?;

    Ok(ReportLine { ips, remaining })
}

fn parse_ip_list(field: &str) -> Result<Vec<Ipv4Addr>, LineSkip> {
    let mut ips = Vec::new();
    for token in field.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        let ip = token
            .parse::<Ipv4Addr>()
            .map_err(|_| LineSkip::InvalidIp(token.to_string()))?;
        ips.push(ip);
    }
    if ips.is_empty() {
        return Err(LineSkip::EmptyIpList);
    }
    Ok(ips)
}

fn parse_remaining(value: &str) -> Result<Remaining, LineSkip> {
    let mut value = value.trim();
    if value.len() >= UNIT_SUFFIX.len() {
        let split = value.len() - UNIT_SUFFIX.len();
        if value.is_char_boundary(split) && value[split..].eq_ignore_ascii_case(UNIT_SUFFIX) {
            value = value[..split].trim_end();
        }
    }
    if value.is_empty() {
        return Err(LineSkip::EmptyValue);
    }
    if value.eq_ignore_ascii_case("unlimited") {
        return Ok(Remaining::Unlimited);
    }
    match value.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(Remaining::Amount(v)),
        _ => Ok(Remaining::Unresolved(value.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(s: &str) -> Ipv4Addr {
        s.parse().unwrap()
    }

    #[test]
    fn two_ips_share_fractional_value() {
        let l = parse_line("- 10.0.0.1, 10.0.0.2 | remaining: 0.4GB").unwrap();
        assert_eq!(l.ips, vec![ip("10.0.0.1"), ip("10.0.0.2")]);
        assert_eq!(l.remaining, Remaining::Amount(0.4));
    }

    #[test]
    fn identifying_segment_and_middle_fields() {
        let l = parse_line("vps-web-01 - 192.168.1.5 | used: 12GB | remaining: 488 GB").unwrap();
        assert_eq!(l.ips, vec![ip("192.168.1.5")]);
        assert_eq!(l.remaining, Remaining::Amount(488.0));
    }

    #[test]
    fn colon_in_value_label_uses_last_colon() {
        let l = parse_line("srv - 10.0.0.1 | remaining (as of 12:00): 5GB").unwrap();
        assert_eq!(l.ips, vec![ip("10.0.0.1")]);
        assert_eq!(l.remaining, Remaining::Amount(5.0));
        let l = parse_line("srv - 10.0.0.1 | note: left: unlimited").unwrap();
        assert_eq!(l.remaining, Remaining::Unlimited);
    }

    #[test]
    fn unlimited_and_unresolved_values() {
        let l = parse_line("srv - 10.0.0.9 | remaining: Unlimited").unwrap();
        assert_eq!(l.remaining, Remaining::Unlimited);
        let l = parse_line("srv - 10.0.0.9 | remaining: n/a").unwrap();
        assert_eq!(l.remaining, Remaining::Unresolved("n/a".into()));
    }

    #[test]
    fn suffix_is_optional_and_case_insensitive() {
        assert_eq!(
            parse_line("- 10.0.0.1 | left: 25").unwrap().remaining,
            Remaining::Amount(25.0)
        );
        assert_eq!(
            parse_line("- 10.0.0.1 | left: -3.5gb").unwrap().remaining,
            Remaining::Amount(-3.5)
        );
    }

    #[test]
    fn malformed_lines_are_skipped_with_reason() {
        assert_eq!(parse_line(""), Err(LineSkip::Blank));
        assert_eq!(parse_line("# header"), Err(LineSkip::Blank));
        assert_eq!(
            parse_line("- 10.0.0.1 remaining: 5GB"),
            Err(LineSkip::NoFieldSeparator)
        );
        assert_eq!(
            parse_line("10.0.0.1 | remaining: 5GB"),
            Err(LineSkip::NoIpMarker)
        );
        assert_eq!(parse_line("- | remaining: 5GB"), Err(LineSkip::EmptyIpList));
        assert_eq!(
            parse_line("- 10.0.0.1, host.example | remaining: 5GB"),
            Err(LineSkip::InvalidIp("host.example".into()))
        );
        assert_eq!(
            parse_line("- 10.0.0.1 | remaining 5GB"),
            Err(LineSkip::NoValueSeparator)
        );
        assert_eq!(
            parse_line("- 10.0.0.1 | remaining: GB"),
            Err(LineSkip::EmptyValue)
        );
        assert_eq!(
            parse_line("- 300.0.0.1 | remaining: 5GB"),
            Err(LineSkip::InvalidIp("300.0.0.1".into()))
        );
    }

    #[test]
    fn last_marker_wins_in_identifying_segment() {
        let l = parse_line("rack - a - 10.2.0.1 | remaining: 7GB").unwrap();
        assert_eq!(l.ips, vec![ip("10.2.0.1")]);
    }
}
