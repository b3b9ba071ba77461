//! `bwcarry check-report` – dry parse of a usage report.

use anyhow::{bail, Context, Result};
use bwcarry_core::report::parse_report;
use std::path::Path;

pub fn run_check_report(path: &Path) -> Result<()> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read report {}", path.display()))?;
    let parsed = parse_report(&text);

    for (line_no, entry) in &parsed.accepted {
        let ips = entry
            .ips
            .iter()
            .map(|ip| ip.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        println!("line {:<5} ok    {} => {}", line_no, ips, entry.remaining);
    }
    for (line_no, reason) in &parsed.skipped {
        println!("line {:<5} skip  {}", line_no, reason);
    }
    println!(
        "{} accepted, {} skipped",
        parsed.accepted.len(),
        parsed.skipped.len()
    );
    if parsed.accepted.is_empty() {
        bail!("no usable entries in {}", path.display());
    }
    Ok(())
}
