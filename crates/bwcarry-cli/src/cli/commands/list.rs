//! `bwcarry list` – show the inventory snapshot a run would use.

use anyhow::{Context, Result};
use bwcarry_core::calculator::normalize_amount;
use bwcarry_core::config::CarryConfig;
use bwcarry_core::inventory;
use bwcarry_core::orchestrator::connect;
use bwcarry_core::ServerRecord;

pub async fn run_list(cfg: CarryConfig) -> Result<()> {
    let servers = tokio::task::spawn_blocking(move || -> Result<Vec<ServerRecord>> {
        let panel = connect(&cfg, false)?;
        Ok(inventory::fetch_all(&panel, &cfg.inventory)?)
    })
    .await
    .context("inventory task panicked")??;

    if servers.is_empty() {
        println!("No servers in inventory.");
        return Ok(());
    }
    println!("{:<8} {:>10} {:>10} {:<6} {}", "ID", "LIMIT", "USED", "PLAN", "IPS");
    for s in &servers {
        let ips = s
            .ip_addresses
            .iter()
            .map(|ip| ip.to_string())
            .collect::<Vec<_>>()
            .join(",");
        println!(
            "{:<8} {:>10} {:>10} {:<6} {}",
            s.id.to_string(),
            normalize_amount(&s.bandwidth_limit).value,
            normalize_amount(&s.bandwidth_used).value,
            s.plan_id,
            if ips.is_empty() { "-" } else { ips.as_str() }
        );
    }
    println!("{} servers", servers.len());
    Ok(())
}
