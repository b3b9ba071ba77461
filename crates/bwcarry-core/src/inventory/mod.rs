//! Inventory fetcher.
//!
//! Requests the full server list in one call. When the result is no larger
//! than the panel's page size it may have been truncated server-side, so a
//! pagination sweep follows: pages 0, 1, 2, ... until two consecutive empty
//! pages or the page ceiling. Pages are merged by server id; if the sweep
//! yields nothing the single-shot result stands.

mod parse;

use std::collections::BTreeMap;
use thiserror::Error;

use crate::api::TransportError;
use crate::config::InventoryConfig;
use crate::model::{ServerId, ServerRecord};
use crate::panel::{PageRequest, PanelApi};

/// The inventory could not be obtained. Always fatal for the run.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("inventory request failed: {0}")]
    Transport(#[from] TransportError),
    #[error("inventory response has no `{0}` field")]
    MissingField(&'static str),
    #[error("inventory response malformed: {0}")]
    Malformed(String),
}

/// Fetches the complete inventory snapshot for the run, sorted by server id.
pub fn fetch_all(
    panel: &PanelApi,
    opts: &InventoryConfig,
) -> Result<Vec<ServerRecord>, FetchError> {
    let body = panel.list_servers(None)?;
    let first = parse::parse_inventory(&body, true)?;
    tracing::info!(count = first.len(), "single-shot inventory fetched");

    if first.len() > opts.page_size as usize {
        return Ok(merge_pages(vec![first]));
    }

    tracing::debug!(
        page_size = opts.page_size,
        "result fits in one page; sweeping pages in case of truncation"
    );
    let pages = sweep_pages(opts.max_pages, |page| {
        let body = panel.list_servers(Some(PageRequest {
            page,
            size: opts.page_size,
        }))?;
        parse::parse_inventory(&body, false)
    })?;
    let merged = merge_pages(pages);
    if merged.is_empty() {
        tracing::debug!("pagination sweep returned nothing; using single-shot result");
        return Ok(merge_pages(vec![first]));
    }
    tracing::info!(count = merged.len(), "inventory assembled from pages");
    Ok(merged)
}

/// Requests pages from 0 until two consecutive empty pages or `max_pages` requests.
/// Returns the non-empty pages in request order.
pub(crate) fn sweep_pages<F>(
    max_pages: u32,
    mut fetch_page: F,
) -> Result<Vec<Vec<ServerRecord>>, FetchError>
where
    F: FnMut(u32) -> Result<Vec<ServerRecord>, FetchError>,
{
    let mut pages = Vec::new();
    let mut consecutive_empty = 0u32;
    for page in 0..max_pages {
        let records = fetch_page(page)?;
        tracing::debug!(page, count = records.len(), "inventory page");
        if records.is_empty() {
            consecutive_empty += 1;
            if consecutive_empty >= 2 {
                return Ok(pages);
            }
        } else {
            consecutive_empty = 0;
            pages.push(records);
        }
    }
    tracing::warn!(max_pages, "pagination sweep hit the page ceiling");
    Ok(pages)
}

/// Union of pages keyed by server id. The first occurrence of an id is kept.
pub(crate) fn merge_pages(pages: Vec<Vec<ServerRecord>>) -> Vec<ServerRecord> {
    let mut by_id: BTreeMap<ServerId, ServerRecord> = BTreeMap::new();
    for record in pages.into_iter().flatten() {
        by_id.entry(record.id).or_insert(record);
    }
    by_id.into_values().collect()
}
