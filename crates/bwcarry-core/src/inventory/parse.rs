//! Decode the panel's inventory JSON into [`ServerRecord`]s.

use serde_json::{Map, Value};
use std::net::Ipv4Addr;

use super::FetchError;
use crate::model::{RawAmount, ServerId, ServerRecord};

/// Name of the field holding the server list.
pub(crate) const INVENTORY_FIELD: &str = "vs";

/// Parses an inventory response.
///
/// `vs` may be an object keyed by server id or an array. When `require_field`
/// is false (paged requests) a missing or null `vs` reads as an empty page.
pub(crate) fn parse_inventory(
    body: &str,
    require_field: bool,
) -> Result<Vec<ServerRecord>, FetchError> {
    let root: Value = serde_json::from_str(body).map_err(|e| FetchError::Malformed(e.to_string()))?;
    let list: Vec<ServerRecord> = match root.get(INVENTORY_FIELD) {
        Some(Value::Object(map)) => map
            .iter()
            .filter_map(|(key, v)| record_from(Some(key), v))
            .collect(),
        Some(Value::Array(items)) => items.iter().filter_map(|v| record_from(None, v)).collect(),
        Some(Value::Null) | None if !require_field => Vec::new(),
        Some(other) => {
            return Err(FetchError::Malformed(format!(
                "`{}` is neither an object nor an array: {}",
                INVENTORY_FIELD,
                type_name(other)
            )))
        }
        None => return Err(FetchError::MissingField(INVENTORY_FIELD)),
    };
    Ok(list)
}

fn record_from(key: Option<&str>, v: &Value) -> Option<ServerRecord> {
    let Value::Object(fields) = v else {
        tracing::warn!(key = ?key, "inventory entry is not an object; ignored");
        return None;
    };
    let id = fields
        .get("vpsid")
        .and_then(id_from_value)
        .or_else(|| key.and_then(|k| k.parse::<ServerId>().ok()));
    let Some(id) = id else {
        tracing::warn!(key = ?key, "inventory entry without a usable server id; ignored");
        return None;
    };
    Some(ServerRecord {
        id,
        bandwidth_limit: amount(fields, "bandwidth"),
        bandwidth_used: amount(fields, "used_bandwidth"),
        plan_id: fields.get("plid").map(text_of).unwrap_or_default(),
        ip_addresses: ips_of(fields.get("ips")),
    })
}

fn id_from_value(v: &Value) -> Option<ServerId> {
    match v {
        Value::Number(n) => n.as_u64().map(ServerId),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn amount(fields: &Map<String, Value>, name: &str) -> RawAmount {
    RawAmount::new(fields.get(name).map(text_of).unwrap_or_default())
}

fn text_of(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Collects dotted-quad addresses from an object of id→address, an array, or a single string.
/// Order is preserved; duplicates and non-IPv4 values are dropped.
fn ips_of(v: Option<&Value>) -> Vec<Ipv4Addr> {
    let candidates: Vec<&str> = match v {
        Some(Value::Object(map)) => map.values().filter_map(Value::as_str).collect(),
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
        Some(Value::String(s)) => s.split(',').collect(),
        _ => Vec::new(),
    };
    let mut out = Vec::with_capacity(candidates.len());
    for c in candidates {
        if let Ok(ip) = c.trim().parse::<Ipv4Addr>() {
            if !out.contains(&ip) {
                out.push(ip);
            }
        }
    }
    out
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
