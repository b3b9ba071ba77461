//! Minimal HTTP/1.1 panel stub for integration tests.
//!
//! Serves the admin API subset bwcarry uses: `act=vs` (full list, or paged
//! with `page`/`reslen`), `act=vs&bwreset=<id>`, and `act=managevps` POST.
//! Every request is recorded so tests can assert on what was called.

use serde_json::{json, Map, Value};
use std::collections::{HashMap, HashSet};
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

pub const API_KEY: &str = "test-key";
pub const API_SECRET: &str = "test-secret";

#[derive(Debug, Clone)]
pub struct Call {
    pub method: String,
    pub query: HashMap<String, String>,
    pub form: HashMap<String, String>,
}

impl Call {
    pub fn act(&self) -> &str {
        self.query.get("act").map(String::as_str).unwrap_or("")
    }
}

#[derive(Debug, Default)]
pub struct PanelState {
    /// Inventory records, each with a numeric `vpsid`.
    pub servers: Vec<Value>,
    /// When set, the single-shot listing returns only this many records.
    pub truncate_single_shot: Option<usize>,
    /// Resets for these ids answer `done: 0`.
    pub reset_rejects: HashSet<u64>,
    /// Updates for these ids answer HTTP 500.
    pub update_errors: HashSet<u64>,
    pub calls: Vec<Call>,
}

impl PanelState {
    pub fn resets(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .calls
            .iter()
            .filter_map(|c| c.query.get("bwreset").cloned())
            .collect();
        ids.sort();
        ids
    }

    /// (vpsid, bandwidth, plid) of every update call, sorted by vpsid.
    pub fn updates(&self) -> Vec<(String, String, String)> {
        let mut ups: Vec<(String, String, String)> = self
            .calls
            .iter()
            .filter(|c| c.act() == "managevps")
            .map(|c| {
                (
                    c.query.get("vpsid").cloned().unwrap_or_default(),
                    c.form.get("bandwidth").cloned().unwrap_or_default(),
                    c.form.get("plid").cloned().unwrap_or_default(),
                )
            })
            .collect();
        ups.sort();
        ups
    }
}

pub type SharedState = Arc<Mutex<PanelState>>;

/// Starts the stub in a background thread. Returns the endpoint URL
/// (e.g. "http://127.0.0.1:12345/index.php") and the shared state.
pub fn start(state: PanelState) -> (String, SharedState) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let state = Arc::new(Mutex::new(state));
    let server_state = Arc::clone(&state);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let state = Arc::clone(&server_state);
            thread::spawn(move || handle(stream, &state));
        }
    });
    (format!("http://127.0.0.1:{}/index.php", port), state)
}

fn handle(mut stream: TcpStream, state: &SharedState) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
    let Some((method, target, body)) = read_request(&mut stream) else {
        return;
    };
    let query: HashMap<String, String> = target
        .split_once('?')
        .map(|(_, q)| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default();
    let form: HashMap<String, String> = url::form_urlencoded::parse(body.as_bytes())
        .into_owned()
        .collect();
    let call = Call {
        method,
        query,
        form,
    };

    let (status, reply) = route(&call, &mut state.lock().unwrap());
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        reply.len(),
        reply
    );
    let _ = stream.write_all(response.as_bytes());
}

fn route(call: &Call, state: &mut PanelState) -> (&'static str, String) {
    state.calls.push(call.clone());
    if call.query.get("adminapikey").map(String::as_str) != Some(API_KEY)
        || call.query.get("adminapipass").map(String::as_str) != Some(API_SECRET)
    {
        return ("403 Forbidden", r#"{"error":"access denied"}"#.to_string());
    }
    match call.act() {
        "vs" => {
            if let Some(id) = call.query.get("bwreset") {
                let id: u64 = id.parse().unwrap_or(0);
                let done = if state.reset_rejects.contains(&id) { 0 } else { 1 };
                return ("200 OK", json!({ "done": done }).to_string());
            }
            let paging = (call.query.get("page"), call.query.get("reslen"));
            let records: Vec<&Value> = match paging {
                (Some(page), Some(size)) => {
                    let page: usize = page.parse().unwrap_or(0);
                    let size: usize = size.parse().unwrap_or(50);
                    state.servers.iter().skip(page * size).take(size).collect()
                }
                _ => {
                    let n = state.truncate_single_shot.unwrap_or(state.servers.len());
                    state.servers.iter().take(n).collect()
                }
            };
            let mut vs = Map::new();
            for r in records {
                vs.insert(r["vpsid"].to_string(), r.clone());
            }
            ("200 OK", json!({ "vs": vs }).to_string())
        }
        "managevps" => {
            let id: u64 = call
                .query
                .get("vpsid")
                .and_then(|v| v.parse().ok())
                .unwrap_or(0);
            if state.update_errors.contains(&id) {
                return ("500 Internal Server Error", r#"{"error":"db"}"#.to_string());
            }
            ("200 OK", json!({ "done": { "done": true } }).to_string())
        }
        _ => ("404 Not Found", "{}".to_string()),
    }
}

/// Reads one request: returns (method, request-target, body).
fn read_request(stream: &mut TcpStream) -> Option<(String, String, String)> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let n = stream.read(&mut chunk).ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };
    let head = String::from_utf8_lossy(&buf[..header_end]).into_owned();
    let mut lines = head.lines();
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let target = request_line.next()?.to_string();
    let content_length = lines
        .filter_map(|l| l.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.trim().parse::<usize>().ok())
        .unwrap_or(0);
    while buf.len() < header_end + content_length {
        let n = stream.read(&mut chunk).ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let end = (header_end + content_length).min(buf.len());
    let body = String::from_utf8_lossy(&buf[header_end..end]).into_owned();
    Some((method, target, body))
}
