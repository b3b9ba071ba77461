//! Per-call transport error.

use std::fmt;

/// A panel call that did not produce a usable response: libcurl failure or non-2xx status.
///
/// The URL is stored already redacted. `body` holds whatever the server sent, for diagnostics.
#[derive(Debug, Clone)]
pub struct TransportError {
    pub url: String,
    pub reason: String,
    pub status: Option<u32>,
    pub body: String,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(code) => write!(f, "{} returned HTTP {}: {}", self.url, code, self.reason),
            None => write!(f, "{}: {}", self.url, self.reason),
        }
    }
}

impl std::error::Error for TransportError {}
