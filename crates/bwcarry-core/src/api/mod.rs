//! Authenticated panel calls.
//!
//! [`ApiClient`] issues GET/POST through a [`Transport`], retries once with
//! certificate verification disabled when verification fails, and redacts
//! credentials from everything it logs. Once that retry succeeds the client
//! stays insecure for the rest of its life; the switch never flips back.

mod error;
mod redact;
mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use error::TransportError;
pub use redact::{redact, truncate_for_log, REDACTED};
pub use transport::{
    classify_curl_error, CurlTransport, HttpRequest, HttpResponse, Transport, TransportFailure,
};

use std::sync::atomic::{AtomicBool, Ordering};

/// Response-body logging switches.
#[derive(Debug, Clone, Copy)]
pub struct ResponseLogging {
    pub enabled: bool,
    pub max_chars: usize,
}

impl Default for ResponseLogging {
    fn default() -> Self {
        Self {
            enabled: false,
            max_chars: 2000,
        }
    }
}

/// Panel HTTP client owning the sticky insecure-transport cell.
///
/// One instance per run; workers share it by reference.
pub struct ApiClient {
    transport: Box<dyn Transport>,
    insecure: AtomicBool,
    responses: ResponseLogging,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("insecure", &self.is_insecure())
            .field("responses", &self.responses)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    pub fn new(transport: Box<dyn Transport>, insecure: bool, responses: ResponseLogging) -> Self {
        Self {
            transport,
            insecure: AtomicBool::new(insecure),
            responses,
        }
    }

    /// True once certificate verification has been disabled (by config or by fallback).
    pub fn is_insecure(&self) -> bool {
        self.insecure.load(Ordering::Acquire)
    }

    /// Issues one call and returns the response body.
    ///
    /// GET when `body` is `None`, POST otherwise. Non-2xx statuses and transport
    /// failures become [`TransportError`] carrying whatever body was received.
    pub fn request(&self, url: &str, body: Option<&str>) -> Result<String, TransportError> {
        let request = HttpRequest { url, body };
        let shown = redact(url);
        let insecure = self.is_insecure();
        match body {
            Some(payload) => tracing::debug!(
                method = request.method(),
                url = %shown,
                payload = %redact(payload),
                insecure,
                "panel request"
            ),
            None => tracing::debug!(
                method = request.method(),
                url = %shown,
                insecure,
                "panel request"
            ),
        }

        let result = match self.transport.perform(&request, !insecure) {
            Err(TransportFailure::CertificateVerification(reason)) if !insecure => {
                tracing::warn!(
                    url = %shown,
                    "certificate verification failed ({}); retrying once without verification",
                    redact(&reason)
                );
                let retried = self.transport.perform(&request, false);
                if retried.is_ok() {
                    self.insecure.store(true, Ordering::Release);
                    tracing::warn!("TLS verification disabled for the remainder of this run");
                }
                retried
            }
            other => other,
        };

        match result {
            Ok(response) => self.finish(&shown, response),
            Err(TransportFailure::CertificateVerification(reason))
            | Err(TransportFailure::Other(reason)) => {
                let reason = redact(&reason);
                tracing::warn!(url = %shown, "transport failure: {}", reason);
                Err(TransportError {
                    url: shown,
                    reason,
                    status: None,
                    body: String::new(),
                })
            }
        }
    }

    fn finish(&self, shown: &str, response: HttpResponse) -> Result<String, TransportError> {
        if self.responses.enabled {
            let body = redact(&response.body);
            tracing::info!(
                url = %shown,
                status = response.status,
                "response: {}",
                truncate_for_log(&body, self.responses.max_chars)
            );
        }
        if !(200..300).contains(&response.status) {
            return Err(TransportError {
                url: shown.to_string(),
                reason: "unexpected HTTP status".to_string(),
                status: Some(response.status),
                body: response.body,
            });
        }
        Ok(response.body)
    }
}
