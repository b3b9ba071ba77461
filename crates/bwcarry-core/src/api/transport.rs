//! HTTP transport seam. [`CurlTransport`] is the libcurl implementation.

use std::time::Duration;

use crate::config::HttpConfig;

/// One outgoing call. GET when `body` is `None`, form-encoded POST otherwise.
#[derive(Debug, Clone, Copy)]
pub struct HttpRequest<'a> {
    pub url: &'a str,
    pub body: Option<&'a str>,
}

impl HttpRequest<'_> {
    pub fn method(&self) -> &'static str {
        if self.body.is_some() {
            "POST"
        } else {
            "GET"
        }
    }
}

/// Status code and body of a completed exchange (any status).
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u32,
    pub body: String,
}

/// Why a call produced no response at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportFailure {
    /// The peer's certificate could not be verified.
    CertificateVerification(String),
    /// Anything else: DNS, connect, timeout, redirect loop, ...
    Other(String),
}

/// Performs a single HTTP exchange. Implementations must be shareable across worker threads.
pub trait Transport: Send + Sync {
    fn perform(
        &self,
        request: &HttpRequest<'_>,
        verify_tls: bool,
    ) -> Result<HttpResponse, TransportFailure>;
}

/// Blocking libcurl transport: one `Easy` handle per call.
#[derive(Debug, Clone)]
pub struct CurlTransport {
    connect_timeout: Duration,
    timeout: Duration,
    max_redirections: u32,
}

impl CurlTransport {
    pub fn new(http: &HttpConfig) -> Self {
        Self {
            connect_timeout: http.connect_timeout(),
            timeout: http.timeout(),
            max_redirections: http.max_redirections,
        }
    }

    fn exchange(
        &self,
        request: &HttpRequest<'_>,
        verify_tls: bool,
    ) -> Result<HttpResponse, curl::Error> {
        let mut body: Vec<u8> = Vec::new();

        let mut easy = curl::easy::Easy::new();
        easy.url(request.url)?;
        easy.follow_location(true)?;
        easy.max_redirections(self.max_redirections)?;
        easy.connect_timeout(self.connect_timeout)?;
        easy.timeout(self.timeout)?;
        easy.ssl_verify_peer(verify_tls)?;
        easy.ssl_verify_host(verify_tls)?;
        if let Some(payload) = request.body {
            easy.post(true)?;
            easy.post_fields_copy(payload.as_bytes())?;
        }

        {
            let mut transfer = easy.transfer();
            transfer.write_function(|data| {
                body.extend_from_slice(data);
                Ok(data.len())
            })?;
            transfer.perform()?;
        }

        let status = easy.response_code()?;
        Ok(HttpResponse {
            status,
            body: String::from_utf8_lossy(&body).into_owned(),
        })
    }
}

impl Transport for CurlTransport {
    fn perform(
        &self,
        request: &HttpRequest<'_>,
        verify_tls: bool,
    ) -> Result<HttpResponse, TransportFailure> {
        self.exchange(request, verify_tls)
            .map_err(|e| classify_curl_error(&e))
    }
}

/// Separates certificate-verification failures (eligible for the insecure retry) from the rest.
pub fn classify_curl_error(e: &curl::Error) -> TransportFailure {
    if e.is_peer_failed_verification()
        || e.is_ssl_cacert()
        || e.is_ssl_cacert_badfile()
        || e.is_ssl_certproblem()
    {
        return TransportFailure::CertificateVerification(e.to_string());
    }
    TransportFailure::Other(e.to_string())
}
