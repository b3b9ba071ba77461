//! Test transports: canned replies in order, or routed by the `act`/`bwreset` query.
//! Plus a tracing sink for asserting on what reaches the diagnostic log.

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::MakeWriter;

use super::{HttpRequest, HttpResponse, Transport, TransportFailure};

/// What a test transport saw.
#[derive(Debug, Clone)]
pub(crate) struct RecordedCall {
    pub method: &'static str,
    pub url: String,
    pub body: Option<String>,
    pub verify_tls: bool,
}

pub(crate) type CallLog = Arc<Mutex<Vec<RecordedCall>>>;

/// Replays a fixed sequence of results, one per call.
pub(crate) struct ScriptedTransport {
    replies: Mutex<VecDeque<Result<HttpResponse, TransportFailure>>>,
    calls: CallLog,
}

impl ScriptedTransport {
    pub fn new(replies: Vec<Result<HttpResponse, TransportFailure>>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn calls(&self) -> CallLog {
        Arc::clone(&self.calls)
    }
}

impl Transport for ScriptedTransport {
    fn perform(
        &self,
        request: &HttpRequest<'_>,
        verify_tls: bool,
    ) -> Result<HttpResponse, TransportFailure> {
        self.calls.lock().unwrap().push(RecordedCall {
            method: request.method(),
            url: request.url.to_string(),
            body: request.body.map(str::to_string),
            verify_tls,
        });
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportFailure::Other("script exhausted".into())))
    }
}

/// Routes by request: the closure sees the URL and body and returns the reply.
pub(crate) struct RoutedTransport<F> {
    route: F,
    calls: CallLog,
}

impl<F> RoutedTransport<F>
where
    F: Fn(&str, Option<&str>) -> Result<HttpResponse, TransportFailure> + Send + Sync,
{
    pub fn new(route: F) -> Self {
        Self {
            route,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn calls(&self) -> CallLog {
        Arc::clone(&self.calls)
    }
}

impl<F> Transport for RoutedTransport<F>
where
    F: Fn(&str, Option<&str>) -> Result<HttpResponse, TransportFailure> + Send + Sync,
{
    fn perform(
        &self,
        request: &HttpRequest<'_>,
        verify_tls: bool,
    ) -> Result<HttpResponse, TransportFailure> {
        self.calls.lock().unwrap().push(RecordedCall {
            method: request.method(),
            url: request.url.to_string(),
            body: request.body.map(str::to_string),
            verify_tls,
        });
        (self.route)(request.url, request.body)
    }
}

pub(crate) fn json(body: &str) -> Result<HttpResponse, TransportFailure> {
    Ok(HttpResponse {
        status: 200,
        body: body.to_string(),
    })
}

/// Value of a query parameter in `url`, if present.
pub(crate) fn query_param(url: &str, name: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    parsed
        .query_pairs()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
}

/// Collects formatted tracing output in memory.
#[derive(Clone, Default)]
pub(crate) struct CapturedLog(Arc<Mutex<Vec<u8>>>);

impl CapturedLog {
    /// Runs `f` with a subscriber writing every level into this buffer.
    pub fn capture<R>(&self, f: impl FnOnce() -> R) -> R {
        let subscriber = tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(subscriber, f)
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for CapturedLog {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLog {
    type Writer = CapturedLog;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
