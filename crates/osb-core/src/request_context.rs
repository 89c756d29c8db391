//! Per-request timing hooks, obtained from [`crate::cluster_client::ClusterClient::new_request_context`].
//!
//! Grounded on the original's `RequestContextHolder`: a handle threaded
//! through a runner invocation that marks where the "wire time" boundary
//! is, independent of how much bookkeeping the runner does around it. The
//! first `on_*_start` call wins (so a composite's several inner calls don't
//! clobber the outer start); every `on_*_end` call overwrites, so the
//! latest wins.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;

#[derive(Default)]
struct Inner {
    client_request_start: Option<Instant>,
    client_request_end: Option<Instant>,
    request_start: Option<Instant>,
    request_end: Option<Instant>,
}

/// A cheaply-cloneable handle around one request's timing marks.
#[derive(Clone, Default)]
pub struct RequestContext {
    inner: Arc<Mutex<Inner>>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_client_request_start(&self) {
        let mut inner = self.inner.lock();
        inner.client_request_start.get_or_insert_with(Instant::now);
    }

    pub fn on_client_request_end(&self) {
        self.inner.lock().client_request_end = Some(Instant::now());
    }

    pub fn on_request_start(&self) {
        let mut inner = self.inner.lock();
        inner.request_start.get_or_insert_with(Instant::now);
    }

    pub fn on_request_end(&self) {
        self.inner.lock().request_end = Some(Instant::now());
    }

    pub fn snapshot(&self) -> RequestContextSnapshot {
        let inner = self.inner.lock();
        RequestContextSnapshot {
            client_request_start: inner.client_request_start,
            client_request_end: inner.client_request_end,
            request_start: inner.request_start,
            request_end: inner.request_end,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RequestContextSnapshot {
    pub client_request_start: Option<Instant>,
    pub client_request_end: Option<Instant>,
    pub request_start: Option<Instant>,
    pub request_end: Option<Instant>,
}
