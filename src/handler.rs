//! The delegating handler that records or replays.
//!
//! One [MockHandler] is attached to each client created during a test. Its
//! mode comes from the test's session and never changes.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, info};

use crate::ids::HandlerId;
use crate::interaction::Interaction;
use crate::matcher::Matcher;
use crate::normalizer::Normalizer;
use crate::session::{Session, SessionMode};
use crate::transport::{DelegatingHandler, HttpRequest, HttpResponse, Transport};
use crate::Error;

/// Mode of a handler, fixed when it is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerMode {
    Recording,
    Playback,
}

impl From<SessionMode> for HandlerMode {
    fn from(mode: SessionMode) -> Self {
        match mode {
            SessionMode::Recording => HandlerMode::Recording,
            SessionMode::Playback => HandlerMode::Playback,
        }
    }
}

/// Sits in a client's pipeline and records or replays every call it sees.
///
/// In playback the network is never touched: a request without a recorded
/// counterpart fails instead of falling through to the transport.
pub struct MockHandler {
    id: HandlerId,
    mode: HandlerMode,
    session: Arc<Session>,
    matcher: Arc<dyn Matcher>,
    normalizer: Arc<Normalizer>,
    disposed: AtomicBool,
}

impl MockHandler {
    pub fn new(session: Arc<Session>, matcher: Arc<dyn Matcher>, normalizer: Arc<Normalizer>) -> Self {
        Self {
            id: HandlerId::next(),
            mode: session.mode().into(),
            session,
            matcher,
            normalizer,
            disposed: AtomicBool::new(false),
        }
    }

    pub fn mode(&self) -> HandlerMode {
        self.mode
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Marks the handler unusable. Performs no I/O. Returns false if it was already disposed.
    pub fn dispose(&self) -> bool {
        let first = !self.disposed.swap(true, Ordering::SeqCst);
        if first {
            debug!("disposed mock handler {} for '{}'", self.id, self.session.test_id());
        }
        first
    }

    fn playback(&self, request: &HttpRequest) -> Result<HttpResponse, Error> {
        let normalized = self.normalizer.normalize(request);
        let interaction = self.session.next_match(&normalized, self.matcher.as_ref())?;
        Ok(interaction.response())
    }

    fn record(&self, request: &HttpRequest, next: &dyn Transport) -> Result<HttpResponse, Error> {
        let response = next.send(request)?;

        let normalized = self.normalizer.normalize(request);
        info!("recording {} -> {}", normalized.debug_key(), response.status);
        self.session.record(Interaction::new(&normalized, &response))?;

        Ok(response)
    }
}

impl DelegatingHandler for MockHandler {
    fn id(&self) -> HandlerId {
        self.id
    }

    fn handle(&self, request: &HttpRequest, next: &dyn Transport) -> Result<HttpResponse, Error> {
        if self.is_disposed() {
            return Err(Error::HandlerDisposed(self.id));
        }

        match self.mode {
            HandlerMode::Playback => self.playback(request),
            HandlerMode::Recording => self.record(request, next),
        }
    }
}

impl fmt::Debug for MockHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockHandler")
            .field("id", &self.id)
            .field("mode", &self.mode)
            .field("test_id", &self.session.test_id())
            .field("matcher", &self.matcher)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
