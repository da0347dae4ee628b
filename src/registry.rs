//! Per-test bookkeeping of every mock handler attached during the test.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use crossbeam::queue::SegQueue;
use log::{debug, warn};

use crate::client::ClientPipeline;
use crate::handler::MockHandler;
use crate::transport::DelegatingHandler;
use crate::Error;

/// A client paired with the handler attached to it.
#[derive(Debug)]
pub struct RegistryEntry {
    pub client: Arc<dyn ClientPipeline>,
    pub handler: Arc<MockHandler>,
}

/// Append-only while the test runs, drained in creation order at teardown.
/// Appends may come from several threads at once.
///
/// Once closed the registry attaches nothing more, so every handler attached
/// to a client is reachable from here when teardown drains it.
#[derive(Default)]
pub struct Registry {
    entries: SegQueue<RegistryEntry>,
    // Attaching holds the read side for the whole attach + append.
    closed: RwLock<bool>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches `handler` to `client` and records the pair.
    ///
    /// Returns false without attaching if the registry was already closed. The
    /// handler is disposed in that case.
    pub fn attach(&self, client: Arc<dyn ClientPipeline>, handler: Arc<MockHandler>) -> Result<bool, Error> {
        let closed = self.closed.read()?;
        if *closed {
            handler.dispose();
            return Ok(false);
        }

        client.attach_handler(handler.clone())?;
        self.entries.push(RegistryEntry { client, handler });
        Ok(true)
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Closes the registry, then detaches and disposes every registered handler.
    /// Returns how many were disposed.
    pub fn dispose_all(&self) -> usize {
        // Waits for attaches in flight; later ones see the flag.
        *self.closed.write().unwrap_or_else(PoisonError::into_inner) = true;

        let mut disposed = 0;

        while let Some(entry) = self.entries.pop() {
            match entry.client.detach_handler(entry.handler.id()) {
                Ok(true) => {}
                Ok(false) => warn!("handler {} was no longer attached to client {}", entry.handler.id(), entry.client.name()),
                Err(e) => warn!("failed to detach handler {} from client {}: {e}", entry.handler.id(), entry.client.name()),
            }

            if entry.handler.dispose() {
                disposed += 1;
            }
        }

        debug!("disposed {disposed} mock handler(s)");
        disposed
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("entries", &self.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}
