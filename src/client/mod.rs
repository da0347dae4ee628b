//! Client-side seams the recorder plugs into.
//!
//! SDK adapters implement [ClientPipeline] for the clients they construct and
//! fire [ClientEvents::notify_created] whenever one is built. [ServiceClient]
//! and [ClientFactory] are a ready-made implementation of both sides.

use std::fmt;
use std::sync::{Arc, RwLock};

use log::debug;

use crate::ids::HandlerId;
use crate::transport::{DelegatingHandler, HttpRequest, HttpResponse, Next, Transport};
use crate::Error;

mod events;

pub use events::{ClientCreationHook, ClientEvents, ClientObserver};

/// A constructed client whose outbound pipeline accepts injected handlers.
pub trait ClientPipeline: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Appends `handler` as the innermost stage of the pipeline.
    fn attach_handler(&self, handler: Arc<dyn DelegatingHandler>) -> Result<(), Error>;

    /// Removes the handler with `id`. Returns false if it was not attached.
    fn detach_handler(&self, id: HandlerId) -> Result<bool, Error>;

    fn handler_count(&self) -> usize;
}

/// A named client sending requests through its handler chain to a transport.
pub struct ServiceClient {
    name: String,
    transport: Arc<dyn Transport>,
    handlers: RwLock<Vec<Arc<dyn DelegatingHandler>>>,
}

impl ServiceClient {
    pub fn new(name: &str, transport: Arc<dyn Transport>) -> Self {
        Self {
            name: name.to_string(),
            transport,
            handlers: RwLock::new(Vec::new()),
        }
    }

    pub fn send(&self, request: &HttpRequest) -> Result<HttpResponse, Error> {
        // Snapshot so handlers can be attached or detached while a call is in flight.
        let handlers = self.handlers.read()?.clone();
        Next::new(&handlers, self.transport.as_ref()).send(request)
    }
}

impl ClientPipeline for ServiceClient {
    fn name(&self) -> &str {
        &self.name
    }

    fn attach_handler(&self, handler: Arc<dyn DelegatingHandler>) -> Result<(), Error> {
        debug!("attaching handler {} to client {}", handler.id(), self.name);
        self.handlers.write()?.push(handler);
        Ok(())
    }

    fn detach_handler(&self, id: HandlerId) -> Result<bool, Error> {
        let mut handlers = self.handlers.write()?;
        let before = handlers.len();
        handlers.retain(|handler| handler.id() != id);

        let removed = handlers.len() != before;
        if removed {
            debug!("detached handler {id} from client {}", self.name);
        }
        Ok(removed)
    }

    fn handler_count(&self) -> usize {
        self.handlers.read().map(|handlers| handlers.len()).unwrap_or_default()
    }
}

impl fmt::Debug for ServiceClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceClient")
            .field("name", &self.name)
            .field("handlers", &self.handler_count())
            .finish()
    }
}

/// Builds [ServiceClient]s and announces each one on a [ClientEvents] hook.
#[derive(Clone)]
pub struct ClientFactory {
    transport: Arc<dyn Transport>,
    events: Arc<ClientEvents>,
}

impl ClientFactory {
    pub fn new(transport: Arc<dyn Transport>, events: Arc<ClientEvents>) -> Self {
        Self { transport, events }
    }

    pub fn events(&self) -> &Arc<ClientEvents> {
        &self.events
    }

    /// Constructs a client and notifies every subscribed observer before returning it.
    pub fn create(&self, name: &str) -> Result<Arc<ServiceClient>, Error> {
        let client = Arc::new(ServiceClient::new(name, Arc::clone(&self.transport)));
        self.events.notify_created(client.clone())?;
        Ok(client)
    }
}

impl fmt::Debug for ClientFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientFactory").field("events", &self.events).finish()
    }
}

#[cfg(test)]
mod tests;
