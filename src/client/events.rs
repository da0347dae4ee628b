//! The client-creation hook.
//!
//! Observers subscribed to a [ClientEvents] are called, in subscription order,
//! for every client built while they are subscribed.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use log::{debug, warn};

use super::ClientPipeline;
use crate::ids::SubscriptionId;
use crate::Error;

/// Receives every client constructed while subscribed.
pub trait ClientObserver: Send + Sync {
    fn on_client_created(&self, client: Arc<dyn ClientPipeline>) -> Result<(), Error>;
}

/// Subscribe/unsubscribe point fired on client construction.
pub trait ClientCreationHook: Send + Sync {
    fn subscribe(&self, observer: Arc<dyn ClientObserver>) -> SubscriptionId;

    /// Returns false if `id` was not subscribed.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;
}

/// The default hook: an ordered list of observers.
#[derive(Default)]
pub struct ClientEvents {
    observers: RwLock<Vec<(SubscriptionId, Arc<dyn ClientObserver>)>>,
}

impl ClientEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscriber_count(&self) -> usize {
        self.observers.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Fires the creation event. Stops at the first observer that fails.
    pub fn notify_created(&self, client: Arc<dyn ClientPipeline>) -> Result<(), Error> {
        let observers: Vec<Arc<dyn ClientObserver>> = self.observers.read()?.iter().map(|(_, observer)| Arc::clone(observer)).collect();

        debug!("client {} created, notifying {} observer(s)", client.name(), observers.len());

        for observer in observers {
            observer.on_client_created(Arc::clone(&client))?;
        }
        Ok(())
    }
}

impl ClientCreationHook for ClientEvents {
    fn subscribe(&self, observer: Arc<dyn ClientObserver>) -> SubscriptionId {
        let id = SubscriptionId::next();
        self.observers.write().unwrap_or_else(PoisonError::into_inner).push((id, observer));
        debug!("client observer {id} subscribed");
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut observers = self.observers.write().unwrap_or_else(PoisonError::into_inner);
        let before = observers.len();
        observers.retain(|(existing, _)| *existing != id);

        let removed = observers.len() != before;
        if removed {
            debug!("client observer {id} unsubscribed");
        } else {
            warn!("client observer {id} was not subscribed");
        }
        removed
    }
}

impl fmt::Debug for ClientEvents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientEvents").field("subscribers", &self.subscriber_count()).finish()
    }
}
