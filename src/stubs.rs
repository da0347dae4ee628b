use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use crate::client::{ClientCreationHook, ClientEvents, ClientObserver};
use crate::ids::SubscriptionId;
use crate::transport::{HttpRequest, HttpResponse, Transport};
use crate::Error;

/// Transport that serves queued responses and remembers every request it saw.
#[derive(Debug, Default)]
pub(crate) struct TransportStub {
    pub requests: RwLock<Vec<HttpRequest>>,
    pub responses: Mutex<VecDeque<HttpResponse>>,
    pub fallback: Option<HttpResponse>,
}

impl TransportStub {
    pub fn responding(response: HttpResponse) -> Self {
        Self {
            fallback: Some(response),
            ..Default::default()
        }
    }

    pub fn with_responses(responses: Vec<HttpResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            ..Default::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.requests.read().unwrap().len()
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.read().unwrap().clone()
    }
}

impl Transport for TransportStub {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, Error> {
        self.requests.write().unwrap().push(request.clone());

        if let Some(response) = self.responses.lock().unwrap().pop_front() {
            return Ok(response);
        }

        match &self.fallback {
            Some(response) => Ok(response.clone()),
            None => Err(Error::Transport(format!("no stubbed response for {} {}", request.method, request.path))),
        }
    }
}

/// Hook that counts subscribe/unsubscribe calls while delegating to [ClientEvents].
#[derive(Debug, Default)]
pub(crate) struct CountingHook {
    pub events: ClientEvents,
    pub subscribes: AtomicUsize,
    pub unsubscribes: AtomicUsize,
}

impl CountingHook {
    pub fn subscribe_count(&self) -> usize {
        self.subscribes.load(Ordering::SeqCst)
    }

    pub fn unsubscribe_count(&self) -> usize {
        self.unsubscribes.load(Ordering::SeqCst)
    }
}

impl ClientCreationHook for CountingHook {
    fn subscribe(&self, observer: Arc<dyn ClientObserver>) -> SubscriptionId {
        self.subscribes.fetch_add(1, Ordering::SeqCst);
        self.events.subscribe(observer)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.unsubscribes.fetch_add(1, Ordering::SeqCst);
        self.events.unsubscribe(id)
    }
}
