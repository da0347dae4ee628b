use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use http_recorder::client::{ClientEvents, ClientFactory};
use http_recorder::transport::{HttpRequest, HttpResponse, Transport};
use http_recorder::Error;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Stands in for the network. Serves canned responses and counts calls.
#[derive(Default)]
pub struct FakeNetwork {
    responses: Mutex<VecDeque<HttpResponse>>,
    calls: AtomicUsize,
}

impl FakeNetwork {
    pub fn serving(responses: Vec<HttpResponse>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn offline() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Transport for FakeNetwork {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| Error::Transport(format!("network unavailable for {} {}", request.method, request.path)))
    }
}

/// A client factory plus the hook it fires.
pub fn factory(network: Arc<FakeNetwork>) -> (ClientFactory, Arc<ClientEvents>) {
    let events = Arc::new(ClientEvents::new());
    (ClientFactory::new(network, events.clone()), events)
}
