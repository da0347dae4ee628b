use std::sync::Mutex;

use crate::stubs::TransportStub;

use super::*;

#[derive(Default)]
struct RecordingObserver {
    created: Mutex<Vec<String>>,
}

impl ClientObserver for RecordingObserver {
    fn on_client_created(&self, client: Arc<dyn ClientPipeline>) -> Result<(), Error> {
        self.created.lock().unwrap().push(client.name().to_string());
        Ok(())
    }
}

struct FailingObserver;

impl ClientObserver for FailingObserver {
    fn on_client_created(&self, _client: Arc<dyn ClientPipeline>) -> Result<(), Error> {
        Err(Error::Transport("observer failed".into()))
    }
}

#[derive(Debug)]
struct ShortCircuit {
    id: HandlerId,
}

impl DelegatingHandler for ShortCircuit {
    fn id(&self) -> HandlerId {
        self.id
    }

    fn handle(&self, _request: &HttpRequest, _next: &dyn Transport) -> Result<HttpResponse, Error> {
        Ok(HttpResponse::new(299))
    }
}

fn factory() -> (Arc<TransportStub>, ClientFactory) {
    let transport = Arc::new(TransportStub::responding(HttpResponse::new(200).body("live")));
    let factory = ClientFactory::new(transport.clone(), Arc::new(ClientEvents::new()));
    (transport, factory)
}

#[test]
fn test_client_without_handlers_uses_transport() {
    let (transport, factory) = factory();
    let client = factory.create("compute").unwrap();

    let response = client.send(&HttpRequest::get("/locations")).unwrap();

    assert_eq!(response.text(), "live");
    assert_eq!(transport.call_count(), 1);
}

#[test]
fn test_attach_and_detach_handler() {
    let (transport, factory) = factory();
    let client = factory.create("compute").unwrap();
    let handler = Arc::new(ShortCircuit { id: HandlerId::next() });

    client.attach_handler(handler.clone()).unwrap();
    assert_eq!(client.handler_count(), 1);
    assert_eq!(client.send(&HttpRequest::get("/locations")).unwrap().status, 299);
    assert_eq!(transport.call_count(), 0);

    assert!(client.detach_handler(handler.id).unwrap());
    assert!(!client.detach_handler(handler.id).unwrap());
    assert_eq!(client.handler_count(), 0);
    assert_eq!(client.send(&HttpRequest::get("/locations")).unwrap().status, 200);
}

#[test]
fn test_factory_notifies_subscribers() {
    let (_, factory) = factory();
    let observer = Arc::new(RecordingObserver::default());
    let id = factory.events().subscribe(observer.clone());

    factory.create("storage").unwrap();
    factory.create("compute").unwrap();
    assert!(factory.events().unsubscribe(id));
    factory.create("network").unwrap();

    assert_eq!(*observer.created.lock().unwrap(), vec!["storage", "compute"]);
    assert_eq!(factory.events().subscriber_count(), 0);
}

#[test]
fn test_unsubscribe_unknown_id() {
    let events = ClientEvents::new();
    let id = events.subscribe(Arc::new(RecordingObserver::default()));

    assert!(events.unsubscribe(id));
    assert!(!events.unsubscribe(id));
}

#[test]
fn test_failing_observer_fails_construction() {
    let (_, factory) = factory();
    factory.events().subscribe(Arc::new(FailingObserver));

    let result = factory.create("compute");

    assert!(matches!(result, Err(Error::Transport(_))));
}
