//! Record and replay the HTTP traffic of service-client tests.
//!
//! A test run against live services once records every request and response
//! its clients make. Later runs replay those interactions from disk, so the
//! same test passes offline and deterministically.
//!
//! The moving parts:
//!
//! * [normalizer] strips volatile data (request ids, dates, continuation tokens) from requests
//! * [matcher] decides whether a stored interaction answers a request
//! * [handler::MockHandler] sits in a client's pipeline and records or replays
//! * [client] holds the pipeline seam and the client-creation hook
//! * [lifecycle::SessionManager] wires it together for one test at a time
//! * [store] persists one recording per test
//!
//! Recording vs playback is chosen per test from [config::RecordMode]. In the default
//! `Auto` mode a test records when no recording exists and replays otherwise.
//! The mode and recording directory can be overridden with the `HTTP_RECORDER_MODE`
//! and `HTTP_RECORDER_DIR` environment variables.
//!
//!```no_run
//!     use std::sync::Arc;
//!
//!     use http_recorder::client::{ClientEvents, ClientFactory};
//!     use http_recorder::prelude::*;
//!     use http_recorder::transport::{HttpRequest, HttpResponse, Transport};
//!
//!     struct Network;
//!
//!     impl Transport for Network {
//!         fn send(&self, _request: &HttpRequest) -> Result<HttpResponse, Error> {
//!             Ok(HttpResponse::new(200).body(r#"{"locations":["West US"]}"#))
//!         }
//!     }
//!
//!     fn main() -> Result<(), Error> {
//!         let config = RecorderConfig::from_env()?;
//!         let store = Arc::new(FileStore::new(config.recording_dir.clone()));
//!         let manager = SessionManager::new(config, store)?;
//!
//!         let events = Arc::new(ClientEvents::new());
//!         let factory = ClientFactory::new(Arc::new(Network), events.clone());
//!
//!         let scope = manager.begin("list_locations", events)?;
//!         let client = factory.create("compute")?;
//!         let response = client.send(&HttpRequest::get("/locations"))?;
//!         println!("{}", response.text());
//!         scope.finish()?;
//!         Ok(())
//!     }
//!```

pub mod client;
pub mod config;
mod errors;
pub mod handler;
pub mod ids;
pub mod interaction;
pub mod lifecycle;
pub mod matcher;
pub mod normalizer;
pub mod prelude;
pub mod registry;
pub mod session;
pub mod store;
pub mod transport;

#[cfg(test)]
pub(crate) mod stubs;

#[doc(inline)]
pub use errors::Error;
