//! Per-test setup and teardown.
//!
//! [SessionManager::begin] picks record or playback for a test, subscribes to
//! the client-creation hook and returns a [TestScope]. Every client built while
//! the scope is alive gets a fresh [MockHandler] bound to the test's session.
//! Teardown runs when the scope is finished or dropped, including during a
//! panic unwind:
//!
//! 1. the hook subscription is released
//! 2. the registry is closed, then every handler is detached and disposed, in creation order
//! 3. the session is sealed and, if anything new was recorded, persisted
//!
//! If persisting fails the test stays active with its recording intact, so
//! [SessionManager::end] can be called again to retry the save.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use log::{debug, error, info};

use crate::client::{ClientCreationHook, ClientObserver, ClientPipeline};
use crate::config::{RecordMode, RecorderConfig};
use crate::handler::MockHandler;
use crate::ids::SubscriptionId;
use crate::matcher::{Matcher, SimpleMatcher};
use crate::normalizer::Normalizer;
use crate::registry::Registry;
use crate::session::Session;
use crate::store::InteractionStore;
use crate::Error;

/// What teardown did for one test.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TeardownReport {
    pub handlers_disposed: usize,
    /// Number of interactions persisted, if the recording was written.
    pub interactions_flushed: Option<usize>,
    pub unsubscribed: bool,
}

struct ActiveTest {
    session: Arc<Session>,
    registry: Arc<Registry>,
    hook: Arc<dyn ClientCreationHook>,
    // None once released.
    subscription: Option<SubscriptionId>,
}

pub struct SessionManager {
    config: RecorderConfig,
    store: Arc<dyn InteractionStore>,
    normalizer: Arc<Normalizer>,
    matcher: Arc<dyn Matcher>,
    active: Mutex<HashMap<String, ActiveTest>>,
}

impl SessionManager {
    /// Creates a manager. Fails if a configured scrub pattern is not a valid regex.
    pub fn new(config: RecorderConfig, store: Arc<dyn InteractionStore>) -> Result<Arc<Self>, Error> {
        Self::with_matcher(config, store, Arc::new(SimpleMatcher))
    }

    /// Creates a manager whose sessions use `matcher` unless told otherwise.
    pub fn with_matcher(config: RecorderConfig, store: Arc<dyn InteractionStore>, matcher: Arc<dyn Matcher>) -> Result<Arc<Self>, Error> {
        let normalizer = Arc::new(Normalizer::new(&config.scrub)?);
        Ok(Arc::new(Self {
            config,
            store,
            normalizer,
            matcher,
            active: Mutex::new(HashMap::new()),
        }))
    }

    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    /// Starts `test_id` with the default matcher.
    pub fn begin(self: &Arc<Self>, test_id: &str, hook: Arc<dyn ClientCreationHook>) -> Result<TestScope, Error> {
        self.begin_with_matcher(test_id, hook, Arc::clone(&self.matcher))
    }

    pub fn begin_with_matcher(
        self: &Arc<Self>,
        test_id: &str,
        hook: Arc<dyn ClientCreationHook>,
        matcher: Arc<dyn Matcher>,
    ) -> Result<TestScope, Error> {
        let mut active = self.active.lock()?;
        if active.contains_key(test_id) {
            return Err(Error::SessionActive(test_id.to_string()));
        }

        let session = Arc::new(self.open_session(test_id)?);
        let registry = Arc::new(Registry::new());

        let observer = Arc::new(TestObserver {
            session: Arc::clone(&session),
            registry: Arc::clone(&registry),
            matcher,
            normalizer: Arc::clone(&self.normalizer),
        });
        let subscription = hook.subscribe(observer);

        info!("began '{test_id}' in {:?} mode", session.mode());

        active.insert(
            test_id.to_string(),
            ActiveTest {
                session: Arc::clone(&session),
                registry: Arc::clone(&registry),
                hook,
                subscription: Some(subscription),
            },
        );

        Ok(TestScope {
            test_id: test_id.to_string(),
            session,
            registry,
            manager: Arc::clone(self),
            finished: false,
        })
    }

    fn open_session(&self, test_id: &str) -> Result<Session, Error> {
        let recorded = self.store.exists(test_id);

        match (self.config.mode, recorded) {
            (RecordMode::Record, _) | (RecordMode::Auto, false) => Ok(Session::recording(test_id)),
            (RecordMode::Playback, false) => Err(Error::RecordingMissing(test_id.to_string())),
            (RecordMode::Playback, true) | (RecordMode::Auto, true) => {
                let recording = self.store.load(test_id)?;
                debug!("loaded {} interaction(s) for '{test_id}'", recording.interactions.len());
                Ok(Session::playback(test_id, recording))
            }
        }
    }

    pub fn is_active(&self, test_id: &str) -> bool {
        self.active.lock().map(|active| active.contains_key(test_id)).unwrap_or(false)
    }

    /// Tears down `test_id`. Calling it for a test that never began, or twice, is a no-op.
    ///
    /// A failed save leaves the test active so a later call retries it.
    pub fn end(&self, test_id: &str) -> Result<TeardownReport, Error> {
        let Some(mut test) = self.active.lock()?.remove(test_id) else {
            debug!("end called for inactive test '{test_id}'");
            return Ok(TeardownReport::default());
        };

        let unsubscribed = match test.subscription.take() {
            Some(subscription) => test.hook.unsubscribe(subscription),
            None => false,
        };
        let handlers_disposed = test.registry.dispose_all();

        let interactions_flushed = match test.session.seal()? {
            Some(recording) => {
                let count = recording.interactions.len();
                if let Err(e) = self.store.save(test_id, &recording) {
                    error!("failed to persist {count} interaction(s) for '{test_id}', end can be retried: {e}");
                    self.active.lock()?.insert(test_id.to_string(), test);
                    return Err(e);
                }
                test.session.mark_flushed()?;
                info!("flushed {count} interaction(s) for '{test_id}'");
                Some(count)
            }
            None => None,
        };

        Ok(TeardownReport {
            handlers_disposed,
            interactions_flushed,
            unsubscribed,
        })
    }
}

impl fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionManager")
            .field("config", &self.config)
            .field("matcher", &self.matcher)
            .finish()
    }
}

/// Attaches a mock handler to each client created during one test.
struct TestObserver {
    session: Arc<Session>,
    registry: Arc<Registry>,
    matcher: Arc<dyn Matcher>,
    normalizer: Arc<Normalizer>,
}

impl ClientObserver for TestObserver {
    fn on_client_created(&self, client: Arc<dyn ClientPipeline>) -> Result<(), Error> {
        let handler = Arc::new(MockHandler::new(
            Arc::clone(&self.session),
            Arc::clone(&self.matcher),
            Arc::clone(&self.normalizer),
        ));

        let name = client.name().to_string();
        if self.registry.attach(client, Arc::clone(&handler))? {
            debug!("attached {handler:?} to client {name}");
        } else {
            debug!("test '{}' already ended, client {name} is not mocked", self.session.test_id());
        }
        Ok(())
    }
}

/// Guard for one running test. Teardown runs on [TestScope::finish] or on drop.
pub struct TestScope {
    test_id: String,
    session: Arc<Session>,
    registry: Arc<Registry>,
    manager: Arc<SessionManager>,
    finished: bool,
}

impl TestScope {
    pub fn test_id(&self) -> &str {
        &self.test_id
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Shorthand for [Session::variable].
    pub fn variable<F>(&self, name: &str, generate: F) -> Result<String, Error>
    where
        F: FnOnce() -> String,
    {
        self.session.variable(name, generate)
    }

    pub fn finish(mut self) -> Result<TeardownReport, Error> {
        self.finished = true;
        self.manager.end(&self.test_id)
    }
}

impl Drop for TestScope {
    fn drop(&mut self) {
        if self.finished {
            return;
        }

        if let Err(e) = self.manager.end(&self.test_id) {
            error!("teardown of '{}' failed: {e}", self.test_id);
        }
    }
}

impl fmt::Debug for TestScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestScope")
            .field("test_id", &self.test_id)
            .field("mode", &self.session.mode())
            .field("handlers", &self.registry.len())
            .finish()
    }
}
