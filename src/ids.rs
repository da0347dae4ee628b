//! ID generation for handlers and hook subscriptions
//!
//! Handler IDs let a client pipeline detach exactly the handler a test attached.
//! Subscription IDs let a test release exactly its own hook subscription.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static HANDLER_IDS: IdGenerator = IdGenerator::new(1);
static SUBSCRIPTION_IDS: IdGenerator = IdGenerator::new(1);

/// Thread-safe ID generator using atomic operations
#[derive(Debug)]
pub struct IdGenerator {
    next_id: AtomicU64,
}

impl IdGenerator {
    /// Creates a new ID generator with the specified starting value
    pub const fn new(start: u64) -> Self {
        Self {
            next_id: AtomicU64::new(start),
        }
    }

    /// Gets the next ID, incrementing the internal counter
    pub fn next(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new(0)
    }
}

/// Identifies a handler attached to a client pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(u64);

impl HandlerId {
    pub(crate) fn next() -> Self {
        HandlerId(HANDLER_IDS.next())
    }
}

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identifies one subscription to a client-creation hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub(crate) fn next() -> Self {
        SubscriptionId(SUBSCRIPTION_IDS.next())
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_id_generator_sequence() {
        let generator = IdGenerator::new(100);
        assert_eq!(generator.next(), 100);
        assert_eq!(generator.next(), 101);
        assert_eq!(generator.next(), 102);
    }

    #[test]
    fn test_id_generator_thread_safety() {
        let generator = Arc::new(IdGenerator::default());
        let mut handles = vec![];

        for _ in 0..8 {
            let generator = Arc::clone(&generator);
            handles.push(thread::spawn(move || (0..100).map(|_| generator.next()).collect::<Vec<_>>()));
        }

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id), "duplicate id {id}");
            }
        }
        assert_eq!(seen.len(), 800);
    }

    #[test]
    fn test_handler_ids_are_unique() {
        let first = HandlerId::next();
        let second = HandlerId::next();
        assert_ne!(first, second);
        assert!(second > first);
    }
}
