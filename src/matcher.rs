//! Strategies deciding whether a live request corresponds to a recorded interaction.
//!
//! Handlers only see `dyn Matcher`, so any strategy can be used per session.
//! When several recorded interactions match, the session consumes them in
//! recorded order.

use std::fmt;

use crate::interaction::Interaction;
use crate::normalizer::NormalizedRequest;

pub trait Matcher: Send + Sync + fmt::Debug {
    fn matches(&self, candidate: &NormalizedRequest, stored: &Interaction) -> bool;
}

/// Method, canonical path and normalized body must all be equal.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleMatcher;

impl Matcher for SimpleMatcher {
    fn matches(&self, candidate: &NormalizedRequest, stored: &Interaction) -> bool {
        candidate.method == stored.method && candidate.canonical_path == stored.canonical_path && candidate.body == stored.request_body
    }
}

/// Method and canonical path must be equal. Bodies are ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct IgnoreBodyMatcher;

impl Matcher for IgnoreBodyMatcher {
    fn matches(&self, candidate: &NormalizedRequest, stored: &Interaction) -> bool {
        candidate.method == stored.method && candidate.canonical_path == stored.canonical_path
    }
}

/// Method must be equal and the recorded path must be a leading run of whole
/// segments of the candidate's path. Query strings and bodies are ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathPrefixMatcher;

impl Matcher for PathPrefixMatcher {
    fn matches(&self, candidate: &NormalizedRequest, stored: &Interaction) -> bool {
        candidate.method == stored.method && is_segment_prefix(candidate.path_without_query(), stored.path_without_query())
    }
}

fn is_segment_prefix(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/') || prefix.ends_with('/'),
        None => false,
    }
}
