//! Canonicalizes outbound requests so they can be matched and stored.
//!
//! Query parameters are sorted by key, volatile headers are dropped and
//! server generated identifiers in bodies are replaced by [PLACEHOLDER].
//! Normalization never fails: bodies that are neither JSON nor XML are
//! kept byte for byte.

use std::collections::HashSet;

use regex::Regex;
use serde_json::Value;
use url::form_urlencoded;

use crate::config::ScrubRules;
use crate::transport::HttpRequest;
use crate::Error;

/// Replacement for volatile values.
pub const PLACEHOLDER: &str = "[volatile]";

const GUID_PATTERN: &str = r"(?i)\b[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}\b";
const TIMESTAMP_PATTERN: &str = r"\b\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}:\d{2}(?:\.\d+)?(?:Z|[+-]\d{2}:?\d{2})?\b";

/// The canonical form of a request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NormalizedRequest {
    pub method: String,
    /// Path with sorted, scrubbed query.
    pub canonical_path: String,
    /// Remaining headers, lowercased and sorted. Not part of the match identity.
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl NormalizedRequest {
    pub fn path_without_query(&self) -> &str {
        split_query(&self.canonical_path).0
    }

    /// Short description used in logs and error messages.
    pub fn debug_key(&self) -> String {
        debug_key(&self.method, &self.canonical_path, self.body.len())
    }

    /// Rebuilds a request from the canonical form.
    pub fn to_request(&self) -> HttpRequest {
        HttpRequest {
            method: self.method.clone(),
            path: self.canonical_path.clone(),
            headers: self.headers.clone(),
            body: self.body.clone(),
        }
    }
}

pub(crate) fn debug_key(method: &str, path: &str, body_len: usize) -> String {
    if body_len == 0 {
        format!("{method} {path}")
    } else {
        format!("{method} {path} body_len={body_len}")
    }
}

#[derive(Debug, Clone)]
pub struct Normalizer {
    volatile_headers: HashSet<String>,
    volatile_query_params: HashSet<String>,
    body_patterns: Vec<Regex>,
}

impl Normalizer {
    /// Compiles `rules`. Fails only if a custom body pattern is not a valid regex.
    pub fn new(rules: &ScrubRules) -> Result<Self, Error> {
        let mut body_patterns = vec![Regex::new(GUID_PATTERN)?, Regex::new(TIMESTAMP_PATTERN)?];
        for pattern in &rules.body_patterns {
            body_patterns.push(Regex::new(pattern)?);
        }

        Ok(Self {
            volatile_headers: rules.volatile_headers.iter().map(|h| h.to_ascii_lowercase()).collect(),
            volatile_query_params: rules.volatile_query_params.iter().map(|p| p.to_ascii_lowercase()).collect(),
            body_patterns,
        })
    }

    pub fn normalize(&self, request: &HttpRequest) -> NormalizedRequest {
        NormalizedRequest {
            method: request.method.to_ascii_uppercase(),
            canonical_path: self.canonical_path(&request.path),
            headers: self.normalize_headers(&request.headers),
            body: self.normalize_body(&request.body),
        }
    }

    /// Sorts query parameters by decoded key. Parameters are re-emitted with
    /// their original encoding so no information is lost.
    pub fn canonical_path(&self, path: &str) -> String {
        let (path, query) = split_query(path);
        let Some(query) = query else {
            return path.to_string();
        };

        let mut pairs: Vec<(String, String)> = query
            .split('&')
            .filter(|segment| !segment.is_empty())
            .map(|segment| {
                let raw = raw_key(segment);
                let key = decode_key(raw);
                if self.volatile_query_params.contains(&key.to_ascii_lowercase()) {
                    (key, format!("{raw}={}", encoded_placeholder()))
                } else {
                    (key, segment.to_string())
                }
            })
            .collect();

        if pairs.is_empty() {
            return path.to_string();
        }

        // Stable, so repeated keys keep their relative order.
        pairs.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| raw_key(&a.1).cmp(raw_key(&b.1))));

        let query: Vec<String> = pairs.into_iter().map(|(_, segment)| segment).collect();
        format!("{path}?{}", query.join("&"))
    }

    fn normalize_headers(&self, headers: &[(String, String)]) -> Vec<(String, String)> {
        let mut headers: Vec<(String, String)> = headers
            .iter()
            .map(|(name, value)| (name.to_ascii_lowercase(), value.clone()))
            .filter(|(name, _)| !self.volatile_headers.contains(name))
            .collect();
        headers.sort_by(|a, b| a.0.cmp(&b.0));
        headers
    }

    pub fn normalize_body(&self, body: &[u8]) -> Vec<u8> {
        if body.is_empty() {
            return Vec::new();
        }

        if let Ok(mut value) = serde_json::from_slice::<Value>(body) {
            self.scrub_json(&mut value);
            if let Ok(canonical) = serde_json::to_vec(&value) {
                return canonical;
            }
        }

        match std::str::from_utf8(body) {
            Ok(text) if text.trim_start().starts_with('<') => self.scrub_text(text).into_bytes(),
            _ => body.to_vec(),
        }
    }

    fn scrub_json(&self, value: &mut Value) {
        match value {
            Value::String(text) => *text = self.scrub_text(text),
            Value::Array(items) => items.iter_mut().for_each(|item| self.scrub_json(item)),
            Value::Object(map) => map.values_mut().for_each(|entry| self.scrub_json(entry)),
            _ => {}
        }
    }

    // Text already replaced by the placeholder is never rescanned, so a
    // pattern matching inside the placeholder cannot grow it on a second pass.
    fn scrub_text(&self, text: &str) -> String {
        let mut scrubbed = text.to_string();
        for pattern in &self.body_patterns {
            scrubbed = scrubbed
                .split(PLACEHOLDER)
                .map(|fragment| pattern.replace_all(fragment, PLACEHOLDER))
                .collect::<Vec<_>>()
                .join(PLACEHOLDER);
        }
        scrubbed
    }
}

fn decode_key(raw_key: &str) -> String {
    form_urlencoded::parse(raw_key.as_bytes())
        .next()
        .map(|(key, _)| key.into_owned())
        .unwrap_or_default()
}

fn raw_key(segment: &str) -> &str {
    segment.split_once('=').map_or(segment, |(key, _)| key)
}

fn encoded_placeholder() -> String {
    form_urlencoded::byte_serialize(PLACEHOLDER.as_bytes()).collect()
}

fn split_query(path: &str) -> (&str, Option<&str>) {
    match path.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (path, None),
    }
}
