//! Recorded exchanges and the artifact that persists them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::normalizer::{self, NormalizedRequest};
use crate::transport::{Headers, HttpResponse};

/// Version of the on-disk recording format.
pub const FORMAT_VERSION: &str = "1.0";

/// One recorded request/response exchange.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interaction {
    pub method: String,
    pub canonical_path: String,
    #[serde(with = "body", default, skip_serializing_if = "Vec::is_empty")]
    pub request_body: Vec<u8>,
    pub status_code: u16,
    #[serde(default)]
    pub response_headers: Headers,
    #[serde(with = "body", default)]
    pub response_body: Vec<u8>,
}

impl Interaction {
    pub fn new(request: &NormalizedRequest, response: &HttpResponse) -> Self {
        Self {
            method: request.method.clone(),
            canonical_path: request.canonical_path.clone(),
            request_body: request.body.clone(),
            status_code: response.status,
            response_headers: response.headers.clone(),
            response_body: response.body.clone(),
        }
    }

    pub fn response(&self) -> HttpResponse {
        HttpResponse {
            status: self.status_code,
            headers: self.response_headers.clone(),
            body: self.response_body.clone(),
        }
    }

    pub fn path_without_query(&self) -> &str {
        self.canonical_path.split('?').next().unwrap_or_default()
    }

    pub fn debug_key(&self) -> String {
        normalizer::debug_key(&self.method, &self.canonical_path, self.request_body.len())
    }
}

/// Everything persisted for one test.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recording {
    pub version: String,
    pub test_id: String,
    pub recorded_at: String,
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
    pub interactions: Vec<Interaction>,
}

impl Recording {
    pub fn new(test_id: &str, interactions: Vec<Interaction>, variables: BTreeMap<String, String>) -> Self {
        Self {
            version: FORMAT_VERSION.to_string(),
            test_id: test_id.to_string(),
            recorded_at: now_rfc3339(),
            variables,
            interactions,
        }
    }
}

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default()
}

/// Bodies are written as text when they are UTF-8 and as base64 otherwise.
mod body {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    #[serde(untagged)]
    enum Encoded {
        Text(String),
        Binary { base64: String },
    }

    pub fn serialize<S: Serializer>(body: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        match std::str::from_utf8(body) {
            Ok(text) => Encoded::Text(text.to_string()).serialize(serializer),
            Err(_) => Encoded::Binary {
                base64: STANDARD.encode(body),
            }
            .serialize(serializer),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        match Encoded::deserialize(deserializer)? {
            Encoded::Text(text) => Ok(text.into_bytes()),
            Encoded::Binary { base64 } => STANDARD.decode(base64).map_err(de::Error::custom),
        }
    }
}
