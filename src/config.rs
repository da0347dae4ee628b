//! Recorder configuration.
//!
//! Defaults can be overridden from the environment:
//! - `HTTP_RECORDER_DIR` is the directory holding one recording per test
//! - `HTTP_RECORDER_MODE` is one of `auto`, `record` or `playback`
//! - `HTTP_RECORDER_SCRUB_HEADERS` is a comma separated list of extra volatile headers
//!
//! Empty values are ignored.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::Error;

pub const RECORDER_DIR_ENV: &str = "HTTP_RECORDER_DIR";
pub const RECORDER_MODE_ENV: &str = "HTTP_RECORDER_MODE";
pub const SCRUB_HEADERS_ENV: &str = "HTTP_RECORDER_SCRUB_HEADERS";
pub const DEFAULT_RECORDING_DIR: &str = "tests/recordings";

const DEFAULT_VOLATILE_HEADERS: &[&str] = &[
    "date",
    "x-ms-date",
    "x-ms-client-request-id",
    "client-request-id",
    "x-ms-correlation-request-id",
    "x-ms-request-id",
    "request-id",
    "traceparent",
    "user-agent",
];

const DEFAULT_VOLATILE_QUERY_PARAMS: &[&str] = &["$skiptoken", "continuationtoken", "timestamp"];

/// How a session decides between recording and playback.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RecordMode {
    /// Playback when a recording exists, record otherwise.
    #[default]
    Auto,
    /// Always call the network and overwrite any existing recording.
    Record,
    /// Always replay. A missing recording is an error.
    Playback,
}

impl FromStr for RecordMode {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(RecordMode::Auto),
            "record" => Ok(RecordMode::Record),
            "playback" => Ok(RecordMode::Playback),
            _ => Err(Error::InvalidMode(value.to_string())),
        }
    }
}

/// Volatile request fields removed or replaced before matching and storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrubRules {
    /// Header names dropped entirely. Compared case-insensitively.
    pub volatile_headers: Vec<String>,
    /// Query parameters whose values are replaced by the placeholder.
    pub volatile_query_params: Vec<String>,
    /// Extra regular expressions scrubbed from bodies, on top of GUIDs and timestamps.
    pub body_patterns: Vec<String>,
}

impl Default for ScrubRules {
    fn default() -> Self {
        Self {
            volatile_headers: DEFAULT_VOLATILE_HEADERS.iter().map(|s| s.to_string()).collect(),
            volatile_query_params: DEFAULT_VOLATILE_QUERY_PARAMS.iter().map(|s| s.to_string()).collect(),
            body_patterns: Vec::new(),
        }
    }
}

impl ScrubRules {
    pub fn with_volatile_header(mut self, name: &str) -> Self {
        self.volatile_headers.push(name.to_ascii_lowercase());
        self
    }

    pub fn with_volatile_query_param(mut self, name: &str) -> Self {
        self.volatile_query_params.push(name.to_ascii_lowercase());
        self
    }

    pub fn with_body_pattern(mut self, pattern: &str) -> Self {
        self.body_patterns.push(pattern.to_string());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecorderConfig {
    pub recording_dir: PathBuf,
    pub mode: RecordMode,
    pub scrub: ScrubRules,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            recording_dir: PathBuf::from(DEFAULT_RECORDING_DIR),
            mode: RecordMode::default(),
            scrub: ScrubRules::default(),
        }
    }
}

impl RecorderConfig {
    pub fn new(recording_dir: impl Into<PathBuf>) -> Self {
        Self {
            recording_dir: recording_dir.into(),
            ..Default::default()
        }
    }

    /// Builds the defaults, then applies any environment overrides.
    pub fn from_env() -> Result<Self, Error> {
        let mut config = RecorderConfig::default();

        if let Some(dir) = non_empty_var(RECORDER_DIR_ENV) {
            config.recording_dir = PathBuf::from(dir);
        }

        if let Some(mode) = non_empty_var(RECORDER_MODE_ENV) {
            config.mode = mode.parse()?;
        }

        if let Some(headers) = non_empty_var(SCRUB_HEADERS_ENV) {
            for header in headers.split(',').map(str::trim).filter(|h| !h.is_empty()) {
                config.scrub = config.scrub.with_volatile_header(header);
            }
        }

        Ok(config)
    }

    pub fn with_mode(mut self, mode: RecordMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_scrub(mut self, scrub: ScrubRules) -> Self {
        self.scrub = scrub;
        self
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serial_test::serial;

    #[test]
    fn test_mode_parsing() {
        assert_eq!("auto".parse::<RecordMode>().unwrap(), RecordMode::Auto);
        assert_eq!("Record".parse::<RecordMode>().unwrap(), RecordMode::Record);
        assert_eq!(" PLAYBACK ".parse::<RecordMode>().unwrap(), RecordMode::Playback);
        assert!(matches!("replay".parse::<RecordMode>(), Err(Error::InvalidMode(value)) if value == "replay"));
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        temp_env::with_vars_unset([RECORDER_DIR_ENV, RECORDER_MODE_ENV, SCRUB_HEADERS_ENV], || {
            let config = RecorderConfig::from_env().unwrap();
            assert_eq!(config, RecorderConfig::default());
            assert_eq!(config.recording_dir, PathBuf::from(DEFAULT_RECORDING_DIR));
        });
    }

    #[test]
    #[serial]
    fn test_from_env_with_empty_values() {
        temp_env::with_vars(
            [
                (RECORDER_DIR_ENV, Some("")),
                (RECORDER_MODE_ENV, Some("")),
                (SCRUB_HEADERS_ENV, Some("")),
            ],
            || {
                let config = RecorderConfig::from_env().unwrap();
                assert_eq!(config, RecorderConfig::default());
            },
        );
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        temp_env::with_vars(
            [
                (RECORDER_DIR_ENV, Some("/tmp/recordings")),
                (RECORDER_MODE_ENV, Some("playback")),
                (SCRUB_HEADERS_ENV, Some("X-Trace, x-session ,")),
            ],
            || {
                let config = RecorderConfig::from_env().unwrap();
                assert_eq!(config.recording_dir, PathBuf::from("/tmp/recordings"));
                assert_eq!(config.mode, RecordMode::Playback);
                assert!(config.scrub.volatile_headers.contains(&"x-trace".to_string()));
                assert!(config.scrub.volatile_headers.contains(&"x-session".to_string()));
            },
        );
    }

    #[test]
    #[serial]
    fn test_from_env_invalid_mode() {
        temp_env::with_var(RECORDER_MODE_ENV, Some("sometimes"), || {
            assert!(matches!(RecorderConfig::from_env(), Err(Error::InvalidMode(_))));
        });
    }

    #[test]
    fn test_scrub_rules_builders() {
        let rules = ScrubRules::default()
            .with_volatile_header("X-Custom")
            .with_volatile_query_param("NextLink")
            .with_body_pattern("job-[0-9]+");

        assert!(rules.volatile_headers.contains(&"x-custom".to_string()));
        assert!(rules.volatile_query_params.contains(&"nextlink".to_string()));
        assert_eq!(rules.body_patterns, vec!["job-[0-9]+".to_string()]);
    }
}
