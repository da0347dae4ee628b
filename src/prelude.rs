//! Commonly used types, so a test harness can import everything with
//!
//! ```rust
//! use http_recorder::prelude::*;
//! ```

pub use crate::Error;

pub use crate::config::{RecordMode, RecorderConfig, ScrubRules};
pub use crate::lifecycle::{SessionManager, TeardownReport, TestScope};
pub use crate::matcher::{IgnoreBodyMatcher, Matcher, PathPrefixMatcher, SimpleMatcher};
pub use crate::store::{FileStore, InteractionStore, MemoryStore};

pub use crate::client::{ClientCreationHook, ClientPipeline};
