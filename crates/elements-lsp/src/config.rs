//! Server configuration.
//!
//! Configuration arrives as JSON, either as the client's `initializationOptions` or from a file.
//! Every field is optional; missing fields take their defaults.
//!
//! ```json
//! {
//!   "parseStrategy": "auto",
//!   "incremental": { "maxChanges": 5, "maxChangeSize": 1000 },
//!   "logFilter": "elements_lsp=debug"
//! }
//! ```

use elements_treesitter::{
    ChangeAnalyzer, DEFAULT_MAX_CHANGE_SIZE, DEFAULT_MAX_CHANGES, IncrementalParser, ParseStrategy,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use thiserror::Error;

/// Errors produced while loading [`ServerConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    /// Reading the configuration file failed.
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    /// The JSON is malformed or has values of the wrong type.
    Json(#[from] serde_json::Error),
}

/// Thresholds for the automatic parse strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct IncrementalConfig {
    /// Most changes in a batch that may still be parsed incrementally.
    pub max_changes: usize,
    /// Size (in characters) a single change must stay below.
    pub max_change_size: usize,
}

impl Default for IncrementalConfig {
    fn default() -> Self {
        Self {
            max_changes: DEFAULT_MAX_CHANGES,
            max_change_size: DEFAULT_MAX_CHANGE_SIZE,
        }
    }
}

/// Document-core configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServerConfig {
    /// How document updates are parsed.
    pub parse_strategy: ParseStrategy,
    /// Thresholds for [`ParseStrategy::Auto`].
    pub incremental: IncrementalConfig,
    /// `tracing` filter directives (overridden by `ELEMENTS_LOG`).
    pub log_filter: Option<String>,
}

impl ServerConfig {
    /// Parse from a JSON value (e.g. `initializationOptions`). `null` yields the defaults.
    pub fn from_value(value: Value) -> Result<Self, ConfigError> {
        if value.is_null() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Parse from JSON text.
    pub fn from_json_str(source: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(source)?)
    }

    /// Load from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_json_str(&source)
    }

    /// The change analyzer these settings describe.
    pub fn change_analyzer(&self) -> ChangeAnalyzer {
        ChangeAnalyzer::new(self.incremental.max_changes, self.incremental.max_change_size)
    }

    /// The incremental parser these settings describe.
    pub fn incremental_parser(&self) -> IncrementalParser {
        IncrementalParser::new(self.parse_strategy, self.change_analyzer())
    }
}
