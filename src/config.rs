//! Update handler configuration
//!
//! An [`UpdateConfig`] is built once, either in code or by deserializing a
//! config file section, and is not changed afterwards. A handler swaps its
//! whole config through [`UpdateHandler::reconfigure`](crate::UpdateHandler::reconfigure).
//!
//! # Example
//!
//! ```
//! use d1_update_handler::UpdateConfig;
//!
//! let config = UpdateConfig::builder("INSERT INTO FOOS (PAYLOAD) VALUES (:payload)")
//!     .keys_generated(true)
//!     .key_columns(["ID"])
//!     .build();
//!
//! assert!(config.keys_generated());
//! assert_eq!(config.key_columns(), ["ID"]);
//! ```

use serde::{Deserialize, Serialize};

/// What to execute for each request and how to report the outcome
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateConfig {
    /// Named-parameter statement
    sql: String,
    /// Capture generated keys instead of reporting the affected-row count
    #[serde(default)]
    keys_generated: bool,
    /// Names of the generated key columns
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    key_columns: Vec<String>,
}

impl UpdateConfig {
    /// Create a row-count configuration for `sql`
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            ..Self::default()
        }
    }

    /// Create a builder for `sql`
    pub fn builder(sql: impl Into<String>) -> UpdateConfigBuilder {
        UpdateConfigBuilder {
            config: Self::new(sql),
        }
    }

    /// Get the statement template
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Check if generated keys are captured
    pub fn keys_generated(&self) -> bool {
        self.keys_generated
    }

    /// Get the configured key column names
    pub fn key_columns(&self) -> &[String] {
        &self.key_columns
    }
}

/// Builder for UpdateConfig
#[derive(Debug, Clone)]
pub struct UpdateConfigBuilder {
    config: UpdateConfig,
}

impl UpdateConfigBuilder {
    /// Select generated-key mode (`true`) or row-count mode (`false`)
    pub fn keys_generated(mut self, keys_generated: bool) -> Self {
        self.config.keys_generated = keys_generated;
        self
    }

    /// Name the generated key columns
    pub fn key_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.key_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Build the configuration
    pub fn build(self) -> UpdateConfig {
        self.config
    }
}
