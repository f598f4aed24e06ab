//! # D1 Update Handler
//!
//! This crate executes a parameterized SQL statement for every incoming
//! message, binding named placeholders from the message's payload and headers,
//! and optionally capturing the keys the statement generated.
//!
//! ```text
//! INSERT INTO FOOS (MESSAGE_ID, PAYLOAD) VALUES (:headers[id], :payload)
//! ```
//!
//! Header keys are written without quotes; dotted keys such as `business.id`
//! work as-is.
//!
//! ## Features
//!
//! - `http` - Enable the Cloudflare D1 REST API client ([`D1HttpConnection`])
//!
//! Without `http`, bring your own store by implementing
//! [`NamedParameterOperations`].
//!
//! ## Usage
//!
//! ```toml
//! [dependencies]
//! d1-update-handler = { version = "0.1", features = ["http"] }
//! ```
//!
//! ```
//! use d1_update_handler::{BindValue, KeyRow, UPDATED};
//!
//! // In row-count mode every execution yields exactly one row like this one
//! let row = KeyRow::new().with(UPDATED, 1);
//! assert_eq!(row.get("updated"), Some(&BindValue::Integer(1)));
//! ```

mod config;
mod handler;
mod keys;
mod message;
mod named_sql;
mod operations;
mod parameter_source;
mod utils;
mod value;

#[cfg(test)]
mod test_support;

// HTTP-specific modules
#[cfg(feature = "http")]
mod failure;
#[cfg(feature = "http")]
mod http_connection;

// Re-exports
pub use config::{UpdateConfig, UpdateConfigBuilder};
pub use handler::{MessageUpdateHandler, UpdateHandler};
pub use keys::{ExecutionResult, GeneratedKeyHolder, KeyRow, GENERATED_KEY, UPDATED};
pub use message::{Message, MessageHeaders, ID, TIMESTAMP};
pub use named_sql::{parse_sql_statement, ParsedSql};
pub use operations::NamedParameterOperations;
pub use parameter_source::{
    ExpressionParameterSourceFactory, MapParameterSource, ParameterSource,
    ParameterSourceFactory, PropertyParameterSource, PropertyParameterSourceFactory,
};
pub use utils::{bind_error, BindError, D1Error};
pub use value::BindValue;

#[cfg(feature = "http")]
pub use http_connection::{
    D1HttpConfig, D1HttpConnection, ACCOUNT_ID_ENV, API_TOKEN_ENV, BASE_URL_ENV, DATABASE_ID_ENV,
};
