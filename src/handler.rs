//! The update handler
//!
//! Executes the configured statement once per request, binding its named
//! parameters from the request, and reports either the generated keys or the
//! affected-row count.
//!
//! # Example
//!
//! ```ignore
//! use d1_update_handler::{D1HttpConfig, D1HttpConnection, Message, UpdateConfig, UpdateHandler};
//!
//! let conn = D1HttpConnection::new(D1HttpConfig::from_env()?);
//! let config = UpdateConfig::builder(
//!     "INSERT INTO FOOS (MESSAGE_ID, PAYLOAD) VALUES (:headers[id], :payload)",
//! )
//! .keys_generated(true)
//! .key_columns(["ID"])
//! .build();
//!
//! let handler = UpdateHandler::new(conn, config);
//! let keys = handler.handle_message(&Message::new("hello")).await?;
//! println!("inserted row {:?}", keys[0].get("ID"));
//! ```

use diesel::QueryResult;
use serde::Serialize;

use crate::{
    config::UpdateConfig,
    keys::{ExecutionResult, GeneratedKeyHolder, KeyRow, UPDATED},
    message::Message,
    operations::NamedParameterOperations,
    parameter_source::{
        MapParameterSource, ParameterSource, ParameterSourceFactory,
        PropertyParameterSourceFactory,
    },
    value::BindValue,
};

/// Executes a named-parameter update for each request of type `R`
///
/// `execute` takes `&self` and keeps no state between calls, so one handler
/// may serve concurrent requests when `C` allows concurrent use.
pub struct UpdateHandler<C, R: ?Sized> {
    operations: C,
    config: UpdateConfig,
    parameter_source_factory: Option<Box<dyn ParameterSourceFactory<R>>>,
}

/// A handler fed with [`Message`]s
pub type MessageUpdateHandler<C, P> = UpdateHandler<C, Message<P>>;

impl<C, R: ?Sized> UpdateHandler<C, R> {
    /// Create a handler binding parameters from the request's serialized fields
    pub fn new(operations: C, config: UpdateConfig) -> Self
    where
        R: Serialize,
    {
        Self::with_factory(operations, config, PropertyParameterSourceFactory)
    }

    /// Create a handler binding parameters through `factory`
    ///
    /// Unlike [`UpdateHandler::new`] this places no bound on the request type.
    pub fn with_factory(
        operations: C,
        config: UpdateConfig,
        factory: impl ParameterSourceFactory<R> + 'static,
    ) -> Self {
        Self {
            operations,
            config,
            parameter_source_factory: Some(Box::new(factory)),
        }
    }

    /// Replace the parameter source factory, builder-style
    pub fn with_parameter_source_factory(
        mut self,
        factory: impl ParameterSourceFactory<R> + 'static,
    ) -> Self {
        self.parameter_source_factory = Some(Box::new(factory));
        self
    }

    /// Drop the parameter source factory, so every execution binds from an empty mapping
    pub fn without_parameter_source_factory(mut self) -> Self {
        self.parameter_source_factory = None;
        self
    }

    /// Replace the parameter source factory
    pub fn set_parameter_source_factory(
        &mut self,
        factory: Option<Box<dyn ParameterSourceFactory<R>>>,
    ) {
        self.parameter_source_factory = factory;
    }

    /// Replace the configuration; applies to every later execution
    pub fn reconfigure(&mut self, config: UpdateConfig) {
        self.config = config;
    }

    /// Get the current configuration
    pub fn config(&self) -> &UpdateConfig {
        &self.config
    }

    /// Get the underlying database operations
    pub fn operations(&self) -> &C {
        &self.operations
    }

    fn parameter_source(&self, request: &R) -> QueryResult<Box<dyn ParameterSource>> {
        match &self.parameter_source_factory {
            Some(factory) => factory.create_parameter_source(request),
            None => Ok(Box::new(MapParameterSource::new())),
        }
    }
}

impl<C: NamedParameterOperations, R: ?Sized> UpdateHandler<C, R> {
    /// Execute the configured statement for `request`
    ///
    /// In generated-key mode the result holds every captured key row, possibly
    /// none. Otherwise it is a single row whose `UPDATED` column holds the
    /// affected-row count. Failures from binding or from the store are
    /// returned as-is.
    pub async fn execute(&self, request: &R) -> QueryResult<ExecutionResult> {
        let params = self.parameter_source(request)?;

        if self.config.keys_generated() {
            let mut key_holder = GeneratedKeyHolder::with_key_columns(self.config.key_columns());
            self.operations
                .update_with_keys(self.config.sql(), params.as_ref(), &mut key_holder)
                .await?;
            Ok(key_holder.into_key_list())
        } else {
            let updated = self
                .operations
                .update(self.config.sql(), params.as_ref())
                .await?;
            Ok(vec![
                KeyRow::new().with(UPDATED, BindValue::Integer(updated as i64))
            ])
        }
    }
}

impl<C: NamedParameterOperations, P> UpdateHandler<C, Message<P>> {
    /// Execute the configured statement for `message`, tracing any generated keys
    pub async fn handle_message(&self, message: &Message<P>) -> QueryResult<ExecutionResult> {
        let keys = self.execute(message).await?;
        if self.config.keys_generated() && !keys.is_empty() {
            tracing::debug!(keys = ?keys, "Generated keys");
        }
        Ok(keys)
    }
}

impl<C: std::fmt::Debug, R: ?Sized> std::fmt::Debug for UpdateHandler<C, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateHandler")
            .field("operations", &self.operations)
            .field("config", &self.config)
            .field(
                "parameter_source_factory",
                &self.parameter_source_factory.as_ref().map(|_| ".."),
            )
            .finish()
    }
}
