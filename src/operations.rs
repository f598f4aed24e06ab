//! The database capability the update handler depends on
//!
//! Connection acquisition, pooling and transaction boundaries all belong to
//! the implementor.

use std::sync::Arc;

use async_trait::async_trait;
use diesel::QueryResult;

use crate::{keys::GeneratedKeyHolder, parameter_source::ParameterSource};

/// Executes named-parameter statements against a relational store
///
/// Implementations must bind every placeholder from `params` (never splicing
/// values into the statement text) and must report a placeholder that
/// `params` cannot supply as an error rather than binding NULL.
#[async_trait]
pub trait NamedParameterOperations: Send + Sync {
    /// Execute `sql` and return the number of rows affected
    async fn update(&self, sql: &str, params: &dyn ParameterSource) -> QueryResult<usize>;

    /// Execute `sql`, pushing every generated-key row into `key_holder`
    ///
    /// Returns the number of rows affected.
    async fn update_with_keys(
        &self,
        sql: &str,
        params: &dyn ParameterSource,
        key_holder: &mut GeneratedKeyHolder,
    ) -> QueryResult<usize>;
}

#[async_trait]
impl<T: NamedParameterOperations + ?Sized> NamedParameterOperations for Arc<T> {
    async fn update(&self, sql: &str, params: &dyn ParameterSource) -> QueryResult<usize> {
        (**self).update(sql, params).await
    }

    async fn update_with_keys(
        &self,
        sql: &str,
        params: &dyn ParameterSource,
        key_holder: &mut GeneratedKeyHolder,
    ) -> QueryResult<usize> {
        (**self).update_with_keys(sql, params, key_holder).await
    }
}
