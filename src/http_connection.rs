//! HTTP-based D1 connection for the REST API
//!
//! This module provides [`D1HttpConnection`], which executes named-parameter
//! statements against a Cloudflare D1 database through the REST API. Named
//! placeholders are rewritten to SQLite numbered placeholders and sent as a
//! positional `params` array; values never enter the SQL text.

use async_trait::async_trait;
use diesel::{ConnectionError, ConnectionResult, QueryResult};
use diesel_async::SimpleAsyncConnection;
use percent_encoding::percent_decode_str;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::{
    keys::{GeneratedKeyHolder, KeyRow},
    named_sql::parse_sql_statement,
    operations::NamedParameterOperations,
    parameter_source::ParameterSource,
    failure::FailureClass,
    utils::D1Error,
    value::BindValue,
};

/// Environment variable holding the Cloudflare account ID
pub const ACCOUNT_ID_ENV: &str = "CF_ACCOUNT_ID";
/// Environment variable holding the D1 database ID
pub const DATABASE_ID_ENV: &str = "CF_DATABASE_ID";
/// Environment variable holding the API token
pub const API_TOKEN_ENV: &str = "CF_API_TOKEN";
/// Optional environment variable overriding the API base URL
pub const BASE_URL_ENV: &str = "D1_BASE_URL";

const DEFAULT_BASE_URL: &str = "https://api.cloudflare.com/client/v4";

/// Configuration for D1 HTTP API connection
///
/// # Example
///
/// ```
/// use d1_update_handler::D1HttpConfig;
///
/// let config = D1HttpConfig::new(
///     "your-account-id",
///     "your-database-id",
///     "your-api-token",
/// );
/// ```
#[derive(Clone)]
pub struct D1HttpConfig {
    /// Cloudflare account ID
    pub account_id: String,
    /// D1 database ID
    pub database_id: String,
    /// API token with D1 permissions
    pub api_token: String,
    /// Base URL for the API (defaults to Cloudflare API)
    pub base_url: String,
}

impl D1HttpConfig {
    /// Create a new configuration with the required parameters
    pub fn new(
        account_id: impl Into<String>,
        database_id: impl Into<String>,
        api_token: impl Into<String>,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            database_id: database_id.into(),
            api_token: api_token.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Set a custom base URL (useful for testing)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Read the configuration from `CF_ACCOUNT_ID`, `CF_DATABASE_ID`,
    /// `CF_API_TOKEN` and, optionally, `D1_BASE_URL`
    pub fn from_env() -> ConnectionResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ConnectionResult<Self> {
        let required = |key: &str| {
            lookup(key).filter(|v| !v.is_empty()).ok_or_else(|| {
                ConnectionError::BadConnection(format!("{} must be set", key))
            })
        };

        let config = Self::new(
            required(ACCOUNT_ID_ENV)?,
            required(DATABASE_ID_ENV)?,
            required(API_TOKEN_ENV)?,
        );
        Ok(match lookup(BASE_URL_ENV).filter(|v| !v.is_empty()) {
            Some(base_url) => config.with_base_url(base_url),
            None => config,
        })
    }

    /// Build the query URL for this database
    fn query_url(&self) -> String {
        format!(
            "{}/accounts/{}/d1/database/{}/query",
            self.base_url.trim_end_matches('/'),
            self.account_id,
            self.database_id
        )
    }
}

impl std::fmt::Debug for D1HttpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("D1HttpConfig")
            .field("account_id", &self.account_id)
            .field("database_id", &self.database_id)
            .field("api_token", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// D1 HTTP API request body
#[derive(Serialize, Debug)]
struct D1QueryRequest<'a> {
    sql: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    params: Vec<JsonValue>,
}

/// D1 HTTP API response
#[derive(Deserialize, Debug)]
struct D1ApiResponse {
    success: bool,
    #[serde(default)]
    errors: Vec<D1ApiError>,
    result: Option<Vec<D1QueryResult>>,
}

/// D1 API error
#[derive(Deserialize, Debug)]
struct D1ApiError {
    code: i32,
    message: String,
}

/// D1 query result
#[derive(Deserialize, Debug, Default)]
struct D1QueryResult {
    results: Option<Vec<JsonValue>>,
    meta: Option<D1QueryMeta>,
}

/// D1 query metadata
#[derive(Deserialize, Debug, Default)]
struct D1QueryMeta {
    changes: Option<i64>,
    last_row_id: Option<i64>,
    duration: Option<f64>,
}

impl D1QueryResult {
    /// Rows affected by the statement
    fn changes(&self) -> usize {
        self.meta
            .as_ref()
            .and_then(|m| m.changes)
            .map_or(0, |c| c.max(0) as usize)
    }

    /// Push this result's generated keys into `key_holder`
    ///
    /// Rows returned by the statement (e.g. `INSERT ... RETURNING id`) are the
    /// keys. Without returned rows, an insert that changed rows reports its
    /// `last_row_id` under the holder's primary key column.
    fn collect_generated_keys(&self, key_holder: &mut GeneratedKeyHolder) {
        let rows = self.results.as_deref().unwrap_or_default();
        if !rows.is_empty() {
            for row in rows.iter().filter_map(JsonValue::as_object) {
                key_holder.push(KeyRow::from_json_object(row));
            }
            return;
        }

        let last_row_id = self.meta.as_ref().and_then(|m| m.last_row_id);
        if let (Some(id), true) = (last_row_id, self.changes() > 0) {
            let column = key_holder.primary_key_column().to_string();
            key_holder.push(KeyRow::new().with(column, id));
        }
    }
}

/// Turn a raw API response into the first statement result
fn parse_response(status: u16, body: &str) -> QueryResult<D1QueryResult> {
    let is_success = (200..300).contains(&status);
    let parsed: Result<D1ApiResponse, _> = serde_json::from_str(body);

    let api_response = match parsed {
        Ok(response) => response,
        Err(e) if is_success => {
            return Err(request_failed(
                FailureClass::Decode,
                format!("Failed to parse response: {}", e),
            ));
        }
        Err(_) => {
            return Err(request_failed(
                FailureClass::for_status(status),
                format!("HTTP error {}: {}", status, body),
            ));
        }
    };

    if !is_success || !api_response.success {
        let (code, message) = api_response
            .errors
            .first()
            .map(|e| (e.code, e.message.clone()))
            .unwrap_or_else(|| (0, format!("HTTP error {}", status)));
        let class = FailureClass::for_api_error(status, &message);
        tracing::warn!(status, code, error_class = %class, "D1 API returned an error");
        return Err(D1Error::new(message).into_diesel());
    }

    api_response
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| request_failed(FailureClass::Decode, "No result returned".to_string()))
}

fn request_failed(class: FailureClass, message: String) -> diesel::result::Error {
    tracing::warn!(error_class = %class, error = %message, "D1 request failed");
    D1Error::new(message).into_diesel()
}

/// D1 connection using the HTTP REST API
///
/// Holds no per-request state, so a single connection can be shared between
/// concurrently running handlers.
///
/// # Example
///
/// ```ignore
/// use d1_update_handler::{D1HttpConfig, D1HttpConnection};
///
/// let config = D1HttpConfig::new(
///     "account-id",
///     "database-id",
///     "api-token",
/// );
///
/// let conn = D1HttpConnection::new(config);
/// ```
#[derive(Debug, Clone)]
pub struct D1HttpConnection {
    client: Client,
    /// Connection configuration
    pub(crate) config: D1HttpConfig,
}

impl D1HttpConnection {
    /// Create a new HTTP connection with the given configuration
    pub fn new(config: D1HttpConfig) -> Self {
        Self::with_client(config, Client::new())
    }

    /// Create a new HTTP connection with a custom reqwest client
    pub fn with_client(config: D1HttpConfig, client: Client) -> Self {
        Self { client, config }
    }

    /// Create a connection from a URL of the form `d1://account_id:api_token@database_id`
    ///
    /// The api_token should be percent-encoded if it contains '@' or ':'.
    pub fn establish(database_url: &str) -> ConnectionResult<Self> {
        const FORMAT: &str = "Invalid D1 URL format. Expected: d1://account_id:api_token@database_id";

        let url_body = database_url.strip_prefix("d1://").ok_or_else(|| {
            ConnectionError::BadConnection("D1 URL must start with 'd1://'".to_string())
        })?;

        // Split on the last '@' so an encoded token may still contain one
        let (auth_part, database_id) = url_body
            .rsplit_once('@')
            .ok_or_else(|| ConnectionError::BadConnection(FORMAT.to_string()))?;
        let (account_id, api_token_encoded) = auth_part
            .split_once(':')
            .ok_or_else(|| ConnectionError::BadConnection(FORMAT.to_string()))?;
        let api_token = percent_decode_str(api_token_encoded)
            .decode_utf8_lossy()
            .into_owned();

        for (field, value) in [
            ("account_id", account_id),
            ("database_id", database_id),
            ("api_token", api_token.as_str()),
        ] {
            if value.is_empty() {
                return Err(ConnectionError::BadConnection(format!(
                    "{} cannot be empty in D1 URL",
                    field
                )));
            }
        }

        Ok(Self::new(D1HttpConfig::new(account_id, database_id, api_token)))
    }

    /// Get the connection configuration
    pub fn config(&self) -> &D1HttpConfig {
        &self.config
    }

    /// Execute a query against the D1 HTTP API
    async fn execute_query(&self, sql: &str, params: Vec<JsonValue>) -> QueryResult<D1QueryResult> {
        tracing::debug!(sql, params = params.len(), "Executing D1 query");
        let request = D1QueryRequest { sql, params };

        let response = self
            .client
            .post(self.config.query_url())
            .bearer_auth(&self.config.api_token)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                request_failed(
                    FailureClass::for_transport(&e),
                    format!("HTTP request failed: {}", e),
                )
            })?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| {
            request_failed(FailureClass::Network, format!("Failed to read response: {}", e))
        })?;

        let result = parse_response(status, &body)?;
        if let Some(meta) = &result.meta {
            tracing::debug!(
                changes = meta.changes,
                last_row_id = meta.last_row_id,
                duration_ms = meta.duration,
                "D1 query executed"
            );
        }
        Ok(result)
    }

    /// Bind `params` into `sql` and execute it
    async fn execute_named(
        &self,
        sql: &str,
        params: &dyn ParameterSource,
    ) -> QueryResult<D1QueryResult> {
        let parsed = parse_sql_statement(sql)?;
        let binds = parsed
            .bind(params)?
            .iter()
            .map(BindValue::to_json_value)
            .collect();
        self.execute_query(parsed.sql(), binds).await
    }
}

#[async_trait]
impl SimpleAsyncConnection for D1HttpConnection {
    async fn batch_execute(&mut self, query: &str) -> QueryResult<()> {
        self.execute_query(query, vec![]).await?;
        Ok(())
    }
}

#[async_trait]
impl NamedParameterOperations for D1HttpConnection {
    async fn update(&self, sql: &str, params: &dyn ParameterSource) -> QueryResult<usize> {
        Ok(self.execute_named(sql, params).await?.changes())
    }

    async fn update_with_keys(
        &self,
        sql: &str,
        params: &dyn ParameterSource,
        key_holder: &mut GeneratedKeyHolder,
    ) -> QueryResult<usize> {
        let result = self.execute_named(sql, params).await?;
        result.collect_generated_keys(key_holder);
        Ok(result.changes())
    }
}
