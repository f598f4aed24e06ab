//! Classification of failed D1 requests
//!
//! Every warn event emitted by the HTTP client carries an `error_class` field
//! so auth problems, rate limiting and SQL errors can be told apart without
//! parsing messages downstream.

/// What kind of failure a D1 request ran into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FailureClass {
    Auth,
    RateLimit,
    Sql,
    Decode,
    Timeout,
    Network,
    Unknown,
}

impl FailureClass {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            FailureClass::Auth => "auth",
            FailureClass::RateLimit => "rate_limit",
            FailureClass::Sql => "sql_error",
            FailureClass::Decode => "decode",
            FailureClass::Timeout => "timeout",
            FailureClass::Network => "network",
            FailureClass::Unknown => "unknown",
        }
    }

    /// Classify a non-2xx status returned by the REST API
    pub(crate) fn for_status(status: u16) -> Self {
        match status {
            401 | 403 => FailureClass::Auth,
            429 => FailureClass::RateLimit,
            400 => FailureClass::Sql,
            408 | 504 => FailureClass::Timeout,
            502 | 503 | 520..=530 => FailureClass::Network,
            _ => FailureClass::Unknown,
        }
    }

    /// Classify an error that D1 reported inside a 2xx response
    ///
    /// These are almost always SQLite errors, so anything unrecognised falls
    /// back to [`FailureClass::Unknown`] rather than guessing.
    pub(crate) fn for_api_message(message: &str) -> Self {
        let msg = message.to_lowercase();

        if msg.contains("constraint failed")
            || msg.contains("no such")
            || msg.contains("syntax error")
            || msg.contains("sqlite_")
        {
            FailureClass::Sql
        } else if msg.contains("unauthorized") || msg.contains("authentication") {
            FailureClass::Auth
        } else if msg.contains("too many requests") || msg.contains("rate limit") {
            FailureClass::RateLimit
        } else {
            FailureClass::Unknown
        }
    }

    /// Classify an API error, preferring the HTTP status when it is not a success
    pub(crate) fn for_api_error(status: u16, message: &str) -> Self {
        if (200..300).contains(&status) {
            Self::for_api_message(message)
        } else {
            Self::for_status(status)
        }
    }

    /// Classify a transport error from the HTTP client
    pub(crate) fn for_transport(error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            FailureClass::Timeout
        } else if error.is_decode() {
            FailureClass::Decode
        } else {
            FailureClass::Network
        }
    }
}

impl std::fmt::Display for FailureClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
