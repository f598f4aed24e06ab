//! Error types shared by the handler and the D1 client
//!
//! Every fallible operation in this crate reports through diesel's
//! [`QueryResult`](diesel::QueryResult). Binding failures are query builder
//! errors; store failures are database errors.

use diesel::result::{DatabaseErrorInformation, DatabaseErrorKind, Error as DieselError};

/// Failure to bind a statement's named placeholders
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BindError {
    /// The statement references a parameter the parameter source cannot supply
    #[error("no value supplied for the SQL parameter '{name}'")]
    MissingParameter { name: String },
    /// A placeholder opened a `[` without closing it
    #[error("malformed SQL parameter at position {position}: unclosed '['")]
    MalformedPlaceholder { position: usize },
}

impl From<BindError> for DieselError {
    fn from(error: BindError) -> Self {
        DieselError::QueryBuilderError(Box::new(error))
    }
}

/// Get the bind failure carried by a diesel error, if that is what it is
pub fn bind_error(error: &DieselError) -> Option<&BindError> {
    match error {
        DieselError::QueryBuilderError(inner) => inner.downcast_ref::<BindError>(),
        _ => None,
    }
}

/// Error information from D1
///
/// This struct wraps error messages from D1 for use with Diesel's error system.
#[derive(Debug, Clone)]
pub struct D1Error {
    /// The error message from D1
    pub(crate) message: String,
}

impl D1Error {
    /// Create a new D1 error with the given message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Wrap into a diesel database error, classifying SQLite constraint failures
    pub fn into_diesel(self) -> DieselError {
        let kind = database_error_kind(&self.message);
        DieselError::DatabaseError(kind, Box::new(self))
    }
}

impl std::fmt::Display for D1Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for D1Error {}

impl DatabaseErrorInformation for D1Error {
    fn message(&self) -> &str {
        &self.message
    }

    fn details(&self) -> Option<&str> {
        None
    }

    fn hint(&self) -> Option<&str> {
        None
    }

    fn table_name(&self) -> Option<&str> {
        None
    }

    fn column_name(&self) -> Option<&str> {
        None
    }

    fn constraint_name(&self) -> Option<&str> {
        None
    }

    fn statement_position(&self) -> Option<i32> {
        None
    }
}

/// Map a SQLite error message onto diesel's error kinds
pub fn database_error_kind(message: &str) -> DatabaseErrorKind {
    if message.contains("UNIQUE constraint failed") {
        DatabaseErrorKind::UniqueViolation
    } else if message.contains("FOREIGN KEY constraint failed") {
        DatabaseErrorKind::ForeignKeyViolation
    } else if message.contains("NOT NULL constraint failed") {
        DatabaseErrorKind::NotNullViolation
    } else if message.contains("CHECK constraint failed") {
        DatabaseErrorKind::CheckViolation
    } else {
        DatabaseErrorKind::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_d1_error_display() {
        let error = D1Error::new("test error");
        assert_eq!(format!("{}", error), "test error");
    }

    #[test]
    fn test_database_error_information() {
        let error = D1Error::new("test message");
        assert_eq!(error.message(), "test message");
        assert!(error.details().is_none());
        assert!(error.constraint_name().is_none());
    }

    #[test]
    fn test_into_diesel_classifies_constraints() {
        let error = D1Error::new("UNIQUE constraint failed: foos.message_id").into_diesel();
        assert!(matches!(
            error,
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)
        ));

        let error = D1Error::new("NOT NULL constraint failed: foos.payload").into_diesel();
        assert!(matches!(
            error,
            DieselError::DatabaseError(DatabaseErrorKind::NotNullViolation, _)
        ));

        let error = D1Error::new("no such table: foos").into_diesel();
        assert!(matches!(
            error,
            DieselError::DatabaseError(DatabaseErrorKind::Unknown, _)
        ));
    }

    #[test]
    fn test_bind_error_round_trips_through_diesel() {
        let error: DieselError = BindError::MissingParameter {
            name: "payload".to_string(),
        }
        .into();
        assert_eq!(
            bind_error(&error),
            Some(&BindError::MissingParameter {
                name: "payload".to_string()
            })
        );
        assert!(error.to_string().contains("payload"));
    }

    #[test]
    fn test_bind_error_absent_for_database_errors() {
        let error = D1Error::new("boom").into_diesel();
        assert!(bind_error(&error).is_none());
    }
}
