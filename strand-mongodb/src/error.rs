//! Error types for MongoDB operations.

use mongodb::error::ErrorKind;
use strand_query::QueryError;
use thiserror::Error;

/// Result type for MongoDB operations.
pub type MongoResult<T> = Result<T, MongoError>;

/// Errors that can occur during MongoDB operations.
///
/// Pass-through operations surface driver failures as [`MongoError::Driver`]
/// holding the driver's error exactly as it was raised.
#[derive(Error, Debug)]
pub enum MongoError {
    /// MongoDB driver error.
    #[error("mongodb error: {0}")]
    Driver(#[from] mongodb::error::Error),

    /// BSON serialization error.
    #[error("bson error: {0}")]
    Bson(#[from] bson::ser::Error),

    /// BSON deserialization error.
    #[error("bson deserialization error: {0}")]
    BsonDe(#[from] bson::de::Error),

    /// BSON field access error.
    #[error("bson value error: {0}")]
    BsonValue(#[from] bson::document::ValueAccessError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Connection error.
    #[error("connection error: {0}")]
    Connection(String),

    /// Query execution error.
    #[error("query error: {0}")]
    Query(String),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl MongoError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Create a query error.
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query(message.into())
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Check if this is a connection error.
    pub fn is_connection_error(&self) -> bool {
        match self {
            Self::Connection(_) => true,
            Self::Driver(e) => matches!(
                *e.kind,
                ErrorKind::Io(_) | ErrorKind::ServerSelection { .. }
            ),
            _ => false,
        }
    }

    /// Get the driver error, if this wraps one.
    pub fn driver_error(&self) -> Option<&mongodb::error::Error> {
        match self {
            Self::Driver(e) => Some(e),
            _ => None,
        }
    }

    /// Check if the server labelled this error as a transient transaction failure.
    pub fn is_transient_transaction_error(&self) -> bool {
        self.driver_error()
            .is_some_and(|e| e.contains_label(mongodb::error::TRANSIENT_TRANSACTION_ERROR))
    }
}

impl From<MongoError> for QueryError {
    fn from(err: MongoError) -> Self {
        let converted = match &err {
            MongoError::Driver(e) => {
                let msg = e.to_string();

                if msg.contains("E11000") || msg.contains("duplicate key") {
                    QueryError::constraint_violation("_id", msg)
                } else if matches!(*e.kind, ErrorKind::Transaction { .. }) {
                    QueryError::transaction(msg)
                } else if err.is_connection_error() {
                    QueryError::connection(msg)
                } else {
                    QueryError::database(msg)
                }
            }
            MongoError::Bson(e) => QueryError::serialization(e.to_string()),
            MongoError::BsonDe(e) => QueryError::serialization(e.to_string()),
            MongoError::BsonValue(e) => QueryError::serialization(e.to_string()),
            MongoError::Config(msg) => QueryError::configuration(msg.clone()),
            MongoError::Connection(msg) => QueryError::connection(msg.clone()),
            MongoError::Query(msg) => QueryError::database(msg.clone()),
            MongoError::Internal(msg) => QueryError::internal(msg.clone()),
        };

        converted.with_source(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strand_query::ErrorCode;

    #[test]
    fn test_error_creation() {
        let err = MongoError::config("invalid URI");
        assert!(matches!(err, MongoError::Config(_)));

        let err = MongoError::connection("connection refused");
        assert!(err.is_connection_error());
        assert!(err.driver_error().is_none());
        assert!(!err.is_transient_transaction_error());
    }

    #[test]
    fn test_error_display() {
        let err = MongoError::config("test error");
        assert_eq!(err.to_string(), "configuration error: test error");

        let err = MongoError::query("bad pipeline");
        assert_eq!(err.to_string(), "query error: bad pipeline");
    }

    #[test]
    fn test_into_query_error_keeps_source() {
        let query_err: QueryError = MongoError::connection("refused").into();
        assert!(query_err.is_connection_error());

        let source = std::error::Error::source(&query_err).map(|s| s.to_string());
        assert_eq!(source, Some("connection error: refused".to_string()));
    }

    #[test]
    fn test_config_maps_to_configuration_code() {
        let query_err: QueryError = MongoError::config("database name is required").into();
        assert_eq!(query_err.code, ErrorCode::InvalidConfiguration);
    }
}
