//! Error types for query runner operations with actionable messages.
//!
//! Every error carries:
//! - An [`ErrorCode`] for programmatic handling
//! - Context about the operation that failed
//! - Optional suggestions and help text
//! - The original source error, when there is one
//!
//! # Error Codes
//!
//! Error codes follow a pattern: S{category}{number}
//! - 1xxx: Query errors (not found, invalid input)
//! - 2xxx: Constraint violations
//! - 3xxx: Connection errors
//! - 4xxx: Transaction errors
//! - 5xxx: Execution errors (timeout, unsupported operation)
//! - 6xxx: Data errors (serialization)
//! - 7xxx: Configuration errors
//! - 9xxx: Internal errors
//!
//! ```rust
//! use strand_query::{ErrorCode, QueryError};
//!
//! let err = QueryError::transaction_not_started();
//! assert_eq!(err.code, ErrorCode::TransactionNotStarted);
//! assert_eq!(err.code.code(), "S4005");
//! ```

use std::fmt;
use thiserror::Error;

/// Result type for query runner operations.
pub type QueryResult<T> = Result<T, QueryError>;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Query errors (1xxx)
    /// Record not found (S1001).
    RecordNotFound = 1001,
    /// Invalid input value (S1003).
    InvalidInput = 1003,

    // Constraint errors (2xxx)
    /// Unique constraint violation (S2001).
    UniqueConstraint = 2001,

    // Connection errors (3xxx)
    /// Database connection failed (S3001).
    ConnectionFailed = 3001,
    /// Connection timeout (S3003).
    ConnectionTimeout = 3003,

    // Transaction errors (4xxx)
    /// Transaction failed (S4001).
    TransactionFailed = 4001,
    /// Commit or rollback without an active transaction (S4005).
    TransactionNotStarted = 4005,

    // Execution errors (5xxx)
    /// Query timeout (S5001).
    QueryTimeout = 5001,
    /// General database error (S5005).
    DatabaseError = 5005,
    /// Operation not supported by the backend (S5006).
    NotSupported = 5006,

    // Data errors (6xxx)
    /// Serialization error (S6002).
    SerializationError = 6002,

    // Configuration errors (7xxx)
    /// Invalid configuration (S7001).
    InvalidConfiguration = 7001,

    // Internal errors (9xxx)
    /// Internal error (S9001).
    Internal = 9001,
}

impl ErrorCode {
    /// Get the error code string (e.g., "S4005").
    pub fn code(&self) -> String {
        format!("S{}", *self as u16)
    }

    /// Get a short description of the error code.
    pub fn description(&self) -> &'static str {
        match self {
            Self::RecordNotFound => "Record not found",
            Self::InvalidInput => "Invalid input",
            Self::UniqueConstraint => "Unique constraint violation",
            Self::ConnectionFailed => "Database connection failed",
            Self::ConnectionTimeout => "Connection timeout",
            Self::TransactionFailed => "Transaction failed",
            Self::TransactionNotStarted => "Transaction not started",
            Self::QueryTimeout => "Query timeout",
            Self::DatabaseError => "Database error",
            Self::NotSupported => "Operation not supported",
            Self::SerializationError => "Serialization error",
            Self::InvalidConfiguration => "Invalid configuration",
            Self::Internal => "Internal error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Suggestion for fixing an error.
#[derive(Debug, Clone)]
pub struct Suggestion {
    /// The suggestion text.
    pub text: String,
    /// Optional code example.
    pub code: Option<String>,
}

impl Suggestion {
    /// Create a new suggestion.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            code: None,
        }
    }

    /// Add a code example.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

/// Additional context for an error.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// The operation that was being performed.
    pub operation: Option<String>,
    /// The collection or table involved.
    pub target: Option<String>,
    /// Suggestions for fixing the error.
    pub suggestions: Vec<Suggestion>,
    /// Help text.
    pub help: Option<String>,
}

/// Errors that can occur during query runner operations.
#[derive(Error, Debug)]
pub struct QueryError {
    /// The error code.
    pub code: ErrorCode,
    /// The error message.
    pub message: String,
    /// Additional context.
    pub context: ErrorContext,
    /// The source error (if any).
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.code(), self.message)
    }
}

impl QueryError {
    /// Create a new error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: ErrorContext::default(),
            source: None,
        }
    }

    /// Add context about the operation.
    pub fn with_context(mut self, operation: impl Into<String>) -> Self {
        self.context.operation = Some(operation.into());
        self
    }

    /// Set the collection or table the operation targeted.
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.context.target = Some(target.into());
        self
    }

    /// Add a suggestion for fixing the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.context.suggestions.push(Suggestion::new(suggestion));
        self
    }

    /// Add a code suggestion.
    pub fn with_code_suggestion(mut self, text: impl Into<String>, code: impl Into<String>) -> Self {
        self.context
            .suggestions
            .push(Suggestion::new(text).with_code(code));
        self
    }

    /// Add help text.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.context.help = Some(help.into());
        self
    }

    /// Set the source error.
    pub fn with_source<E: std::error::Error + Send + Sync + 'static>(mut self, source: E) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    // ============== Constructor Functions ==============

    /// Create a not found error.
    pub fn not_found(target: impl Into<String>) -> Self {
        let target = target.into();
        Self::new(
            ErrorCode::RecordNotFound,
            format!("No {} record found matching the query", target),
        )
        .with_target(target)
    }

    /// Create an error for an operation the backend cannot perform.
    ///
    /// These are raised without contacting the database and are never retryable.
    pub fn not_supported(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotSupported, message).with_context(operation)
    }

    /// Create an error for commit or rollback without an active transaction.
    pub fn transaction_not_started() -> Self {
        Self::new(
            ErrorCode::TransactionNotStarted,
            "Transaction is not started yet, start transaction before committing or rolling it back",
        )
        .with_code_suggestion(
            "Start a transaction on the same query runner first",
            "runner.start_transaction(None).await?",
        )
    }

    /// Create a constraint violation error.
    pub fn constraint_violation(target: impl Into<String>, message: impl Into<String>) -> Self {
        let target = target.into();
        let message = message.into();
        Self::new(
            ErrorCode::UniqueConstraint,
            format!("Constraint violation on {}: {}", target, message),
        )
        .with_target(target)
    }

    /// Create an invalid input error.
    pub fn invalid_input(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::InvalidInput,
            format!("Invalid input for {}: {}", field.into(), message.into()),
        )
    }

    /// Create a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(ErrorCode::ConnectionFailed, format!("Connection error: {}", message))
            .with_suggestion("Check that the database server is running")
            .with_suggestion("Verify the connection URL is correct")
    }

    /// Create a timeout error.
    pub fn timeout(duration_ms: u64) -> Self {
        Self::new(
            ErrorCode::QueryTimeout,
            format!("Query timed out after {}ms", duration_ms),
        )
        .with_suggestion("Increase the operation time limit if the query is expected to be slow")
    }

    /// Create a transaction error.
    pub fn transaction(message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::TransactionFailed,
            format!("Transaction error: {}", message.into()),
        )
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::InvalidConfiguration,
            format!("Invalid configuration: {}", message.into()),
        )
    }

    /// Create a serialization error.
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::SerializationError, message.into())
    }

    /// Create a general database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DatabaseError, message)
            .with_suggestion("Check the database logs for more details")
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, format!("Internal error: {}", message.into()))
    }

    // ============== Error Checks ==============

    /// Check if this is a not found error.
    pub fn is_not_found(&self) -> bool {
        self.code == ErrorCode::RecordNotFound
    }

    /// Check if the backend rejected the operation as unsupported.
    pub fn is_not_supported(&self) -> bool {
        self.code == ErrorCode::NotSupported
    }

    /// Check if this is a transaction state or transaction failure error.
    pub fn is_transaction_error(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::TransactionFailed | ErrorCode::TransactionNotStarted
        )
    }

    /// Check if this is a timeout error.
    pub fn is_timeout(&self) -> bool {
        matches!(self.code, ErrorCode::QueryTimeout | ErrorCode::ConnectionTimeout)
    }

    /// Check if this is a connection error.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::ConnectionFailed | ErrorCode::ConnectionTimeout
        )
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::ConnectionTimeout | ErrorCode::QueryTimeout
        )
    }

    // ============== Display Functions ==============

    /// Display the full error with all context and suggestions.
    pub fn display_full(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("Error [{}]: {}\n", self.code.code(), self.message));

        if let Some(ref op) = self.context.operation {
            output.push_str(&format!("  → While: {}\n", op));
        }
        if let Some(ref target) = self.context.target {
            output.push_str(&format!("  → Target: {}\n", target));
        }

        if !self.context.suggestions.is_empty() {
            output.push_str("\nSuggestions:\n");
            for (i, suggestion) in self.context.suggestions.iter().enumerate() {
                output.push_str(&format!("  {}. {}\n", i + 1, suggestion.text));
                if let Some(ref code) = suggestion.code {
                    output.push_str(&format!(
                        "     ```\n     {}\n     ```\n",
                        code.replace('\n', "\n     ")
                    ));
                }
            }
        }

        if let Some(ref help) = self.context.help {
            output.push_str(&format!("\nHelp: {}\n", help));
        }

        output
    }
}
