//! Transaction vocabulary shared by every backend.
//!
//! ```rust
//! use strand_query::IsolationLevel;
//!
//! assert_eq!(IsolationLevel::default(), IsolationLevel::ReadCommitted);
//! assert_eq!(IsolationLevel::Serializable.as_sql(), "SERIALIZABLE");
//! ```

use std::fmt;

/// Transaction isolation levels.
///
/// Relational backends translate these into `SET TRANSACTION` clauses.
/// Backends without per-transaction isolation accept and ignore them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IsolationLevel {
    /// Read uncommitted - allows dirty reads.
    ReadUncommitted,
    /// Read committed - prevents dirty reads.
    #[default]
    ReadCommitted,
    /// Repeatable read - prevents non-repeatable reads.
    RepeatableRead,
    /// Serializable - highest isolation level.
    Serializable,
}

impl IsolationLevel {
    /// Get the SQL clause for this isolation level.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::ReadUncommitted => "READ UNCOMMITTED",
            Self::ReadCommitted => "READ COMMITTED",
            Self::RepeatableRead => "REPEATABLE READ",
            Self::Serializable => "SERIALIZABLE",
        }
    }
}

impl fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Where a query runner is in its transaction lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TransactionState {
    /// No transaction is open.
    #[default]
    Idle,
    /// A transaction is open on the runner.
    Active,
}

impl TransactionState {
    /// Build the state from a runner's active flag.
    pub fn from_active(active: bool) -> Self {
        if active { Self::Active } else { Self::Idle }
    }

    /// Check if a transaction is open.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_isolation_display() {
        assert_eq!(IsolationLevel::RepeatableRead.to_string(), "REPEATABLE READ");
    }

    #[test]
    fn test_state_from_flag() {
        assert_eq!(TransactionState::from_active(true), TransactionState::Active);
        assert!(!TransactionState::from_active(false).is_active());
    }
}
