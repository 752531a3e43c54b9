//! Transaction subscribers and the broadcaster that notifies them.
//!
//! Subscribers are called in registration order. The first failing hook stops
//! the broadcast and its error is returned to the query runner, which decides
//! how to unwind (see each backend's transaction methods).
//!
//! ```rust,ignore
//! use strand_query::runner::{Broadcaster, TransactionEvent, TransactionSubscriber};
//!
//! struct AuditTrail;
//!
//! #[async_trait::async_trait]
//! impl TransactionSubscriber for AuditTrail {
//!     async fn after_transaction_commit(&self, event: &mut TransactionEvent<'_>) -> QueryResult<()> {
//!         event.data.insert("committed", true);
//!         Ok(())
//!     }
//! }
//!
//! let broadcaster = Broadcaster::new().with(AuditTrail);
//! ```

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use super::data::RunnerData;
use crate::error::QueryResult;

/// A point in the transaction lifecycle at which subscribers are notified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionPhase {
    /// About to open a transaction.
    BeforeStart,
    /// Transaction is open.
    AfterStart,
    /// About to commit.
    BeforeCommit,
    /// Commit finished.
    AfterCommit,
    /// About to roll back.
    BeforeRollback,
    /// Rollback finished.
    AfterRollback,
}

impl TransactionPhase {
    /// Event name as reported in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BeforeStart => "BeforeTransactionStart",
            Self::AfterStart => "AfterTransactionStart",
            Self::BeforeCommit => "BeforeTransactionCommit",
            Self::AfterCommit => "AfterTransactionCommit",
            Self::BeforeRollback => "BeforeTransactionRollback",
            Self::AfterRollback => "AfterTransactionRollback",
        }
    }
}

impl fmt::Display for TransactionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event handed to a subscriber hook.
#[derive(Debug)]
pub struct TransactionEvent<'a> {
    /// The lifecycle point being reported.
    pub phase: TransactionPhase,
    /// Name of the backend driving the runner.
    pub backend: &'static str,
    /// The runner's scratch data.
    pub data: &'a mut RunnerData,
}

/// Listener notified around transaction boundaries.
///
/// Every hook defaults to a no-op.
#[async_trait]
pub trait TransactionSubscriber: Send + Sync {
    /// Called before a transaction is opened.
    async fn before_transaction_start(&self, _event: &mut TransactionEvent<'_>) -> QueryResult<()> {
        Ok(())
    }

    /// Called once the transaction is open.
    async fn after_transaction_start(&self, _event: &mut TransactionEvent<'_>) -> QueryResult<()> {
        Ok(())
    }

    /// Called before a commit.
    async fn before_transaction_commit(&self, _event: &mut TransactionEvent<'_>) -> QueryResult<()> {
        Ok(())
    }

    /// Called after a successful commit.
    async fn after_transaction_commit(&self, _event: &mut TransactionEvent<'_>) -> QueryResult<()> {
        Ok(())
    }

    /// Called before a rollback.
    async fn before_transaction_rollback(
        &self,
        _event: &mut TransactionEvent<'_>,
    ) -> QueryResult<()> {
        Ok(())
    }

    /// Called after a successful rollback.
    async fn after_transaction_rollback(
        &self,
        _event: &mut TransactionEvent<'_>,
    ) -> QueryResult<()> {
        Ok(())
    }
}

/// Shared subscriber handle.
pub type SharedSubscriber = Arc<dyn TransactionSubscriber>;

/// Fan-out of transaction events to registered subscribers.
#[derive(Clone, Default)]
pub struct Broadcaster {
    subscribers: Vec<SharedSubscriber>,
}

impl Broadcaster {
    /// Create a broadcaster with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a broadcaster from existing subscribers.
    pub fn from_subscribers(subscribers: Vec<SharedSubscriber>) -> Self {
        Self { subscribers }
    }

    /// Add a subscriber (builder style).
    pub fn with<S: TransactionSubscriber + 'static>(mut self, subscriber: S) -> Self {
        self.subscribers.push(Arc::new(subscriber));
        self
    }

    /// Add a subscriber.
    pub fn push(&mut self, subscriber: SharedSubscriber) {
        self.subscribers.push(subscriber);
    }

    /// Number of subscribers.
    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    /// Check if no subscriber is registered.
    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Notify every subscriber of `phase`, stopping at the first failure.
    pub async fn broadcast(
        &self,
        phase: TransactionPhase,
        backend: &'static str,
        data: &mut RunnerData,
    ) -> QueryResult<()> {
        crate::strand_trace!(
            phase = %phase,
            backend,
            subscribers = self.subscribers.len(),
            "Broadcasting transaction event"
        );

        for subscriber in &self.subscribers {
            let mut event = TransactionEvent {
                phase,
                backend,
                data: &mut *data,
            };

            match phase {
                TransactionPhase::BeforeStart => subscriber.before_transaction_start(&mut event),
                TransactionPhase::AfterStart => subscriber.after_transaction_start(&mut event),
                TransactionPhase::BeforeCommit => subscriber.before_transaction_commit(&mut event),
                TransactionPhase::AfterCommit => subscriber.after_transaction_commit(&mut event),
                TransactionPhase::BeforeRollback => {
                    subscriber.before_transaction_rollback(&mut event)
                }
                TransactionPhase::AfterRollback => subscriber.after_transaction_rollback(&mut event),
            }
            .await
            .inspect_err(|e| {
                tracing::debug!(phase = %phase, backend, error = %e, "Transaction subscriber failed");
            })?;
        }

        Ok(())
    }
}

impl fmt::Debug for Broadcaster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Broadcaster")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QueryError;
    use std::sync::Mutex;

    struct Recorder {
        name: &'static str,
        seen: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl TransactionSubscriber for Recorder {
        async fn before_transaction_start(&self, event: &mut TransactionEvent<'_>) -> QueryResult<()> {
            self.seen
                .lock()
                .unwrap()
                .push(format!("{}:{}", self.name, event.phase));
            event.data.insert(self.name, true);
            Ok(())
        }

        async fn after_transaction_commit(&self, event: &mut TransactionEvent<'_>) -> QueryResult<()> {
            self.seen
                .lock()
                .unwrap()
                .push(format!("{}:{}", self.name, event.phase));
            Ok(())
        }
    }

    struct Veto;

    #[async_trait]
    impl TransactionSubscriber for Veto {
        async fn before_transaction_start(&self, _event: &mut TransactionEvent<'_>) -> QueryResult<()> {
            Err(QueryError::transaction("vetoed"))
        }
    }

    #[tokio::test]
    async fn test_broadcast_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let broadcaster = Broadcaster::new()
            .with(Recorder {
                name: "first",
                seen: seen.clone(),
            })
            .with(Recorder {
                name: "second",
                seen: seen.clone(),
            });

        let mut data = RunnerData::new();
        broadcaster
            .broadcast(TransactionPhase::BeforeStart, "test", &mut data)
            .await
            .unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec!["first:BeforeTransactionStart", "second:BeforeTransactionStart"]
        );
        assert!(data.contains("first"));
        assert!(data.contains("second"));
    }

    #[tokio::test]
    async fn test_default_hooks_are_noops() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let broadcaster = Broadcaster::new().with(Recorder {
            name: "only",
            seen: seen.clone(),
        });

        let mut data = RunnerData::new();
        broadcaster
            .broadcast(TransactionPhase::AfterRollback, "test", &mut data)
            .await
            .unwrap();

        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failure_stops_broadcast() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let broadcaster = Broadcaster::new().with(Veto).with(Recorder {
            name: "late",
            seen: seen.clone(),
        });

        let mut data = RunnerData::new();
        let err = broadcaster
            .broadcast(TransactionPhase::BeforeStart, "test", &mut data)
            .await
            .unwrap_err();

        assert!(err.message.contains("vetoed"));
        assert!(seen.lock().unwrap().is_empty());
    }
}
