//! Transaction lifecycle of the MongoDB query runner.
//!
//! A runner is either idle (no session) or active (one session with an open
//! transaction). When the store has transactions disabled every lifecycle call
//! is a no-op, so code written for relational backends runs unchanged against
//! a standalone server.

use strand_query::{IsolationLevel, QueryError, QueryResult, TransactionPhase};
use tracing::{debug, info, warn};

use super::{BACKEND_NAME, MongoQueryRunner};
use crate::store::{DocumentStore, StoreSession};

/// How an active transaction ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Outcome {
    Commit,
    Rollback,
}

impl Outcome {
    fn phases(self) -> (TransactionPhase, TransactionPhase) {
        match self {
            Self::Commit => (TransactionPhase::BeforeCommit, TransactionPhase::AfterCommit),
            Self::Rollback => (
                TransactionPhase::BeforeRollback,
                TransactionPhase::AfterRollback,
            ),
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Commit => "commit",
            Self::Rollback => "rollback",
        }
    }
}

impl<S: DocumentStore> MongoQueryRunner<S> {
    pub(super) async fn begin_transaction(
        &mut self,
        isolation: Option<IsolationLevel>,
    ) -> QueryResult<()> {
        if !self.store.transactions_enabled() {
            debug!(runner_id = %self.id, "Transactions disabled, start is a no-op");
            return Ok(());
        }

        if let Some(level) = isolation {
            debug!(
                runner_id = %self.id,
                isolation = %level,
                "MongoDB has no per-transaction isolation levels, ignoring"
            );
        }

        if self.transaction_active {
            warn!(
                runner_id = %self.id,
                "Transaction already active, abandoning its session"
            );
        }

        self.transaction_active = true;

        if let Err(e) = self.notify(TransactionPhase::BeforeStart).await {
            self.transaction_active = self.session.is_some();
            return Err(e);
        }

        let session = match self.open_session().await {
            Ok(session) => session,
            Err(e) => {
                self.transaction_active = self.session.is_some();
                return Err(e);
            }
        };

        if let Some(previous) = self.session.replace(session) {
            previous.end();
        }

        info!(runner_id = %self.id, "Transaction started");
        self.notify(TransactionPhase::AfterStart).await
    }

    pub(super) async fn finish_transaction(&mut self, outcome: Outcome) -> QueryResult<()> {
        if !self.store.transactions_enabled() {
            debug!(
                runner_id = %self.id,
                outcome = outcome.as_str(),
                "Transactions disabled, no-op"
            );
            return Ok(());
        }

        if !self.transaction_active {
            return Err(QueryError::transaction_not_started()
                .with_context(format!("{}_transaction", outcome.as_str())));
        }

        let (before, after) = outcome.phases();
        self.notify(before).await?;

        if let Some(session) = self.session.as_mut() {
            let result = match outcome {
                Outcome::Commit => session.commit().await,
                Outcome::Rollback => session.abort().await,
            };
            result.map_err(|e| {
                warn!(
                    runner_id = %self.id,
                    outcome = outcome.as_str(),
                    error = %e,
                    "Transaction did not finish, still active"
                );
                QueryError::from(e)
            })?;
        }

        if let Some(session) = self.session.take() {
            session.end();
        }
        self.transaction_active = false;

        info!(runner_id = %self.id, outcome = outcome.as_str(), "Transaction finished");
        self.notify(after).await
    }

    async fn open_session(&mut self) -> QueryResult<S::Session> {
        let mut session = self.store.start_session().await?;
        session.begin(self.store.transaction_options()).await?;
        Ok(session)
    }

    async fn notify(&mut self, phase: TransactionPhase) -> QueryResult<()> {
        self.broadcaster
            .broadcast(phase, BACKEND_NAME, &mut self.data)
            .await
    }
}
