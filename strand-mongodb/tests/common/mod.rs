//! In-memory document store that records every call a query runner makes.

#![allow(dead_code)]

use std::cell::Cell;
use std::collections::HashSet;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use bson::{Bson, Document, doc};
use futures::StreamExt;
use mongodb::IndexModel;
use mongodb::options::{
    AggregateOptions, ChangeStreamOptions, CountOptions, CreateIndexOptions, DeleteOptions,
    DistinctOptions, DropIndexOptions, FindOneAndDeleteOptions, FindOneAndReplaceOptions,
    FindOneAndUpdateOptions, FindOneOptions, FindOptions, IndexOptions, InsertManyOptions,
    InsertOneOptions, ListIndexesOptions, ReplaceOptions, TransactionOptions,
    UpdateModifications, UpdateOptions,
};
use parking_lot::Mutex;
use strand_mongodb::{
    ChangeEventStream, DeleteResult, DocumentStore, InsertManyResult, InsertOneResult, MongoError,
    MongoQueryRunner, MongoResult, StoreSession, UpdateResult,
};
use strand_query::{
    Broadcaster, QueryError, QueryResult, TransactionEvent, TransactionPhase,
    TransactionSubscriber,
};

pub const DATABASE: &str = "shop";

/// One recorded store or session call.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    /// Operation name, e.g. `insert_one` or `commit`.
    pub op: &'static str,
    /// Collection or database the call targeted.
    pub target: String,
    /// Id of the session passed along, if any.
    pub session: Option<u64>,
    /// Raw command, for `run_command`.
    pub command: Option<Document>,
}

#[derive(Default)]
struct State {
    calls: Vec<Call>,
    failures: HashSet<&'static str>,
    next_session: u64,
}

impl State {
    fn record(
        &mut self,
        op: &'static str,
        target: &str,
        session: Option<u64>,
        command: Option<Document>,
    ) -> MongoResult<()> {
        self.calls.push(Call {
            op,
            target: target.to_string(),
            session,
            command,
        });

        if self.failures.contains(op) {
            return Err(MongoError::query(format!("injected {} failure", op)));
        }
        Ok(())
    }
}

/// Recording store with configurable transactions and failure injection.
#[derive(Clone)]
pub struct RecordingStore {
    state: Arc<Mutex<State>>,
    transactions: bool,
}

impl RecordingStore {
    pub fn new(transactions: bool) -> Self {
        Self {
            state: Arc::new(Mutex::new(State::default())),
            transactions,
        }
    }

    pub fn enabled() -> Self {
        Self::new(true)
    }

    pub fn disabled() -> Self {
        Self::new(false)
    }

    /// Make every call named `op` fail after being recorded.
    pub fn fail_on(&self, op: &'static str) {
        self.state.lock().failures.insert(op);
    }

    pub fn heal(&self, op: &'static str) {
        self.state.lock().failures.remove(op);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    pub fn ops(&self) -> Vec<&'static str> {
        self.state.lock().calls.iter().map(|c| c.op).collect()
    }

    pub fn last(&self) -> Option<Call> {
        self.state.lock().calls.last().cloned()
    }

    pub fn sessions_started(&self) -> u64 {
        self.state.lock().next_session
    }

    pub fn reset(&self) {
        self.state.lock().calls.clear();
    }

    pub fn runner(&self) -> MongoQueryRunner<RecordingStore> {
        MongoQueryRunner::new(self.clone(), Broadcaster::new())
    }

    pub fn runner_with(&self, broadcaster: Broadcaster) -> MongoQueryRunner<RecordingStore> {
        MongoQueryRunner::new(self.clone(), broadcaster)
    }

    fn record(
        &self,
        op: &'static str,
        target: &str,
        session: Option<&mut MockSession>,
    ) -> MongoResult<()> {
        self.state
            .lock()
            .record(op, target, session.map(|s| s.id), None)
    }
}

/// Session handed out by [`RecordingStore`].
///
/// `Send` but not `Sync`, like the driver's `ClientSession`.
pub struct MockSession {
    pub id: u64,
    state: Arc<Mutex<State>>,
    _not_sync: PhantomData<Cell<()>>,
}

#[async_trait]
impl StoreSession for MockSession {
    async fn begin(&mut self, _options: TransactionOptions) -> MongoResult<()> {
        self.state.lock().record("begin", "", Some(self.id), None)
    }

    async fn commit(&mut self) -> MongoResult<()> {
        self.state.lock().record("commit", "", Some(self.id), None)
    }

    async fn abort(&mut self) -> MongoResult<()> {
        self.state.lock().record("abort", "", Some(self.id), None)
    }

    fn end(self) {
        let _ = self.state.lock().record("end", "", Some(self.id), None);
    }
}

fn update_result() -> UpdateResult {
    UpdateResult {
        matched_count: 1,
        modified_count: 1,
        upserted_id: None,
    }
}

#[async_trait]
impl DocumentStore for RecordingStore {
    type Session = MockSession;

    fn database_name(&self) -> &str {
        DATABASE
    }

    fn transactions_enabled(&self) -> bool {
        self.transactions
    }

    fn transaction_options(&self) -> TransactionOptions {
        TransactionOptions::default()
    }

    async fn start_session(&self) -> MongoResult<MockSession> {
        let mut state = self.state.lock();
        state.next_session += 1;
        let id = state.next_session;
        state.record("start_session", DATABASE, Some(id), None)?;
        Ok(MockSession {
            id,
            state: Arc::clone(&self.state),
            _not_sync: PhantomData,
        })
    }

    async fn find(
        &self,
        collection: &str,
        _filter: Document,
        _options: Option<FindOptions>,
        session: Option<&mut MockSession>,
    ) -> MongoResult<Vec<Document>> {
        self.record("find", collection, session)?;
        Ok(vec![doc! { "_id": 1 }, doc! { "_id": 2 }])
    }

    async fn find_one(
        &self,
        collection: &str,
        _filter: Document,
        _options: Option<FindOneOptions>,
        session: Option<&mut MockSession>,
    ) -> MongoResult<Option<Document>> {
        self.record("find_one", collection, session)?;
        Ok(Some(doc! { "_id": 1 }))
    }

    async fn aggregate(
        &self,
        collection: &str,
        pipeline: Vec<Document>,
        _options: Option<AggregateOptions>,
        session: Option<&mut MockSession>,
    ) -> MongoResult<Vec<Document>> {
        self.record("aggregate", collection, session)?;
        Ok(vec![doc! { "stages": pipeline.len() as i64 }])
    }

    async fn count_documents(
        &self,
        collection: &str,
        _filter: Document,
        _options: Option<CountOptions>,
        session: Option<&mut MockSession>,
    ) -> MongoResult<u64> {
        self.record("count_documents", collection, session)?;
        Ok(3)
    }

    async fn create_index(
        &self,
        collection: &str,
        _index: IndexModel,
        _options: Option<CreateIndexOptions>,
        session: Option<&mut MockSession>,
    ) -> MongoResult<String> {
        self.record("create_index", collection, session)?;
        Ok("email_1".to_string())
    }

    async fn create_indexes(
        &self,
        collection: &str,
        indexes: Vec<IndexModel>,
        _options: Option<CreateIndexOptions>,
        session: Option<&mut MockSession>,
    ) -> MongoResult<Vec<String>> {
        self.record("create_indexes", collection, session)?;
        Ok((0..indexes.len()).map(|i| format!("index_{}", i)).collect())
    }

    async fn list_indexes(
        &self,
        collection: &str,
        _options: Option<ListIndexesOptions>,
        session: Option<&mut MockSession>,
    ) -> MongoResult<Vec<IndexModel>> {
        self.record("list_indexes", collection, session)?;
        Ok(vec![
            IndexModel::builder()
                .keys(doc! { "_id": 1 })
                .options(IndexOptions::builder().name("_id_".to_string()).build())
                .build(),
            IndexModel::builder().keys(doc! { "email": 1 }).build(),
        ])
    }

    async fn list_index_names(
        &self,
        collection: &str,
        session: Option<&mut MockSession>,
    ) -> MongoResult<Vec<String>> {
        self.record("list_index_names", collection, session)?;
        Ok(vec!["_id_".to_string(), "email_1".to_string()])
    }

    async fn drop_index(
        &self,
        collection: &str,
        _name: &str,
        _options: Option<DropIndexOptions>,
        session: Option<&mut MockSession>,
    ) -> MongoResult<()> {
        self.record("drop_index", collection, session)
    }

    async fn drop_indexes(
        &self,
        collection: &str,
        _options: Option<DropIndexOptions>,
        session: Option<&mut MockSession>,
    ) -> MongoResult<()> {
        self.record("drop_indexes", collection, session)
    }

    async fn delete_one(
        &self,
        collection: &str,
        _filter: Document,
        _options: Option<DeleteOptions>,
        session: Option<&mut MockSession>,
    ) -> MongoResult<DeleteResult> {
        self.record("delete_one", collection, session)?;
        Ok(DeleteResult { deleted_count: 1 })
    }

    async fn delete_many(
        &self,
        collection: &str,
        _filter: Document,
        _options: Option<DeleteOptions>,
        session: Option<&mut MockSession>,
    ) -> MongoResult<DeleteResult> {
        self.record("delete_many", collection, session)?;
        Ok(DeleteResult { deleted_count: 5 })
    }

    async fn distinct(
        &self,
        collection: &str,
        field: &str,
        _filter: Document,
        _options: Option<DistinctOptions>,
        session: Option<&mut MockSession>,
    ) -> MongoResult<Vec<Bson>> {
        self.record("distinct", collection, session)?;
        Ok(vec![Bson::String(field.to_string())])
    }

    async fn find_one_and_delete(
        &self,
        collection: &str,
        _filter: Document,
        _options: Option<FindOneAndDeleteOptions>,
        session: Option<&mut MockSession>,
    ) -> MongoResult<Option<Document>> {
        self.record("find_one_and_delete", collection, session)?;
        Ok(Some(doc! { "_id": 1 }))
    }

    async fn find_one_and_replace(
        &self,
        collection: &str,
        _filter: Document,
        replacement: Document,
        _options: Option<FindOneAndReplaceOptions>,
        session: Option<&mut MockSession>,
    ) -> MongoResult<Option<Document>> {
        self.record("find_one_and_replace", collection, session)?;
        Ok(Some(replacement))
    }

    async fn find_one_and_update(
        &self,
        collection: &str,
        _filter: Document,
        _update: UpdateModifications,
        _options: Option<FindOneAndUpdateOptions>,
        session: Option<&mut MockSession>,
    ) -> MongoResult<Option<Document>> {
        self.record("find_one_and_update", collection, session)?;
        Ok(None)
    }

    async fn insert_one(
        &self,
        collection: &str,
        document: Document,
        _options: Option<InsertOneOptions>,
        session: Option<&mut MockSession>,
    ) -> MongoResult<InsertOneResult> {
        self.record("insert_one", collection, session)?;
        Ok(InsertOneResult {
            inserted_id: document.get("_id").cloned().unwrap_or(Bson::Int32(42)),
        })
    }

    async fn insert_many(
        &self,
        collection: &str,
        documents: Vec<Document>,
        _options: Option<InsertManyOptions>,
        session: Option<&mut MockSession>,
    ) -> MongoResult<InsertManyResult> {
        self.record("insert_many", collection, session)?;
        Ok(InsertManyResult {
            inserted_ids: (0..documents.len())
                .map(|i| (i, Bson::Int64(i as i64)))
                .collect(),
        })
    }

    async fn replace_one(
        &self,
        collection: &str,
        _filter: Document,
        _replacement: Document,
        options: Option<ReplaceOptions>,
        session: Option<&mut MockSession>,
    ) -> MongoResult<UpdateResult> {
        self.record("replace_one", collection, session)?;
        let upserted = options.and_then(|o| o.upsert).unwrap_or(false);
        Ok(UpdateResult {
            matched_count: if upserted { 0 } else { 1 },
            modified_count: if upserted { 0 } else { 1 },
            upserted_id: upserted.then(|| Bson::String("upserted".to_string())),
        })
    }

    async fn update_one(
        &self,
        collection: &str,
        _filter: Document,
        _update: UpdateModifications,
        _options: Option<UpdateOptions>,
        session: Option<&mut MockSession>,
    ) -> MongoResult<UpdateResult> {
        self.record("update_one", collection, session)?;
        Ok(update_result())
    }

    async fn update_many(
        &self,
        collection: &str,
        _filter: Document,
        _update: UpdateModifications,
        _options: Option<UpdateOptions>,
        session: Option<&mut MockSession>,
    ) -> MongoResult<UpdateResult> {
        self.record("update_many", collection, session)?;
        Ok(UpdateResult {
            matched_count: 4,
            modified_count: 3,
            upserted_id: None,
        })
    }

    async fn watch(
        &self,
        collection: &str,
        _pipeline: Vec<Document>,
        _options: Option<ChangeStreamOptions>,
    ) -> MongoResult<ChangeEventStream> {
        self.record("watch", collection, None)?;
        Ok(futures::stream::empty().boxed())
    }

    async fn run_command(
        &self,
        database: Option<&str>,
        command: Document,
        session: Option<&mut MockSession>,
    ) -> MongoResult<Document> {
        let target = database.unwrap_or(DATABASE);
        self.state.lock().record(
            "run_command",
            target,
            session.map(|s| s.id),
            Some(command.clone()),
        )?;
        Ok(doc! { "ok": 1.0, "capped": true, "echo": command })
    }

    async fn drop_collection(&self, collection: &str) -> MongoResult<()> {
        self.record("drop_collection", collection, None)
    }

    async fn drop_database(&self, database: Option<&str>) -> MongoResult<()> {
        self.record("drop_database", database.unwrap_or(DATABASE), None)
    }
}

/// Subscriber that records the phases it sees and can fail on one of them.
#[derive(Clone, Default)]
pub struct RecordingSubscriber {
    phases: Arc<Mutex<Vec<TransactionPhase>>>,
    fail_at: Option<TransactionPhase>,
}

impl RecordingSubscriber {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_at(phase: TransactionPhase) -> Self {
        Self {
            fail_at: Some(phase),
            ..Self::default()
        }
    }

    pub fn phases(&self) -> Vec<TransactionPhase> {
        self.phases.lock().clone()
    }

    fn see(&self, event: &mut TransactionEvent<'_>) -> QueryResult<()> {
        self.phases.lock().push(event.phase);
        event.data.insert("last_phase", event.phase.as_str());
        if self.fail_at == Some(event.phase) {
            return Err(QueryError::internal(format!("subscriber rejected {}", event.phase)));
        }
        Ok(())
    }
}

#[async_trait]
impl TransactionSubscriber for RecordingSubscriber {
    async fn before_transaction_start(&self, event: &mut TransactionEvent<'_>) -> QueryResult<()> {
        self.see(event)
    }

    async fn after_transaction_start(&self, event: &mut TransactionEvent<'_>) -> QueryResult<()> {
        self.see(event)
    }

    async fn before_transaction_commit(&self, event: &mut TransactionEvent<'_>) -> QueryResult<()> {
        self.see(event)
    }

    async fn after_transaction_commit(&self, event: &mut TransactionEvent<'_>) -> QueryResult<()> {
        self.see(event)
    }

    async fn before_transaction_rollback(
        &self,
        event: &mut TransactionEvent<'_>,
    ) -> QueryResult<()> {
        self.see(event)
    }

    async fn after_transaction_rollback(
        &self,
        event: &mut TransactionEvent<'_>,
    ) -> QueryResult<()> {
        self.see(event)
    }
}
