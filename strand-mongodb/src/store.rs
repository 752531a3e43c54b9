//! The document store boundary a query runner drives.
//!
//! [`DocumentStore`] lists the primitive collection and database operations a
//! [`MongoQueryRunner`](crate::MongoQueryRunner) forwards to. Each operation is
//! session-aware: when the runner holds an open transaction it passes its
//! session, otherwise `None`. [`MongoClient`] implements the trait on top of the
//! official driver; tests substitute an in-memory recorder.

use async_trait::async_trait;
use bson::{Bson, Document};
use futures::stream::{BoxStream, StreamExt, TryStreamExt};
use mongodb::change_stream::event::ChangeStreamEvent;
use mongodb::options::{
    AggregateOptions, ChangeStreamOptions, CountOptions, CreateIndexOptions, DeleteOptions,
    DistinctOptions, DropIndexOptions, FindOneAndDeleteOptions, FindOneAndReplaceOptions,
    FindOneAndUpdateOptions, FindOneOptions, FindOptions, InsertManyOptions, InsertOneOptions,
    ListIndexesOptions, ReplaceOptions, TransactionOptions, UpdateModifications, UpdateOptions,
};
use mongodb::{ClientSession, Collection, IndexModel};

use crate::client::MongoClient;
use crate::error::{MongoError, MongoResult};
use crate::types::{DeleteResult, InsertManyResult, InsertOneResult, UpdateResult};

/// Stream of change events from [`DocumentStore::watch`].
pub type ChangeEventStream = BoxStream<'static, MongoResult<ChangeStreamEvent<Document>>>;

/// A session able to carry one multi-document transaction at a time.
#[async_trait]
pub trait StoreSession: Send {
    /// Begin a transaction on this session.
    async fn begin(&mut self, options: TransactionOptions) -> MongoResult<()>;

    /// Commit the transaction.
    async fn commit(&mut self) -> MongoResult<()>;

    /// Abort the transaction.
    async fn abort(&mut self) -> MongoResult<()>;

    /// End the session, returning it to the pool.
    fn end(self)
    where
        Self: Sized,
    {
        drop(self);
    }
}

#[async_trait]
impl StoreSession for ClientSession {
    async fn begin(&mut self, options: TransactionOptions) -> MongoResult<()> {
        self.start_transaction(options).await?;
        Ok(())
    }

    async fn commit(&mut self) -> MongoResult<()> {
        self.commit_transaction().await?;
        Ok(())
    }

    async fn abort(&mut self) -> MongoResult<()> {
        self.abort_transaction().await?;
        Ok(())
    }
}

/// Primitive operations of a document database.
///
/// Cursor-returning driver calls are drained before returning.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Session type carrying transactions.
    type Session: StoreSession;

    /// Name of the database collections live in.
    fn database_name(&self) -> &str;

    /// Whether runners over this store open real transactions.
    fn transactions_enabled(&self) -> bool;

    /// Options applied when a transaction begins.
    fn transaction_options(&self) -> TransactionOptions;

    /// Open a new session.
    async fn start_session(&self) -> MongoResult<Self::Session>;

    /// Find documents matching a filter.
    async fn find(
        &self,
        collection: &str,
        filter: Document,
        options: Option<FindOptions>,
        session: Option<&mut Self::Session>,
    ) -> MongoResult<Vec<Document>>;

    /// Find the first document matching a filter.
    async fn find_one(
        &self,
        collection: &str,
        filter: Document,
        options: Option<FindOneOptions>,
        session: Option<&mut Self::Session>,
    ) -> MongoResult<Option<Document>>;

    /// Run an aggregation pipeline.
    async fn aggregate(
        &self,
        collection: &str,
        pipeline: Vec<Document>,
        options: Option<AggregateOptions>,
        session: Option<&mut Self::Session>,
    ) -> MongoResult<Vec<Document>>;

    /// Count documents matching a filter.
    async fn count_documents(
        &self,
        collection: &str,
        filter: Document,
        options: Option<CountOptions>,
        session: Option<&mut Self::Session>,
    ) -> MongoResult<u64>;

    /// Create one index, returning its name.
    async fn create_index(
        &self,
        collection: &str,
        index: IndexModel,
        options: Option<CreateIndexOptions>,
        session: Option<&mut Self::Session>,
    ) -> MongoResult<String>;

    /// Create several indexes, returning their names.
    async fn create_indexes(
        &self,
        collection: &str,
        indexes: Vec<IndexModel>,
        options: Option<CreateIndexOptions>,
        session: Option<&mut Self::Session>,
    ) -> MongoResult<Vec<String>>;

    /// List the indexes of a collection.
    async fn list_indexes(
        &self,
        collection: &str,
        options: Option<ListIndexesOptions>,
        session: Option<&mut Self::Session>,
    ) -> MongoResult<Vec<IndexModel>>;

    /// List the index names of a collection.
    async fn list_index_names(
        &self,
        collection: &str,
        session: Option<&mut Self::Session>,
    ) -> MongoResult<Vec<String>>;

    /// Drop an index by name.
    async fn drop_index(
        &self,
        collection: &str,
        name: &str,
        options: Option<DropIndexOptions>,
        session: Option<&mut Self::Session>,
    ) -> MongoResult<()>;

    /// Drop every index except `_id`.
    async fn drop_indexes(
        &self,
        collection: &str,
        options: Option<DropIndexOptions>,
        session: Option<&mut Self::Session>,
    ) -> MongoResult<()>;

    /// Delete the first matching document.
    async fn delete_one(
        &self,
        collection: &str,
        filter: Document,
        options: Option<DeleteOptions>,
        session: Option<&mut Self::Session>,
    ) -> MongoResult<DeleteResult>;

    /// Delete every matching document.
    async fn delete_many(
        &self,
        collection: &str,
        filter: Document,
        options: Option<DeleteOptions>,
        session: Option<&mut Self::Session>,
    ) -> MongoResult<DeleteResult>;

    /// Distinct values of a field.
    async fn distinct(
        &self,
        collection: &str,
        field: &str,
        filter: Document,
        options: Option<DistinctOptions>,
        session: Option<&mut Self::Session>,
    ) -> MongoResult<Vec<Bson>>;

    /// Atomically find and delete a document.
    async fn find_one_and_delete(
        &self,
        collection: &str,
        filter: Document,
        options: Option<FindOneAndDeleteOptions>,
        session: Option<&mut Self::Session>,
    ) -> MongoResult<Option<Document>>;

    /// Atomically find and replace a document.
    async fn find_one_and_replace(
        &self,
        collection: &str,
        filter: Document,
        replacement: Document,
        options: Option<FindOneAndReplaceOptions>,
        session: Option<&mut Self::Session>,
    ) -> MongoResult<Option<Document>>;

    /// Atomically find and update a document.
    async fn find_one_and_update(
        &self,
        collection: &str,
        filter: Document,
        update: UpdateModifications,
        options: Option<FindOneAndUpdateOptions>,
        session: Option<&mut Self::Session>,
    ) -> MongoResult<Option<Document>>;

    /// Insert one document.
    async fn insert_one(
        &self,
        collection: &str,
        document: Document,
        options: Option<InsertOneOptions>,
        session: Option<&mut Self::Session>,
    ) -> MongoResult<InsertOneResult>;

    /// Insert several documents.
    async fn insert_many(
        &self,
        collection: &str,
        documents: Vec<Document>,
        options: Option<InsertManyOptions>,
        session: Option<&mut Self::Session>,
    ) -> MongoResult<InsertManyResult>;

    /// Replace the first matching document.
    async fn replace_one(
        &self,
        collection: &str,
        filter: Document,
        replacement: Document,
        options: Option<ReplaceOptions>,
        session: Option<&mut Self::Session>,
    ) -> MongoResult<UpdateResult>;

    /// Update the first matching document.
    async fn update_one(
        &self,
        collection: &str,
        filter: Document,
        update: UpdateModifications,
        options: Option<UpdateOptions>,
        session: Option<&mut Self::Session>,
    ) -> MongoResult<UpdateResult>;

    /// Update every matching document.
    async fn update_many(
        &self,
        collection: &str,
        filter: Document,
        update: UpdateModifications,
        options: Option<UpdateOptions>,
        session: Option<&mut Self::Session>,
    ) -> MongoResult<UpdateResult>;

    /// Open a change stream on a collection.
    async fn watch(
        &self,
        collection: &str,
        pipeline: Vec<Document>,
        options: Option<ChangeStreamOptions>,
    ) -> MongoResult<ChangeEventStream>;

    /// Run a raw command against `database`, the configured one when `None`.
    async fn run_command(
        &self,
        database: Option<&str>,
        command: Document,
        session: Option<&mut Self::Session>,
    ) -> MongoResult<Document>;

    /// Drop a collection.
    async fn drop_collection(&self, collection: &str) -> MongoResult<()>;

    /// Drop a database, the configured one when `None`.
    async fn drop_database(&self, database: Option<&str>) -> MongoResult<()>;
}

impl MongoClient {
    fn documents(&self, collection: &str) -> Collection<Document> {
        self.collection_doc(collection)
    }
}

#[async_trait]
impl DocumentStore for MongoClient {
    type Session = ClientSession;

    fn database_name(&self) -> &str {
        &self.config().database
    }

    fn transactions_enabled(&self) -> bool {
        self.config().transactions
    }

    fn transaction_options(&self) -> TransactionOptions {
        self.config().transaction_options()
    }

    async fn start_session(&self) -> MongoResult<ClientSession> {
        MongoClient::start_session(self).await
    }

    async fn find(
        &self,
        collection: &str,
        filter: Document,
        options: Option<FindOptions>,
        session: Option<&mut ClientSession>,
    ) -> MongoResult<Vec<Document>> {
        let coll = self.documents(collection);
        let docs = match session {
            Some(session) => {
                let mut cursor = coll.find_with_session(filter, options, session).await?;
                cursor.stream(session).try_collect().await?
            }
            None => coll.find(filter, options).await?.try_collect().await?,
        };
        Ok(docs)
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: Document,
        options: Option<FindOneOptions>,
        session: Option<&mut ClientSession>,
    ) -> MongoResult<Option<Document>> {
        let coll = self.documents(collection);
        let doc = match session {
            Some(session) => coll.find_one_with_session(filter, options, session).await?,
            None => coll.find_one(filter, options).await?,
        };
        Ok(doc)
    }

    async fn aggregate(
        &self,
        collection: &str,
        pipeline: Vec<Document>,
        options: Option<AggregateOptions>,
        session: Option<&mut ClientSession>,
    ) -> MongoResult<Vec<Document>> {
        let coll = self.documents(collection);
        let docs = match session {
            Some(session) => {
                let mut cursor = coll
                    .aggregate_with_session(pipeline, options, session)
                    .await?;
                cursor.stream(session).try_collect().await?
            }
            None => coll.aggregate(pipeline, options).await?.try_collect().await?,
        };
        Ok(docs)
    }

    async fn count_documents(
        &self,
        collection: &str,
        filter: Document,
        options: Option<CountOptions>,
        session: Option<&mut ClientSession>,
    ) -> MongoResult<u64> {
        let coll = self.documents(collection);
        let count = match session {
            Some(session) => {
                coll.count_documents_with_session(filter, options, session)
                    .await?
            }
            None => coll.count_documents(filter, options).await?,
        };
        Ok(count)
    }

    async fn create_index(
        &self,
        collection: &str,
        index: IndexModel,
        options: Option<CreateIndexOptions>,
        session: Option<&mut ClientSession>,
    ) -> MongoResult<String> {
        let coll = self.documents(collection);
        let result = match session {
            Some(session) => coll.create_index_with_session(index, options, session).await?,
            None => coll.create_index(index, options).await?,
        };
        Ok(result.index_name)
    }

    async fn create_indexes(
        &self,
        collection: &str,
        indexes: Vec<IndexModel>,
        options: Option<CreateIndexOptions>,
        session: Option<&mut ClientSession>,
    ) -> MongoResult<Vec<String>> {
        let coll = self.documents(collection);
        let result = match session {
            Some(session) => {
                coll.create_indexes_with_session(indexes, options, session)
                    .await?
            }
            None => coll.create_indexes(indexes, options).await?,
        };
        Ok(result.index_names)
    }

    async fn list_indexes(
        &self,
        collection: &str,
        options: Option<ListIndexesOptions>,
        session: Option<&mut ClientSession>,
    ) -> MongoResult<Vec<IndexModel>> {
        let coll = self.documents(collection);
        let models = match session {
            Some(session) => {
                let mut cursor = coll.list_indexes_with_session(options, session).await?;
                cursor.stream(session).try_collect().await?
            }
            None => coll.list_indexes(options).await?.try_collect().await?,
        };
        Ok(models)
    }

    async fn list_index_names(
        &self,
        collection: &str,
        session: Option<&mut ClientSession>,
    ) -> MongoResult<Vec<String>> {
        let coll = self.documents(collection);
        let names = match session {
            Some(session) => coll.list_index_names_with_session(session).await?,
            None => coll.list_index_names().await?,
        };
        Ok(names)
    }

    async fn drop_index(
        &self,
        collection: &str,
        name: &str,
        options: Option<DropIndexOptions>,
        session: Option<&mut ClientSession>,
    ) -> MongoResult<()> {
        let coll = self.documents(collection);
        match session {
            Some(session) => coll.drop_index_with_session(name, options, session).await?,
            None => coll.drop_index(name, options).await?,
        }
        Ok(())
    }

    async fn drop_indexes(
        &self,
        collection: &str,
        options: Option<DropIndexOptions>,
        session: Option<&mut ClientSession>,
    ) -> MongoResult<()> {
        let coll = self.documents(collection);
        match session {
            Some(session) => coll.drop_indexes_with_session(options, session).await?,
            None => coll.drop_indexes(options).await?,
        }
        Ok(())
    }

    async fn delete_one(
        &self,
        collection: &str,
        filter: Document,
        options: Option<DeleteOptions>,
        session: Option<&mut ClientSession>,
    ) -> MongoResult<DeleteResult> {
        let coll = self.documents(collection);
        let result = match session {
            Some(session) => coll.delete_one_with_session(filter, options, session).await?,
            None => coll.delete_one(filter, options).await?,
        };
        Ok(result.into())
    }

    async fn delete_many(
        &self,
        collection: &str,
        filter: Document,
        options: Option<DeleteOptions>,
        session: Option<&mut ClientSession>,
    ) -> MongoResult<DeleteResult> {
        let coll = self.documents(collection);
        let result = match session {
            Some(session) => coll.delete_many_with_session(filter, options, session).await?,
            None => coll.delete_many(filter, options).await?,
        };
        Ok(result.into())
    }

    async fn distinct(
        &self,
        collection: &str,
        field: &str,
        filter: Document,
        options: Option<DistinctOptions>,
        session: Option<&mut ClientSession>,
    ) -> MongoResult<Vec<Bson>> {
        let coll = self.documents(collection);
        let values = match session {
            Some(session) => {
                coll.distinct_with_session(field, filter, options, session)
                    .await?
            }
            None => coll.distinct(field, filter, options).await?,
        };
        Ok(values)
    }

    async fn find_one_and_delete(
        &self,
        collection: &str,
        filter: Document,
        options: Option<FindOneAndDeleteOptions>,
        session: Option<&mut ClientSession>,
    ) -> MongoResult<Option<Document>> {
        let coll = self.documents(collection);
        let doc = match session {
            Some(session) => {
                coll.find_one_and_delete_with_session(filter, options, session)
                    .await?
            }
            None => coll.find_one_and_delete(filter, options).await?,
        };
        Ok(doc)
    }

    async fn find_one_and_replace(
        &self,
        collection: &str,
        filter: Document,
        replacement: Document,
        options: Option<FindOneAndReplaceOptions>,
        session: Option<&mut ClientSession>,
    ) -> MongoResult<Option<Document>> {
        let coll = self.documents(collection);
        let doc = match session {
            Some(session) => {
                coll.find_one_and_replace_with_session(filter, replacement, options, session)
                    .await?
            }
            None => {
                coll.find_one_and_replace(filter, replacement, options)
                    .await?
            }
        };
        Ok(doc)
    }

    async fn find_one_and_update(
        &self,
        collection: &str,
        filter: Document,
        update: UpdateModifications,
        options: Option<FindOneAndUpdateOptions>,
        session: Option<&mut ClientSession>,
    ) -> MongoResult<Option<Document>> {
        let coll = self.documents(collection);
        let doc = match session {
            Some(session) => {
                coll.find_one_and_update_with_session(filter, update, options, session)
                    .await?
            }
            None => coll.find_one_and_update(filter, update, options).await?,
        };
        Ok(doc)
    }

    async fn insert_one(
        &self,
        collection: &str,
        document: Document,
        options: Option<InsertOneOptions>,
        session: Option<&mut ClientSession>,
    ) -> MongoResult<InsertOneResult> {
        let coll = self.documents(collection);
        let result = match session {
            Some(session) => {
                coll.insert_one_with_session(document, options, session)
                    .await?
            }
            None => coll.insert_one(document, options).await?,
        };
        Ok(result.into())
    }

    async fn insert_many(
        &self,
        collection: &str,
        documents: Vec<Document>,
        options: Option<InsertManyOptions>,
        session: Option<&mut ClientSession>,
    ) -> MongoResult<InsertManyResult> {
        let coll = self.documents(collection);
        let result = match session {
            Some(session) => {
                coll.insert_many_with_session(documents, options, session)
                    .await?
            }
            None => coll.insert_many(documents, options).await?,
        };
        Ok(result.into())
    }

    async fn replace_one(
        &self,
        collection: &str,
        filter: Document,
        replacement: Document,
        options: Option<ReplaceOptions>,
        session: Option<&mut ClientSession>,
    ) -> MongoResult<UpdateResult> {
        let coll = self.documents(collection);
        let result = match session {
            Some(session) => {
                coll.replace_one_with_session(filter, replacement, options, session)
                    .await?
            }
            None => coll.replace_one(filter, replacement, options).await?,
        };
        Ok(result.into())
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: Document,
        update: UpdateModifications,
        options: Option<UpdateOptions>,
        session: Option<&mut ClientSession>,
    ) -> MongoResult<UpdateResult> {
        let coll = self.documents(collection);
        let result = match session {
            Some(session) => {
                coll.update_one_with_session(filter, update, options, session)
                    .await?
            }
            None => coll.update_one(filter, update, options).await?,
        };
        Ok(result.into())
    }

    async fn update_many(
        &self,
        collection: &str,
        filter: Document,
        update: UpdateModifications,
        options: Option<UpdateOptions>,
        session: Option<&mut ClientSession>,
    ) -> MongoResult<UpdateResult> {
        let coll = self.documents(collection);
        let result = match session {
            Some(session) => {
                coll.update_many_with_session(filter, update, options, session)
                    .await?
            }
            None => coll.update_many(filter, update, options).await?,
        };
        Ok(result.into())
    }

    async fn watch(
        &self,
        collection: &str,
        pipeline: Vec<Document>,
        options: Option<ChangeStreamOptions>,
    ) -> MongoResult<ChangeEventStream> {
        let stream = self.documents(collection).watch(pipeline, options).await?;
        Ok(stream.map_err(MongoError::from).boxed())
    }

    async fn run_command(
        &self,
        database: Option<&str>,
        command: Document,
        session: Option<&mut ClientSession>,
    ) -> MongoResult<Document> {
        let db = match database {
            Some(name) => self.get_database(name),
            None => self.database().clone(),
        };
        let reply = match session {
            Some(session) => db.run_command_with_session(command, None, session).await?,
            None => db.run_command(command, None).await?,
        };
        Ok(reply)
    }

    async fn drop_collection(&self, collection: &str) -> MongoResult<()> {
        MongoClient::drop_collection(self, collection).await
    }

    async fn drop_database(&self, database: Option<&str>) -> MongoResult<()> {
        MongoClient::drop_database(self, database).await
    }
}
