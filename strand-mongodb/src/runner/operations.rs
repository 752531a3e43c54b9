//! Pass-through data operations.
//!
//! Each method forwards to the matching [`DocumentStore`] call with the
//! runner's session, if a transaction is active. Results and errors come back
//! untouched. Operations the driver has no helper for (geo search, group,
//! map-reduce, parallel scan, reindex, stats, rename) are sent as raw commands.

use bson::{Bson, Document};
use mongodb::IndexModel;
use mongodb::options::{
    AggregateOptions, ChangeStreamOptions, CountOptions, CreateIndexOptions, DeleteOptions,
    DistinctOptions, DropIndexOptions, FindOneAndDeleteOptions, FindOneAndReplaceOptions,
    FindOneAndUpdateOptions, FindOneOptions, FindOptions, InsertManyOptions, InsertOneOptions,
    ListIndexesOptions, ReplaceOptions, UpdateModifications, UpdateOptions,
};
use tracing::debug;

use super::MongoQueryRunner;
use crate::error::MongoResult;
use crate::store::{ChangeEventStream, DocumentStore};
use crate::types::{
    BulkWriteOperation, BulkWriteOptions, BulkWriteResult, DeleteResult, GeoSearchOptions,
    GroupSpec, InsertManyResult, InsertOneResult, MapReduceOptions, UpdateResult, commands,
};

const ADMIN_DATABASE: &str = "admin";

impl<S: DocumentStore> MongoQueryRunner<S> {
    fn log_op(&self, operation: &'static str, collection: &str) {
        debug!(
            runner_id = %self.id,
            collection,
            operation,
            in_transaction = self.session.is_some(),
            "Forwarding operation"
        );
    }

    /// Find documents matching `filter`.
    pub async fn cursor(
        &mut self,
        collection: &str,
        filter: Document,
        options: impl Into<Option<FindOptions>>,
    ) -> MongoResult<Vec<Document>> {
        self.log_op("find", collection);
        self.store
            .find(collection, filter, options.into(), self.session.as_mut())
            .await
    }

    /// Find the first document matching `filter`.
    pub async fn find_one(
        &mut self,
        collection: &str,
        filter: Document,
        options: impl Into<Option<FindOneOptions>>,
    ) -> MongoResult<Option<Document>> {
        self.log_op("findOne", collection);
        self.store
            .find_one(collection, filter, options.into(), self.session.as_mut())
            .await
    }

    /// Run an aggregation pipeline.
    pub async fn aggregate(
        &mut self,
        collection: &str,
        pipeline: Vec<Document>,
        options: impl Into<Option<AggregateOptions>>,
    ) -> MongoResult<Vec<Document>> {
        self.log_op("aggregate", collection);
        self.store
            .aggregate(collection, pipeline, options.into(), self.session.as_mut())
            .await
    }

    /// Count documents matching `filter`.
    pub async fn count(
        &mut self,
        collection: &str,
        filter: Document,
        options: impl Into<Option<CountOptions>>,
    ) -> MongoResult<u64> {
        self.log_op("countDocuments", collection);
        self.store
            .count_documents(collection, filter, options.into(), self.session.as_mut())
            .await
    }

    /// Create an index, returning its name.
    pub async fn create_collection_index(
        &mut self,
        collection: &str,
        index: IndexModel,
        options: impl Into<Option<CreateIndexOptions>>,
    ) -> MongoResult<String> {
        self.log_op("createIndex", collection);
        self.store
            .create_index(collection, index, options.into(), self.session.as_mut())
            .await
    }

    /// Create several indexes, returning their names.
    pub async fn create_collection_indexes(
        &mut self,
        collection: &str,
        indexes: Vec<IndexModel>,
        options: impl Into<Option<CreateIndexOptions>>,
    ) -> MongoResult<Vec<String>> {
        self.log_op("createIndexes", collection);
        self.store
            .create_indexes(collection, indexes, options.into(), self.session.as_mut())
            .await
    }

    /// List the indexes of a collection.
    pub async fn collection_indexes(
        &mut self,
        collection: &str,
        options: impl Into<Option<ListIndexesOptions>>,
    ) -> MongoResult<Vec<IndexModel>> {
        self.log_op("listIndexes", collection);
        self.store
            .list_indexes(collection, options.into(), self.session.as_mut())
            .await
    }

    /// Check that every named index exists.
    pub async fn collection_index_exists(
        &mut self,
        collection: &str,
        names: &[&str],
    ) -> MongoResult<bool> {
        self.log_op("listIndexNames", collection);
        let existing = self
            .store
            .list_index_names(collection, self.session.as_mut())
            .await?;
        Ok(names.iter().all(|name| existing.iter().any(|e| e == name)))
    }

    /// Index names mapped to their key specifications.
    pub async fn collection_index_information(
        &mut self,
        collection: &str,
    ) -> MongoResult<Document> {
        self.log_op("listIndexes", collection);
        let indexes = self
            .store
            .list_indexes(collection, None, self.session.as_mut())
            .await?;

        let mut information = Document::new();
        for index in indexes {
            let name = index
                .options
                .as_ref()
                .and_then(|options| options.name.clone())
                .unwrap_or_else(|| generated_index_name(&index.keys));
            information.insert(name, index.keys);
        }
        Ok(information)
    }

    /// Drop an index by name.
    pub async fn drop_collection_index(
        &mut self,
        collection: &str,
        name: &str,
        options: impl Into<Option<DropIndexOptions>>,
    ) -> MongoResult<()> {
        self.log_op("dropIndex", collection);
        self.store
            .drop_index(collection, name, options.into(), self.session.as_mut())
            .await
    }

    /// Drop every index except `_id`.
    pub async fn drop_collection_indexes(
        &mut self,
        collection: &str,
        options: impl Into<Option<DropIndexOptions>>,
    ) -> MongoResult<()> {
        self.log_op("dropIndexes", collection);
        self.store
            .drop_indexes(collection, options.into(), self.session.as_mut())
            .await
    }

    /// Run a batch of writes in order.
    ///
    /// Ordered batches stop at the first failure. Unordered batches attempt
    /// every write and then report the first failure.
    pub async fn bulk_write(
        &mut self,
        collection: &str,
        operations: Vec<BulkWriteOperation>,
        options: impl Into<Option<BulkWriteOptions>>,
    ) -> MongoResult<BulkWriteResult> {
        let ordered = options.into().unwrap_or_default().ordered;
        debug!(
            runner_id = %self.id,
            collection,
            operations = operations.len(),
            ordered,
            "Forwarding bulk write"
        );

        let mut result = BulkWriteResult::default();
        let mut first_error = None;

        for (index, operation) in operations.into_iter().enumerate() {
            match self.apply_write(collection, index, operation, &mut result).await {
                Ok(()) => {}
                Err(e) if ordered => return Err(e),
                Err(e) => {
                    debug!(runner_id = %self.id, index, error = %e, "Bulk write operation failed");
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(result),
        }
    }

    async fn apply_write(
        &mut self,
        collection: &str,
        index: usize,
        operation: BulkWriteOperation,
        result: &mut BulkWriteResult,
    ) -> MongoResult<()> {
        strand_query::strand_trace!(
            runner_id = %self.id,
            index,
            kind = operation.kind(),
            "Applying bulk write operation"
        );
        let session = self.session.as_mut();

        match operation {
            BulkWriteOperation::InsertOne { document } => {
                let inserted = self
                    .store
                    .insert_one(collection, document, None, session)
                    .await?;
                result.record_insert(index, inserted);
            }
            BulkWriteOperation::UpdateOne {
                filter,
                update,
                upsert,
            } => {
                let updated = self
                    .store
                    .update_one(collection, filter, update, update_options(upsert), session)
                    .await?;
                result.record_update(index, updated);
            }
            BulkWriteOperation::UpdateMany {
                filter,
                update,
                upsert,
            } => {
                let updated = self
                    .store
                    .update_many(collection, filter, update, update_options(upsert), session)
                    .await?;
                result.record_update(index, updated);
            }
            BulkWriteOperation::ReplaceOne {
                filter,
                replacement,
                upsert,
            } => {
                let options = upsert.map(|upsert| ReplaceOptions::builder().upsert(upsert).build());
                let replaced = self
                    .store
                    .replace_one(collection, filter, replacement, options, session)
                    .await?;
                result.record_update(index, replaced);
            }
            BulkWriteOperation::DeleteOne { filter } => {
                let deleted = self
                    .store
                    .delete_one(collection, filter, None, session)
                    .await?;
                result.record_delete(deleted);
            }
            BulkWriteOperation::DeleteMany { filter } => {
                let deleted = self
                    .store
                    .delete_many(collection, filter, None, session)
                    .await?;
                result.record_delete(deleted);
            }
        }

        Ok(())
    }

    /// Delete the first document matching `filter`.
    pub async fn delete_one(
        &mut self,
        collection: &str,
        filter: Document,
        options: impl Into<Option<DeleteOptions>>,
    ) -> MongoResult<DeleteResult> {
        self.log_op("deleteOne", collection);
        self.store
            .delete_one(collection, filter, options.into(), self.session.as_mut())
            .await
    }

    /// Delete every document matching `filter`.
    pub async fn delete_many(
        &mut self,
        collection: &str,
        filter: Document,
        options: impl Into<Option<DeleteOptions>>,
    ) -> MongoResult<DeleteResult> {
        self.log_op("deleteMany", collection);
        self.store
            .delete_many(collection, filter, options.into(), self.session.as_mut())
            .await
    }

    /// Distinct values of `field` among documents matching `filter`.
    pub async fn distinct(
        &mut self,
        collection: &str,
        field: &str,
        filter: Document,
        options: impl Into<Option<DistinctOptions>>,
    ) -> MongoResult<Vec<Bson>> {
        self.log_op("distinct", collection);
        self.store
            .distinct(collection, field, filter, options.into(), self.session.as_mut())
            .await
    }

    /// Atomically find and delete a document.
    pub async fn find_one_and_delete(
        &mut self,
        collection: &str,
        filter: Document,
        options: impl Into<Option<FindOneAndDeleteOptions>>,
    ) -> MongoResult<Option<Document>> {
        self.log_op("findOneAndDelete", collection);
        self.store
            .find_one_and_delete(collection, filter, options.into(), self.session.as_mut())
            .await
    }

    /// Atomically find and replace a document.
    pub async fn find_one_and_replace(
        &mut self,
        collection: &str,
        filter: Document,
        replacement: Document,
        options: impl Into<Option<FindOneAndReplaceOptions>>,
    ) -> MongoResult<Option<Document>> {
        self.log_op("findOneAndReplace", collection);
        self.store
            .find_one_and_replace(
                collection,
                filter,
                replacement,
                options.into(),
                self.session.as_mut(),
            )
            .await
    }

    /// Atomically find and update a document.
    pub async fn find_one_and_update(
        &mut self,
        collection: &str,
        filter: Document,
        update: impl Into<UpdateModifications>,
        options: impl Into<Option<FindOneAndUpdateOptions>>,
    ) -> MongoResult<Option<Document>> {
        self.log_op("findOneAndUpdate", collection);
        self.store
            .find_one_and_update(
                collection,
                filter,
                update.into(),
                options.into(),
                self.session.as_mut(),
            )
            .await
    }

    /// Run a `geoSearch` command around `(x, y)`.
    pub async fn geo_haystack_search(
        &mut self,
        collection: &str,
        x: f64,
        y: f64,
        options: GeoSearchOptions,
    ) -> MongoResult<Document> {
        self.log_op("geoSearch", collection);
        let command = options.to_command(collection, x, y);
        self.store
            .run_command(None, command, self.session.as_mut())
            .await
    }

    /// Run a legacy `group` command.
    pub async fn group(&mut self, collection: &str, spec: GroupSpec) -> MongoResult<Document> {
        self.log_op("group", collection);
        let command = spec.to_command(collection);
        self.store
            .run_command(None, command, self.session.as_mut())
            .await
    }

    /// Insert one document.
    pub async fn insert_one(
        &mut self,
        collection: &str,
        document: Document,
        options: impl Into<Option<InsertOneOptions>>,
    ) -> MongoResult<InsertOneResult> {
        self.log_op("insertOne", collection);
        self.store
            .insert_one(collection, document, options.into(), self.session.as_mut())
            .await
    }

    /// Insert several documents.
    pub async fn insert_many(
        &mut self,
        collection: &str,
        documents: Vec<Document>,
        options: impl Into<Option<InsertManyOptions>>,
    ) -> MongoResult<InsertManyResult> {
        self.log_op("insertMany", collection);
        self.store
            .insert_many(collection, documents, options.into(), self.session.as_mut())
            .await
    }

    /// Check whether a collection is capped.
    pub async fn is_capped(&mut self, collection: &str) -> MongoResult<bool> {
        self.log_op("collStats", collection);
        let stats = self
            .store
            .run_command(
                None,
                commands::coll_stats(collection, None),
                self.session.as_mut(),
            )
            .await?;
        Ok(stats.get_bool("capped").unwrap_or(false))
    }

    /// Run a `mapReduce` command.
    pub async fn map_reduce(
        &mut self,
        collection: &str,
        map: &str,
        reduce: &str,
        options: MapReduceOptions,
    ) -> MongoResult<Document> {
        self.log_op("mapReduce", collection);
        let command = options.to_command(collection, map, reduce);
        self.store
            .run_command(None, command, self.session.as_mut())
            .await
    }

    /// Run a `parallelCollectionScan` command.
    pub async fn parallel_collection_scan(
        &mut self,
        collection: &str,
        num_cursors: u32,
    ) -> MongoResult<Document> {
        self.log_op("parallelCollectionScan", collection);
        let command = commands::parallel_collection_scan(collection, num_cursors);
        self.store
            .run_command(None, command, self.session.as_mut())
            .await
    }

    /// Rebuild every index of a collection.
    pub async fn re_index(&mut self, collection: &str) -> MongoResult<Document> {
        self.log_op("reIndex", collection);
        self.store
            .run_command(None, commands::re_index(collection), self.session.as_mut())
            .await
    }

    /// Rename a collection within the runner's database.
    pub async fn rename(
        &mut self,
        collection: &str,
        new_name: &str,
        drop_target: bool,
    ) -> MongoResult<Document> {
        self.log_op("renameCollection", collection);
        let command = commands::rename_collection(
            self.store.database_name(),
            collection,
            new_name,
            drop_target,
        );
        self.store
            .run_command(Some(ADMIN_DATABASE), command, self.session.as_mut())
            .await
    }

    /// Replace the first document matching `filter`.
    pub async fn replace_one(
        &mut self,
        collection: &str,
        filter: Document,
        replacement: Document,
        options: impl Into<Option<ReplaceOptions>>,
    ) -> MongoResult<UpdateResult> {
        self.log_op("replaceOne", collection);
        self.store
            .replace_one(
                collection,
                filter,
                replacement,
                options.into(),
                self.session.as_mut(),
            )
            .await
    }

    /// Collection statistics, optionally scaled.
    pub async fn stats(&mut self, collection: &str, scale: Option<i64>) -> MongoResult<Document> {
        self.log_op("collStats", collection);
        self.store
            .run_command(
                None,
                commands::coll_stats(collection, scale),
                self.session.as_mut(),
            )
            .await
    }

    /// Open a change stream on a collection.
    ///
    /// The stream is opened outside the runner's session and outlives it.
    pub async fn watch(
        &mut self,
        collection: &str,
        pipeline: Vec<Document>,
        options: impl Into<Option<ChangeStreamOptions>>,
    ) -> MongoResult<ChangeEventStream> {
        self.log_op("watch", collection);
        self.store
            .watch(collection, pipeline, options.into())
            .await
    }

    /// Update the first document matching `filter`.
    pub async fn update_one(
        &mut self,
        collection: &str,
        filter: Document,
        update: impl Into<UpdateModifications>,
        options: impl Into<Option<UpdateOptions>>,
    ) -> MongoResult<UpdateResult> {
        self.log_op("updateOne", collection);
        self.store
            .update_one(
                collection,
                filter,
                update.into(),
                options.into(),
                self.session.as_mut(),
            )
            .await
    }

    /// Update every document matching `filter`.
    pub async fn update_many(
        &mut self,
        collection: &str,
        filter: Document,
        update: impl Into<UpdateModifications>,
        options: impl Into<Option<UpdateOptions>>,
    ) -> MongoResult<UpdateResult> {
        self.log_op("updateMany", collection);
        self.store
            .update_many(
                collection,
                filter,
                update.into(),
                options.into(),
                self.session.as_mut(),
            )
            .await
    }
}

fn update_options(upsert: Option<bool>) -> Option<UpdateOptions> {
    upsert.map(|upsert| UpdateOptions::builder().upsert(upsert).build())
}

/// Name the server gives an index created without one, e.g. `email_1_age_-1`.
fn generated_index_name(keys: &Document) -> String {
    keys.iter()
        .map(|(field, direction)| match direction {
            Bson::String(kind) => format!("{}_{}", field, kind),
            other => format!("{}_{}", field, other),
        })
        .collect::<Vec<_>>()
        .join("_")
}
