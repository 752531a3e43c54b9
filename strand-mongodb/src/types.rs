//! Result and request types for query runner operations.
//!
//! The driver's own result types cannot be constructed outside the driver, so
//! the store boundary reports through the plain structs defined here.

use std::collections::BTreeMap;

use bson::{Bson, Document, doc};
use mongodb::options::UpdateModifications;
use serde::{Deserialize, Serialize};

/// Result of inserting one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertOneResult {
    /// `_id` of the inserted document.
    pub inserted_id: Bson,
}

impl From<mongodb::results::InsertOneResult> for InsertOneResult {
    fn from(result: mongodb::results::InsertOneResult) -> Self {
        Self {
            inserted_id: result.inserted_id,
        }
    }
}

/// Result of inserting several documents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InsertManyResult {
    /// `_id` of each inserted document, keyed by its input position.
    pub inserted_ids: BTreeMap<usize, Bson>,
}

impl From<mongodb::results::InsertManyResult> for InsertManyResult {
    fn from(result: mongodb::results::InsertManyResult) -> Self {
        Self {
            inserted_ids: result.inserted_ids.into_iter().collect(),
        }
    }
}

/// Result of an update or replace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateResult {
    /// Documents matched by the filter.
    pub matched_count: u64,
    /// Documents actually modified.
    pub modified_count: u64,
    /// `_id` of the upserted document, if any.
    pub upserted_id: Option<Bson>,
}

impl From<mongodb::results::UpdateResult> for UpdateResult {
    fn from(result: mongodb::results::UpdateResult) -> Self {
        Self {
            matched_count: result.matched_count,
            modified_count: result.modified_count,
            upserted_id: result.upserted_id,
        }
    }
}

/// Result of a delete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteResult {
    /// Documents deleted.
    pub deleted_count: u64,
}

impl From<mongodb::results::DeleteResult> for DeleteResult {
    fn from(result: mongodb::results::DeleteResult) -> Self {
        Self {
            deleted_count: result.deleted_count,
        }
    }
}

/// One write of a bulk write batch.
#[derive(Debug, Clone)]
pub enum BulkWriteOperation {
    /// Insert a document.
    InsertOne {
        /// Document to insert.
        document: Document,
    },
    /// Update the first matching document.
    UpdateOne {
        /// Filter.
        filter: Document,
        /// Update document or pipeline.
        update: UpdateModifications,
        /// Insert when nothing matches.
        upsert: Option<bool>,
    },
    /// Update every matching document.
    UpdateMany {
        /// Filter.
        filter: Document,
        /// Update document or pipeline.
        update: UpdateModifications,
        /// Insert when nothing matches.
        upsert: Option<bool>,
    },
    /// Replace the first matching document.
    ReplaceOne {
        /// Filter.
        filter: Document,
        /// Replacement document.
        replacement: Document,
        /// Insert when nothing matches.
        upsert: Option<bool>,
    },
    /// Delete the first matching document.
    DeleteOne {
        /// Filter.
        filter: Document,
    },
    /// Delete every matching document.
    DeleteMany {
        /// Filter.
        filter: Document,
    },
}

impl BulkWriteOperation {
    /// Insert a document.
    pub fn insert_one(document: Document) -> Self {
        Self::InsertOne { document }
    }

    /// Update the first matching document.
    pub fn update_one(filter: Document, update: impl Into<UpdateModifications>) -> Self {
        Self::UpdateOne {
            filter,
            update: update.into(),
            upsert: None,
        }
    }

    /// Update every matching document.
    pub fn update_many(filter: Document, update: impl Into<UpdateModifications>) -> Self {
        Self::UpdateMany {
            filter,
            update: update.into(),
            upsert: None,
        }
    }

    /// Replace the first matching document.
    pub fn replace_one(filter: Document, replacement: Document) -> Self {
        Self::ReplaceOne {
            filter,
            replacement,
            upsert: None,
        }
    }

    /// Delete the first matching document.
    pub fn delete_one(filter: Document) -> Self {
        Self::DeleteOne { filter }
    }

    /// Delete every matching document.
    pub fn delete_many(filter: Document) -> Self {
        Self::DeleteMany { filter }
    }

    /// Set the upsert flag. Ignored by inserts and deletes.
    pub fn upsert(mut self, enabled: bool) -> Self {
        match &mut self {
            Self::UpdateOne { upsert, .. }
            | Self::UpdateMany { upsert, .. }
            | Self::ReplaceOne { upsert, .. } => *upsert = Some(enabled),
            Self::InsertOne { .. } | Self::DeleteOne { .. } | Self::DeleteMany { .. } => {}
        }
        self
    }

    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InsertOne { .. } => "insertOne",
            Self::UpdateOne { .. } => "updateOne",
            Self::UpdateMany { .. } => "updateMany",
            Self::ReplaceOne { .. } => "replaceOne",
            Self::DeleteOne { .. } => "deleteOne",
            Self::DeleteMany { .. } => "deleteMany",
        }
    }
}

/// Options for a bulk write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulkWriteOptions {
    /// Stop at the first failing operation.
    pub ordered: bool,
}

impl Default for BulkWriteOptions {
    fn default() -> Self {
        Self { ordered: true }
    }
}

impl BulkWriteOptions {
    /// Attempt every operation even after a failure.
    pub fn unordered() -> Self {
        Self { ordered: false }
    }
}

/// Summary of a bulk write.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkWriteResult {
    /// Documents inserted.
    pub inserted_count: u64,
    /// Documents matched by updates and replaces.
    pub matched_count: u64,
    /// Documents modified by updates and replaces.
    pub modified_count: u64,
    /// Documents deleted.
    pub deleted_count: u64,
    /// Documents upserted.
    pub upserted_count: u64,
    /// Inserted `_id`s keyed by operation position.
    pub inserted_ids: BTreeMap<usize, Bson>,
    /// Upserted `_id`s keyed by operation position.
    pub upserted_ids: BTreeMap<usize, Bson>,
}

impl BulkWriteResult {
    pub(crate) fn record_insert(&mut self, index: usize, result: InsertOneResult) {
        self.inserted_count += 1;
        self.inserted_ids.insert(index, result.inserted_id);
    }

    pub(crate) fn record_update(&mut self, index: usize, result: UpdateResult) {
        self.matched_count += result.matched_count;
        self.modified_count += result.modified_count;
        if let Some(id) = result.upserted_id {
            self.upserted_count += 1;
            self.upserted_ids.insert(index, id);
        }
    }

    pub(crate) fn record_delete(&mut self, result: DeleteResult) {
        self.deleted_count += result.deleted_count;
    }
}

/// Parameters of the legacy `group` command.
#[derive(Debug, Clone, Default)]
pub struct GroupSpec {
    /// Fields to group by.
    pub key: Document,
    /// JavaScript reduce function.
    pub reduce: String,
    /// Initial aggregation document.
    pub initial: Document,
    /// Filter applied before grouping.
    pub cond: Option<Document>,
    /// JavaScript finalize function.
    pub finalize: Option<String>,
}

impl GroupSpec {
    /// Create a group specification.
    pub fn new(key: Document, reduce: impl Into<String>, initial: Document) -> Self {
        Self {
            key,
            reduce: reduce.into(),
            initial,
            cond: None,
            finalize: None,
        }
    }

    /// Set the filter.
    pub fn cond(mut self, cond: Document) -> Self {
        self.cond = Some(cond);
        self
    }

    /// Set the finalize function.
    pub fn finalize(mut self, finalize: impl Into<String>) -> Self {
        self.finalize = Some(finalize.into());
        self
    }

    /// Build the command for `collection`.
    pub fn to_command(&self, collection: &str) -> Document {
        let mut group = doc! {
            "ns": collection,
            "key": self.key.clone(),
            "$reduce": Bson::JavaScriptCode(self.reduce.clone()),
            "initial": self.initial.clone(),
        };
        if let Some(ref cond) = self.cond {
            group.insert("cond", cond.clone());
        }
        if let Some(ref finalize) = self.finalize {
            group.insert("finalize", Bson::JavaScriptCode(finalize.clone()));
        }
        doc! { "group": group }
    }
}

/// Options for the `geoSearch` command.
#[derive(Debug, Clone, Default)]
pub struct GeoSearchOptions {
    /// Additional equality filter.
    pub search: Document,
    /// Maximum distance from the point.
    pub max_distance: Option<f64>,
    /// Maximum number of documents.
    pub limit: Option<i64>,
}

impl GeoSearchOptions {
    /// Build the command for `collection` around `(x, y)`.
    pub fn to_command(&self, collection: &str, x: f64, y: f64) -> Document {
        let mut command = doc! {
            "geoSearch": collection,
            "near": [x, y],
            "search": self.search.clone(),
        };
        if let Some(distance) = self.max_distance {
            command.insert("maxDistance", distance);
        }
        if let Some(limit) = self.limit {
            command.insert("limit", limit);
        }
        command
    }
}

/// Options for the `mapReduce` command.
#[derive(Debug, Clone)]
pub struct MapReduceOptions {
    /// Output target, inline by default.
    pub out: Bson,
    /// Filter applied to the input.
    pub query: Option<Document>,
    /// Sort applied to the input.
    pub sort: Option<Document>,
    /// Maximum number of input documents.
    pub limit: Option<i64>,
    /// JavaScript finalize function.
    pub finalize: Option<String>,
    /// Global variables visible to the functions.
    pub scope: Option<Document>,
}

impl Default for MapReduceOptions {
    fn default() -> Self {
        Self {
            out: Bson::Document(doc! { "inline": 1 }),
            query: None,
            sort: None,
            limit: None,
            finalize: None,
            scope: None,
        }
    }
}

impl MapReduceOptions {
    /// Write results into a collection instead of returning them inline.
    pub fn out_collection(mut self, name: impl Into<String>) -> Self {
        self.out = Bson::String(name.into());
        self
    }

    /// Set the input filter.
    pub fn query(mut self, query: Document) -> Self {
        self.query = Some(query);
        self
    }

    /// Build the command for `collection`.
    pub fn to_command(&self, collection: &str, map: &str, reduce: &str) -> Document {
        let mut command = doc! {
            "mapReduce": collection,
            "map": Bson::JavaScriptCode(map.to_string()),
            "reduce": Bson::JavaScriptCode(reduce.to_string()),
            "out": self.out.clone(),
        };
        if let Some(ref query) = self.query {
            command.insert("query", query.clone());
        }
        if let Some(ref sort) = self.sort {
            command.insert("sort", sort.clone());
        }
        if let Some(limit) = self.limit {
            command.insert("limit", limit);
        }
        if let Some(ref finalize) = self.finalize {
            command.insert("finalize", Bson::JavaScriptCode(finalize.clone()));
        }
        if let Some(ref scope) = self.scope {
            command.insert("scope", scope.clone());
        }
        command
    }
}

/// Raw database commands issued by query runner operations.
pub mod commands {
    use bson::{Document, doc};

    /// `collStats`, optionally scaled.
    pub fn coll_stats(collection: &str, scale: Option<i64>) -> Document {
        let mut command = doc! { "collStats": collection };
        if let Some(scale) = scale {
            command.insert("scale", scale);
        }
        command
    }

    /// `parallelCollectionScan`.
    pub fn parallel_collection_scan(collection: &str, num_cursors: u32) -> Document {
        doc! { "parallelCollectionScan": collection, "numCursors": num_cursors as i32 }
    }

    /// `reIndex`.
    pub fn re_index(collection: &str) -> Document {
        doc! { "reIndex": collection }
    }

    /// `renameCollection` within `database`; run against `admin`.
    pub fn rename_collection(
        database: &str,
        collection: &str,
        new_name: &str,
        drop_target: bool,
    ) -> Document {
        doc! {
            "renameCollection": format!("{}.{}", database, collection),
            "to": format!("{}.{}", database, new_name),
            "dropTarget": drop_target,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_bulk_operation_upsert() {
        let op = BulkWriteOperation::update_one(doc! { "a": 1 }, doc! { "$set": { "b": 2 } })
            .upsert(true);
        assert!(matches!(op, BulkWriteOperation::UpdateOne { upsert: Some(true), .. }));
        assert_eq!(op.kind(), "updateOne");

        let op = BulkWriteOperation::delete_one(doc! {}).upsert(true);
        assert!(matches!(op, BulkWriteOperation::DeleteOne { .. }));
    }

    #[test]
    fn test_bulk_write_options_default_ordered() {
        assert!(BulkWriteOptions::default().ordered);
        assert!(!BulkWriteOptions::unordered().ordered);
    }

    #[test]
    fn test_bulk_write_result_accumulates() {
        let mut result = BulkWriteResult::default();
        result.record_insert(0, InsertOneResult { inserted_id: Bson::Int32(1) });
        result.record_update(
            1,
            UpdateResult {
                matched_count: 0,
                modified_count: 0,
                upserted_id: Some(Bson::Int32(7)),
            },
        );
        result.record_update(
            2,
            UpdateResult {
                matched_count: 3,
                modified_count: 2,
                upserted_id: None,
            },
        );
        result.record_delete(DeleteResult { deleted_count: 4 });

        assert_eq!(result.inserted_count, 1);
        assert_eq!(result.matched_count, 3);
        assert_eq!(result.modified_count, 2);
        assert_eq!(result.upserted_count, 1);
        assert_eq!(result.deleted_count, 4);
        assert_eq!(result.upserted_ids.get(&1), Some(&Bson::Int32(7)));
    }

    #[test]
    fn test_group_command() {
        let spec = GroupSpec::new(doc! { "dept": 1 }, "function(c, r) { r.n++; }", doc! { "n": 0 })
            .cond(doc! { "active": true });
        let command = spec.to_command("employees");
        let group = command.get_document("group").unwrap();

        assert_eq!(group.get_str("ns").unwrap(), "employees");
        assert!(matches!(group.get("$reduce"), Some(Bson::JavaScriptCode(_))));
        assert_eq!(group.get_document("cond").unwrap(), &doc! { "active": true });
        assert!(group.get("finalize").is_none());
    }

    #[test]
    fn test_geo_search_command() {
        let options = GeoSearchOptions {
            search: doc! { "type": "restaurant" },
            max_distance: Some(6.0),
            limit: None,
        };
        let command = options.to_command("places", 1.5, 2.5);

        assert_eq!(command.get_str("geoSearch").unwrap(), "places");
        assert_eq!(
            command.get_array("near").unwrap(),
            &vec![Bson::Double(1.5), Bson::Double(2.5)]
        );
        assert_eq!(command.get_f64("maxDistance").unwrap(), 6.0);
        assert!(command.get("limit").is_none());
    }

    #[test]
    fn test_map_reduce_defaults_to_inline() {
        let command = MapReduceOptions::default().to_command("orders", "m", "r");
        assert_eq!(command.get_document("out").unwrap(), &doc! { "inline": 1 });

        let command = MapReduceOptions::default()
            .out_collection("totals")
            .query(doc! { "status": "A" })
            .to_command("orders", "m", "r");
        assert_eq!(command.get_str("out").unwrap(), "totals");
        assert_eq!(command.get_document("query").unwrap(), &doc! { "status": "A" });
    }

    #[test]
    fn test_rename_command() {
        let command = commands::rename_collection("shop", "orders", "archive", false);
        assert_eq!(
            command,
            doc! {
                "renameCollection": "shop.orders",
                "to": "shop.archive",
                "dropTarget": false,
            }
        );
    }

    #[test]
    fn test_coll_stats_command() {
        assert_eq!(commands::coll_stats("logs", None), doc! { "collStats": "logs" });
        assert_eq!(
            commands::coll_stats("logs", Some(1024)),
            doc! { "collStats": "logs", "scale": 1024_i64 }
        );
    }
}
