use std::future::IntoFuture;
use std::time::Duration;

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, Bson, Document};
use mongodb::error::ErrorKind;
use mongodb::options::{ClientOptions, CountOptions, FindOptions, ReplaceOptions, UpdateOptions};
use serde_json::Value;

use crate::db::collection::{RecordCollection, SiteDocument, SITE_DATA};
use crate::db::models::{Record, ID_FIELD};
use crate::db::query::{Filter, FilterOp, Page, PageRequest, Query, SortDirection};
use crate::db::repository::DocumentBackend;
use crate::error::StoreError;

const MONGO_ID: &str = "_id";

/// MongoDB implementation of the DocumentBackend.
///
/// Records live in one MongoDB collection per `RecordCollection`, keyed by
/// their string `id` field. `site-data` holds two documents with ids `menu`
/// and `settings`. Every call is bounded by the configured timeout.
pub struct MongoStore {
    db: mongodb::Database,
    timeout: Duration,
}

impl MongoStore {
    pub fn new(db: &mongodb::Database, timeout: Duration) -> Self {
        Self {
            db: db.clone(),
            timeout,
        }
    }

    /// Connect and ping the server once; any failure means the remote
    /// backend is unavailable for this process.
    pub async fn connect(uri: &str, database: &str, timeout: Duration) -> Result<Self, StoreError> {
        let mut options = ClientOptions::parse(uri)
            .await
            .map_err(|e| StoreError::StorageUnavailable(format!("Invalid MongoDB URI: {}", e)))?;
        options.server_selection_timeout = Some(timeout);
        options.connect_timeout = Some(timeout);

        let client = mongodb::Client::with_options(options)
            .map_err(|e| StoreError::StorageUnavailable(e.to_string()))?;
        let db = client.database(database);

        match tokio::time::timeout(timeout, db.run_command(doc! { "ping": 1 }).into_future()).await {
            Ok(Ok(_)) => Ok(Self::new(&db, timeout)),
            Ok(Err(e)) => Err(StoreError::StorageUnavailable(format!(
                "MongoDB ping failed: {}",
                e
            ))),
            Err(_) => Err(StoreError::StorageUnavailable(format!(
                "MongoDB ping timed out after {:?}",
                timeout
            ))),
        }
    }

    fn collection(&self, collection: RecordCollection) -> mongodb::Collection<Document> {
        self.db.collection(collection.as_str())
    }

    fn site_collection(&self) -> mongodb::Collection<Document> {
        self.db.collection(SITE_DATA)
    }

    async fn timed<T, F>(&self, op: &str, fut: F) -> Result<T, StoreError>
    where
        F: IntoFuture<Output = mongodb::error::Result<T>>,
    {
        match tokio::time::timeout(self.timeout, fut.into_future()).await {
            Ok(result) => result.map_err(|e| map_mongo_error(op, e)),
            Err(_) => Err(StoreError::StorageUnavailable(format!(
                "{} timed out after {:?}",
                op, self.timeout
            ))),
        }
    }

    async fn find_documents(
        &self,
        collection: RecordCollection,
        filter: Document,
        options: FindOptions,
    ) -> Result<Vec<Record>, StoreError> {
        let coll = self.collection(collection);
        let documents: Vec<Document> = self
            .timed("find", async {
                let cursor = coll.find(filter).with_options(options).await?;
                cursor.try_collect().await
            })
            .await?;
        Ok(documents.into_iter().filter_map(to_record).collect())
    }
}

fn map_mongo_error(op: &str, err: mongodb::error::Error) -> StoreError {
    match err.kind.as_ref() {
        ErrorKind::ServerSelection { .. } => {
            StoreError::StorageUnavailable(format!("{}: {}", op, err))
        }
        _ => StoreError::PersistenceFailure(format!("{}: {}", op, err)),
    }
}

fn to_bson(value: &Value) -> Result<Bson, StoreError> {
    mongodb::bson::to_bson(value)
        .map_err(|e| StoreError::InvalidArgument(format!("Value not storable: {}", e)))
}

fn to_document(record: &Record) -> Result<Document, StoreError> {
    mongodb::bson::to_document(record)
        .map_err(|e| StoreError::InvalidArgument(format!("Record not storable: {}", e)))
}

/// Convert a stored document back to a record, dropping the Mongo `_id`.
fn to_record(mut document: Document) -> Option<Record> {
    document.remove(MONGO_ID);
    match Bson::Document(document).into_relaxed_extjson() {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

/// Ids are strings, but legacy imports may carry numeric ids.
fn id_filter(id: &str) -> Document {
    match id.parse::<i64>() {
        Ok(numeric) if numeric.to_string() == id => {
            doc! { "$or": [ { ID_FIELD: id }, { ID_FIELD: numeric } ] }
        }
        _ => doc! { ID_FIELD: id },
    }
}

/// String and integer forms of an id value, matching how local files compare ids.
fn id_forms(value: &Value) -> Result<Vec<Bson>, StoreError> {
    let forms = match value {
        Value::String(s) => match s.parse::<i64>() {
            Ok(numeric) if numeric.to_string() == *s => {
                vec![Bson::String(s.clone()), Bson::Int64(numeric)]
            }
            _ => vec![Bson::String(s.clone())],
        },
        Value::Number(n) => match n.as_i64() {
            Some(numeric) => vec![Bson::Int64(numeric), Bson::String(numeric.to_string())],
            None => vec![to_bson(value)?],
        },
        other => vec![to_bson(other)?],
    };
    Ok(forms)
}

/// `$in` / `$nin` over every form of the filtered ids.
fn id_clause(filter: &Filter) -> Result<Document, StoreError> {
    let candidates = match (filter.op, &filter.value) {
        (FilterOp::In, Value::Array(values)) => values
            .iter()
            .map(id_forms)
            .collect::<Result<Vec<_>, _>>()?
            .concat(),
        (FilterOp::In, _) => Vec::new(),
        (_, value) => id_forms(value)?,
    };
    let operator = match filter.op {
        FilterOp::Ne => "$nin",
        _ => "$in",
    };
    let mut condition = Document::new();
    condition.insert(operator, candidates);
    Ok(doc! { ID_FIELD: condition })
}

fn filter_clause(filter: &Filter) -> Result<Document, StoreError> {
    if filter.field == ID_FIELD && filter.op != FilterOp::Contains {
        return id_clause(filter);
    }
    let value = to_bson(&filter.value)?;
    let condition = match filter.op {
        FilterOp::Eq => value,
        FilterOp::Ne => Bson::Document(doc! { "$ne": value }),
        FilterOp::In => Bson::Document(doc! { "$in": value }),
        FilterOp::Contains => Bson::Document(doc! { "$elemMatch": { "$eq": value } }),
    };
    let mut clause = Document::new();
    clause.insert(filter.field.clone(), condition);
    Ok(clause)
}

/// Translate query filters into a native MongoDB filter (logical AND).
fn to_filter(query: &Query) -> Result<Document, StoreError> {
    let mut clauses = query
        .filters
        .iter()
        .map(filter_clause)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(match clauses.len() {
        0 => Document::new(),
        1 => clauses.remove(0),
        _ => doc! { "$and": clauses },
    })
}

fn to_sort(query: &Query) -> Option<Document> {
    query.sort.as_ref().map(|sort| {
        let direction = match sort.direction {
            SortDirection::Asc => 1,
            SortDirection::Desc => -1,
        };
        let mut document = Document::new();
        document.insert(sort.field.clone(), direction);
        document
    })
}

/// Saturating conversion to a MongoDB limit.
fn to_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

/// Find options for a query, or `None` when its cap admits no records.
/// MongoDB reads a limit of 0 as "no limit".
fn find_options(query: &Query) -> Option<FindOptions> {
    let mut options = FindOptions::default();
    options.sort = to_sort(query);
    match query.limit {
        Some(0) => return None,
        Some(limit) => options.limit = Some(to_limit(limit)),
        None => {}
    }
    Some(options)
}

fn strip_id(mut record: Record) -> Record {
    record.remove(ID_FIELD);
    record
}

#[async_trait]
impl DocumentBackend for MongoStore {
    fn name(&self) -> &'static str {
        "mongodb"
    }

    async fn find(
        &self,
        collection: RecordCollection,
        query: &Query,
    ) -> Result<Vec<Record>, StoreError> {
        let filter = to_filter(query)?;
        let Some(options) = find_options(query) else {
            return Ok(Vec::new());
        };

        self.find_documents(collection, filter, options).await
    }

    async fn find_page(
        &self,
        collection: RecordCollection,
        query: &Query,
        page: PageRequest,
    ) -> Result<Page, StoreError> {
        let filter = to_filter(query)?;
        let coll = self.collection(collection);
        let total = self
            .timed(
                "count_documents",
                coll.count_documents(filter.clone())
                    .with_options(CountOptions::default()),
            )
            .await?;

        let mut options = FindOptions::default();
        options.sort = to_sort(query);
        options.skip = Some(u64::try_from(page.offset()).unwrap_or(u64::MAX));
        options.limit = Some(to_limit(page.page_size));
        let records = self.find_documents(collection, filter, options).await?;

        Ok(page.page(records, total as usize))
    }

    async fn find_by_id(
        &self,
        collection: RecordCollection,
        id: &str,
    ) -> Result<Option<Record>, StoreError> {
        let coll = self.collection(collection);
        let found = self.timed("find_one", coll.find_one(id_filter(id))).await?;
        Ok(found.and_then(to_record))
    }

    async fn insert(&self, collection: RecordCollection, record: Record) -> Result<(), StoreError> {
        let document = to_document(&record)?;
        let coll = self.collection(collection);
        self.timed("insert_one", coll.insert_one(document)).await?;
        Ok(())
    }

    async fn merge(
        &self,
        collection: RecordCollection,
        id: &str,
        partial: Record,
    ) -> Result<bool, StoreError> {
        let coll = self.collection(collection);
        let partial = strip_id(partial);
        if partial.is_empty() {
            let count = self
                .timed("count_documents", coll.count_documents(id_filter(id)))
                .await?;
            return Ok(count > 0);
        }

        let update = doc! { "$set": to_document(&partial)? };
        let result = self
            .timed("update_one", coll.update_one(id_filter(id), update))
            .await?;
        Ok(result.matched_count > 0)
    }

    async fn replace(
        &self,
        collection: RecordCollection,
        id: &str,
        record: Record,
    ) -> Result<(), StoreError> {
        let document = to_document(&record)?;
        let options = ReplaceOptions::builder().upsert(true).build();
        let coll = self.collection(collection);
        self.timed(
            "replace_one",
            coll.replace_one(id_filter(id), document).with_options(options),
        )
        .await?;
        Ok(())
    }

    async fn remove(&self, collection: RecordCollection, id: &str) -> Result<bool, StoreError> {
        let coll = self.collection(collection);
        let result = self
            .timed("delete_one", coll.delete_one(id_filter(id)))
            .await?;
        Ok(result.deleted_count > 0)
    }

    async fn load_site_document(
        &self,
        document: SiteDocument,
    ) -> Result<Option<Record>, StoreError> {
        let coll = self.site_collection();
        let found = self
            .timed("find_one", coll.find_one(doc! { ID_FIELD: document.key() }))
            .await?;
        Ok(found.and_then(to_record).map(strip_id))
    }

    async fn merge_site_document(
        &self,
        document: SiteDocument,
        partial: Record,
    ) -> Result<(), StoreError> {
        let mut set = to_document(&strip_id(partial))?;
        set.insert(ID_FIELD, document.key());
        let options = UpdateOptions::builder().upsert(true).build();
        let coll = self.site_collection();
        self.timed(
            "update_one",
            coll.update_one(doc! { ID_FIELD: document.key() }, doc! { "$set": set })
                .with_options(options),
        )
        .await?;
        Ok(())
    }

    async fn replace_site_document(
        &self,
        document: SiteDocument,
        content: Record,
    ) -> Result<(), StoreError> {
        let mut replacement = to_document(&strip_id(content))?;
        replacement.insert(ID_FIELD, document.key());
        let options = ReplaceOptions::builder().upsert(true).build();
        let coll = self.site_collection();
        self.timed(
            "replace_one",
            coll.replace_one(doc! { ID_FIELD: document.key() }, replacement)
                .with_options(options),
        )
        .await?;
        Ok(())
    }
}
