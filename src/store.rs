use futures::future::BoxFuture;
use serde_json::Value;

use crate::backend::{BackendMode, StorageBackend};
use crate::db::collection::{Collection, IntoCollection, SiteDocument, SITE_DATA};
use crate::db::models::{Record, ID_FIELD};
use crate::db::query::{Page, PageRequest, Query};
use crate::db::repository::DocumentBackend;
use crate::error::StoreError;

/// Generate a fresh record id (random UUID v4).
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// The document store accessor.
///
/// Reads never fail: errors are logged and turned into empty results (after
/// one attempt against the read fallback, if configured). Writes only ever
/// go to the primary backend and propagate every failure.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    backend: StorageBackend,
}

impl DocumentStore {
    pub fn new(backend: StorageBackend) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &StorageBackend {
        &self.backend
    }

    pub fn mode(&self) -> BackendMode {
        self.backend.mode()
    }

    /// Load records from a collection, filtered, sorted and capped by `query`.
    ///
    /// Unknown collections and storage failures yield an empty vector.
    pub async fn get_many(&self, collection: impl IntoCollection, query: &Query) -> Vec<Record> {
        let collection = match collection.into_collection() {
            Ok(collection) => collection,
            Err(e) => {
                tracing::warn!("get_many: {}", e);
                return Vec::new();
            }
        };

        match collection {
            Collection::Records(records) => {
                self.read_or_degrade("get_many", collection.as_str(), Vec::new(), |backend| {
                    backend.find(records, query)
                })
                .await
            }
            Collection::SiteData => query.apply(self.site_records().await),
        }
    }

    /// Find a record by id. Missing ids and failures yield `None`.
    ///
    /// For `site-data`, `menu` always yields `{ "data": [...] }` (empty when
    /// nothing is stored) and `settings` yields the settings object.
    pub async fn get_one(&self, collection: impl IntoCollection, id: &str) -> Option<Record> {
        let collection = match collection.into_collection() {
            Ok(collection) => collection,
            Err(e) => {
                tracing::warn!("get_one: {}", e);
                return None;
            }
        };

        match collection {
            Collection::Records(records) => {
                self.read_or_degrade("get_one", collection.as_str(), None, |backend| {
                    backend.find_by_id(records, id)
                })
                .await
            }
            Collection::SiteData => {
                let document = SiteDocument::from_key(id)?;
                let loaded = self
                    .read_or_degrade("get_one", SITE_DATA, None, |backend| {
                        backend.load_site_document(document)
                    })
                    .await;
                match document {
                    SiteDocument::Menu => Some(menu_record(loaded)),
                    SiteDocument::Settings => loaded,
                }
            }
        }
    }

    /// Append a record under a freshly generated id and return that id.
    ///
    /// Any `id` in `data` is replaced.
    pub async fn add_one(
        &self,
        collection: impl IntoCollection,
        data: Record,
    ) -> Result<String, StoreError> {
        let collection = collection.into_collection()?;
        let Collection::Records(records) = collection else {
            return Err(fixed_site_data("add_one"));
        };

        let id = generate_id();
        let mut record = data;
        record.insert(ID_FIELD.to_string(), Value::String(id.clone()));

        self.write_or_fail("add_one", collection.as_str(), |backend| {
            backend.insert(records, record)
        })
        .await?;
        Ok(id)
    }

    /// Shallow-merge `partial` into the record with that id.
    ///
    /// Fails with `RecordNotFound` when no such record exists. For
    /// `site-data` the document is created if absent.
    pub async fn update_one(
        &self,
        collection: impl IntoCollection,
        id: &str,
        partial: Record,
    ) -> Result<(), StoreError> {
        let collection = collection.into_collection()?;
        match collection {
            Collection::Records(records) => {
                let found = self
                    .write_or_fail("update_one", collection.as_str(), |backend| {
                        backend.merge(records, id, partial)
                    })
                    .await?;
                if !found {
                    tracing::warn!("update_one: no record '{}' in '{}'", id, collection);
                    return Err(StoreError::not_found(collection.as_str(), id));
                }
                Ok(())
            }
            Collection::SiteData => {
                let document = site_document(id)?;
                self.write_or_fail("update_one", SITE_DATA, |backend| {
                    backend.merge_site_document(document, partial)
                })
                .await
            }
        }
    }

    /// Store `data` under an explicit id, replacing any existing record.
    pub async fn set_one(
        &self,
        collection: impl IntoCollection,
        id: &str,
        data: Record,
    ) -> Result<(), StoreError> {
        let collection = collection.into_collection()?;
        if id.trim().is_empty() {
            return Err(StoreError::InvalidArgument("Record id cannot be empty".into()));
        }

        match collection {
            Collection::Records(records) => {
                let mut record = data;
                record.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
                self.write_or_fail("set_one", collection.as_str(), |backend| {
                    backend.replace(records, id, record)
                })
                .await
            }
            Collection::SiteData => {
                let document = site_document(id)?;
                self.write_or_fail("set_one", SITE_DATA, |backend| {
                    backend.replace_site_document(document, data)
                })
                .await
            }
        }
    }

    /// Remove the record with that id. Returns whether a removal occurred.
    pub async fn delete_one(
        &self,
        collection: impl IntoCollection,
        id: &str,
    ) -> Result<bool, StoreError> {
        let collection = collection.into_collection()?;
        let Collection::Records(records) = collection else {
            return Err(fixed_site_data("delete_one"));
        };

        self.write_or_fail("delete_one", collection.as_str(), |backend| {
            backend.remove(records, id)
        })
        .await
    }

    /// Whether a `site-data` document is stored, according to the primary
    /// backend alone. Unlike reads, failures propagate and never count as
    /// absent. An empty menu is still a stored menu.
    pub async fn site_document_exists(&self, document: SiteDocument) -> Result<bool, StoreError> {
        let primary = self.backend.primary();
        match primary.load_site_document(document).await {
            Ok(found) => Ok(found.is_some()),
            Err(e) => {
                tracing::error!(
                    "site_document_exists on '{}' failed via {}: {}",
                    document.key(),
                    primary.name(),
                    e
                );
                Err(e)
            }
        }
    }

    /// Return the 1-indexed `page` of the filtered, sorted collection.
    ///
    /// The query's limit is ignored. Only invalid page coordinates are
    /// errors; storage failures yield an empty page.
    pub async fn get_page(
        &self,
        collection: impl IntoCollection,
        page: usize,
        page_size: usize,
        query: &Query,
    ) -> Result<Page, StoreError> {
        let request = PageRequest::new(page, page_size)?;
        let collection = match collection.into_collection() {
            Ok(collection) => collection,
            Err(e) => {
                tracing::warn!("get_page: {}", e);
                return Ok(request.empty());
            }
        };

        let page = match collection {
            Collection::Records(records) => {
                self.read_or_degrade("get_page", collection.as_str(), request.empty(), |backend| {
                    backend.find_page(records, query, request)
                })
                .await
            }
            Collection::SiteData => {
                let all = query.without_limit().apply(self.site_records().await);
                request.slice(all)
            }
        };
        Ok(page)
    }

    /// All stored `site-data` documents as records keyed `menu` / `settings`.
    async fn site_records(&self) -> Vec<Record> {
        self.read_or_degrade("get_many", SITE_DATA, Vec::new(), |backend| {
            Box::pin(load_site_records(backend))
        })
        .await
    }

    /// Run a read against the primary backend, then the read fallback;
    /// return `degraded` if both fail.
    async fn read_or_degrade<'a, T>(
        &'a self,
        op: &str,
        target: &str,
        degraded: T,
        read: impl Fn(&'a dyn DocumentBackend) -> BoxFuture<'a, Result<T, StoreError>>,
    ) -> T {
        let primary = self.backend.primary();
        match read(primary).await {
            Ok(value) => return value,
            Err(e) => {
                tracing::warn!("{} on '{}' failed via {}: {}", op, target, primary.name(), e);
            }
        }

        if let Some(fallback) = self.backend.read_fallback() {
            match read(fallback).await {
                Ok(value) => {
                    tracing::info!("{} on '{}' served by {} fallback", op, target, fallback.name());
                    return value;
                }
                Err(e) => {
                    tracing::warn!("{} on '{}' failed via {}: {}", op, target, fallback.name(), e);
                }
            }
        }

        degraded
    }

    /// Run a write against the primary backend only; log and propagate failure.
    async fn write_or_fail<'a, T>(
        &'a self,
        op: &str,
        target: &str,
        write: impl FnOnce(&'a dyn DocumentBackend) -> BoxFuture<'a, Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        let primary = self.backend.primary();
        write(primary).await.map_err(|e| {
            tracing::error!("{} on '{}' failed via {}: {}", op, target, primary.name(), e);
            e
        })
    }
}

async fn load_site_records(backend: &dyn DocumentBackend) -> Result<Vec<Record>, StoreError> {
    let mut records = Vec::new();
    for document in SiteDocument::ALL {
        if let Some(mut record) = backend.load_site_document(document).await? {
            record.insert(ID_FIELD.to_string(), Value::String(document.key().to_string()));
            records.push(record);
        }
    }
    Ok(records)
}

/// Normalize a loaded menu document to `{ "data": [...] }`.
fn menu_record(loaded: Option<Record>) -> Record {
    let data = loaded
        .and_then(|mut record| record.remove("data"))
        .filter(Value::is_array)
        .unwrap_or_else(|| Value::Array(Vec::new()));
    let mut record = Record::new();
    record.insert("data".to_string(), data);
    record
}

fn site_document(key: &str) -> Result<SiteDocument, StoreError> {
    SiteDocument::from_key(key).ok_or_else(|| {
        StoreError::InvalidArgument(format!(
            "'{}' is not a site-data document (expected 'menu' or 'settings')",
            key
        ))
    })
}

fn fixed_site_data(op: &str) -> StoreError {
    StoreError::InvalidArgument(format!(
        "{}: site-data holds fixed documents; use update_one or set_one",
        op
    ))
}
