use async_trait::async_trait;

use crate::db::collection::{RecordCollection, SiteDocument};
use crate::db::models::Record;
use crate::db::query::{Page, PageRequest, Query};
use crate::error::StoreError;

/// Storage operations every backend provides.
///
/// This trait allows swapping MongoDB for local JSON files, and mocking the
/// storage layer in tests. Implementations report failures faithfully; the
/// degrade-or-fail policy lives in [`crate::store::DocumentStore`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentBackend: Send + Sync {
    /// Short label used in log lines.
    fn name(&self) -> &'static str;

    /// Load the collection, then filter, sort and truncate it.
    async fn find(&self, collection: RecordCollection, query: &Query)
        -> Result<Vec<Record>, StoreError>;

    /// One page of the filtered, sorted collection. The query's limit is ignored.
    async fn find_page(
        &self,
        collection: RecordCollection,
        query: &Query,
        page: PageRequest,
    ) -> Result<Page, StoreError>;

    /// Find a record by id, compared in string form.
    async fn find_by_id(
        &self,
        collection: RecordCollection,
        id: &str,
    ) -> Result<Option<Record>, StoreError>;

    /// Append a record that already carries its id.
    async fn insert(&self, collection: RecordCollection, record: Record) -> Result<(), StoreError>;

    /// Shallow-merge `partial` into the record. Returns `false` if no record has that id.
    async fn merge(
        &self,
        collection: RecordCollection,
        id: &str,
        partial: Record,
    ) -> Result<bool, StoreError>;

    /// Replace the record with that id, inserting it if absent.
    async fn replace(
        &self,
        collection: RecordCollection,
        id: &str,
        record: Record,
    ) -> Result<(), StoreError>;

    /// Remove the record with that id. Returns whether a removal occurred.
    async fn remove(&self, collection: RecordCollection, id: &str) -> Result<bool, StoreError>;

    /// Load a `site-data` document. The menu comes back as `{ "data": [...] }`.
    async fn load_site_document(&self, document: SiteDocument)
        -> Result<Option<Record>, StoreError>;

    /// Shallow-merge into a `site-data` document, creating it if absent.
    async fn merge_site_document(
        &self,
        document: SiteDocument,
        partial: Record,
    ) -> Result<(), StoreError>;

    /// Overwrite a `site-data` document.
    async fn replace_site_document(
        &self,
        document: SiteDocument,
        content: Record,
    ) -> Result<(), StoreError>;
}

/// Stand-in for a remote backend whose connection could not be established.
///
/// Every operation fails with `StorageUnavailable`, so writes fail loudly and
/// reads degrade through the store's read policy.
pub struct UnavailableBackend {
    reason: String,
}

impl UnavailableBackend {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    fn fail<T>(&self) -> Result<T, StoreError> {
        Err(StoreError::StorageUnavailable(self.reason.clone()))
    }
}

#[async_trait]
impl DocumentBackend for UnavailableBackend {
    fn name(&self) -> &'static str {
        "disconnected"
    }

    async fn find(&self, _: RecordCollection, _: &Query) -> Result<Vec<Record>, StoreError> {
        self.fail()
    }

    async fn find_page(
        &self,
        _: RecordCollection,
        _: &Query,
        _: PageRequest,
    ) -> Result<Page, StoreError> {
        self.fail()
    }

    async fn find_by_id(&self, _: RecordCollection, _: &str) -> Result<Option<Record>, StoreError> {
        self.fail()
    }

    async fn insert(&self, _: RecordCollection, _: Record) -> Result<(), StoreError> {
        self.fail()
    }

    async fn merge(&self, _: RecordCollection, _: &str, _: Record) -> Result<bool, StoreError> {
        self.fail()
    }

    async fn replace(&self, _: RecordCollection, _: &str, _: Record) -> Result<(), StoreError> {
        self.fail()
    }

    async fn remove(&self, _: RecordCollection, _: &str) -> Result<bool, StoreError> {
        self.fail()
    }

    async fn load_site_document(&self, _: SiteDocument) -> Result<Option<Record>, StoreError> {
        self.fail()
    }

    async fn merge_site_document(&self, _: SiteDocument, _: Record) -> Result<(), StoreError> {
        self.fail()
    }

    async fn replace_site_document(&self, _: SiteDocument, _: Record) -> Result<(), StoreError> {
        self.fail()
    }
}
