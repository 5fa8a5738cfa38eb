use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{Mutex, MutexGuard};

use crate::db::collection::{RecordCollection, SiteDocument};
use crate::db::models::{has_id, merge_into, Record, ID_FIELD};
use crate::db::query::{Page, PageRequest, Query};
use crate::db::repository::DocumentBackend;
use crate::error::StoreError;

/// Files owned by the local store; one lock each.
#[derive(Debug, Clone, Copy)]
enum StoreFile {
    Records(RecordCollection),
    Site(SiteDocument),
}

impl StoreFile {
    const COUNT: usize = 6;

    fn slot(&self) -> usize {
        match self {
            StoreFile::Records(RecordCollection::Posts) => 0,
            StoreFile::Records(RecordCollection::SocialLinks) => 1,
            StoreFile::Records(RecordCollection::HeroSlides) => 2,
            StoreFile::Records(RecordCollection::Ads) => 3,
            StoreFile::Site(SiteDocument::Menu) => 4,
            StoreFile::Site(SiteDocument::Settings) => 5,
        }
    }

    fn file_name(&self) -> &'static str {
        match self {
            StoreFile::Records(collection) => collection.file_name(),
            StoreFile::Site(document) => document.file_name(),
        }
    }
}

/// Local JSON-file backend: one array file per collection, plus `menu.json`
/// and `site-settings.json` for `site-data`.
///
/// Mutations hold a per-file async mutex across their read-modify-write, so
/// writers within one process are serialized. Separate processes writing the
/// same directory can still lose updates.
pub struct LocalJsonStore {
    data_dir: PathBuf,
    locks: [Mutex<()>; StoreFile::COUNT],
}

impl LocalJsonStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            locks: Default::default(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn path(&self, file: StoreFile) -> PathBuf {
        self.data_dir.join(file.file_name())
    }

    async fn lock(&self, file: StoreFile) -> MutexGuard<'_, ()> {
        self.locks[file.slot()].lock().await
    }

    /// Read a collection file, creating it as `[]` when missing.
    async fn read_records(&self, collection: RecordCollection) -> Result<Vec<Record>, StoreError> {
        let file = StoreFile::Records(collection);
        let path = self.path(file);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                self.create_empty(file).await?;
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&content).map_err(|e| {
            StoreError::PersistenceFailure(format!("Malformed {}: {}", path.display(), e))
        })
    }

    /// Create `[]` only if the file still does not exist, so an unlocked reader
    /// never clobbers a concurrent writer.
    async fn create_empty(&self, file: StoreFile) -> Result<(), StoreError> {
        use tokio::io::AsyncWriteExt;

        tokio::fs::create_dir_all(&self.data_dir).await?;
        let path = self.path(file);
        match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(mut handle) => {
                tracing::debug!("Created missing collection file {}", path.display());
                handle.write_all(b"[]").await?;
                handle.flush().await?;
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_records(
        &self,
        collection: RecordCollection,
        records: Vec<Record>,
    ) -> Result<(), StoreError> {
        let array = Value::Array(records.into_iter().map(Value::Object).collect());
        self.write_json(StoreFile::Records(collection), &array).await
    }

    async fn read_site(&self, document: SiteDocument) -> Result<Option<Record>, StoreError> {
        let path = self.path(StoreFile::Site(document));
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if content.trim().is_empty() {
            return Ok(None);
        }

        let value: Value = serde_json::from_str(&content).map_err(|e| {
            StoreError::PersistenceFailure(format!("Malformed {}: {}", path.display(), e))
        })?;
        match value {
            Value::Object(map) => Ok(Some(map)),
            // The menu may be stored as a bare array of items.
            Value::Array(items) if document == SiteDocument::Menu => {
                let mut wrapped = Record::new();
                wrapped.insert("data".to_string(), Value::Array(items));
                Ok(Some(wrapped))
            }
            Value::Null => Ok(None),
            other => Err(StoreError::PersistenceFailure(format!(
                "Unexpected content in {}: {}",
                path.display(),
                other
            ))),
        }
    }

    async fn write_site(&self, document: SiteDocument, content: Record) -> Result<(), StoreError> {
        let mut content = content;
        content.remove(ID_FIELD);
        self.write_json(StoreFile::Site(document), &Value::Object(content))
            .await
    }

    /// Write to a temporary sibling file, then rename it over the target.
    async fn write_json(&self, file: StoreFile, value: &Value) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.data_dir).await?;
        let target = self.path(file);
        let tmp = self
            .data_dir
            .join(format!(".{}-{}.tmp", file.file_name(), uuid::Uuid::new_v4()));

        let content = serde_json::to_string_pretty(value)?;
        if let Err(e) = tokio::fs::write(&tmp, content).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(StoreError::PersistenceFailure(format!(
                "Failed to write {}: {}",
                tmp.display(),
                e
            )));
        }
        if let Err(e) = tokio::fs::rename(&tmp, &target).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(StoreError::PersistenceFailure(format!(
                "Failed to replace {}: {}",
                target.display(),
                e
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentBackend for LocalJsonStore {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn find(
        &self,
        collection: RecordCollection,
        query: &Query,
    ) -> Result<Vec<Record>, StoreError> {
        let records = self.read_records(collection).await?;
        Ok(query.apply(records))
    }

    async fn find_page(
        &self,
        collection: RecordCollection,
        query: &Query,
        page: PageRequest,
    ) -> Result<Page, StoreError> {
        let all = self.find(collection, &query.without_limit()).await?;
        Ok(page.slice(all))
    }

    async fn find_by_id(
        &self,
        collection: RecordCollection,
        id: &str,
    ) -> Result<Option<Record>, StoreError> {
        let records = self.read_records(collection).await?;
        Ok(records.into_iter().find(|r| has_id(r, id)))
    }

    async fn insert(&self, collection: RecordCollection, record: Record) -> Result<(), StoreError> {
        let _guard = self.lock(StoreFile::Records(collection)).await;
        let mut records = self.read_records(collection).await?;
        records.push(record);
        self.write_records(collection, records).await
    }

    async fn merge(
        &self,
        collection: RecordCollection,
        id: &str,
        partial: Record,
    ) -> Result<bool, StoreError> {
        let _guard = self.lock(StoreFile::Records(collection)).await;
        let mut records = self.read_records(collection).await?;
        let Some(existing) = records.iter_mut().find(|r| has_id(r, id)) else {
            return Ok(false);
        };
        merge_into(existing, partial);
        self.write_records(collection, records).await?;
        Ok(true)
    }

    async fn replace(
        &self,
        collection: RecordCollection,
        id: &str,
        record: Record,
    ) -> Result<(), StoreError> {
        let _guard = self.lock(StoreFile::Records(collection)).await;
        let mut records = self.read_records(collection).await?;
        match records.iter_mut().find(|r| has_id(r, id)) {
            Some(existing) => *existing = record,
            None => records.push(record),
        }
        self.write_records(collection, records).await
    }

    async fn remove(&self, collection: RecordCollection, id: &str) -> Result<bool, StoreError> {
        let _guard = self.lock(StoreFile::Records(collection)).await;
        let mut records = self.read_records(collection).await?;
        let before = records.len();
        records.retain(|r| !has_id(r, id));
        if records.len() == before {
            return Ok(false);
        }
        self.write_records(collection, records).await?;
        Ok(true)
    }

    async fn load_site_document(
        &self,
        document: SiteDocument,
    ) -> Result<Option<Record>, StoreError> {
        self.read_site(document).await
    }

    async fn merge_site_document(
        &self,
        document: SiteDocument,
        partial: Record,
    ) -> Result<(), StoreError> {
        let _guard = self.lock(StoreFile::Site(document)).await;
        let mut content = self.read_site(document).await?.unwrap_or_default();
        merge_into(&mut content, partial);
        self.write_site(document, content).await
    }

    async fn replace_site_document(
        &self,
        document: SiteDocument,
        content: Record,
    ) -> Result<(), StoreError> {
        let _guard = self.lock(StoreFile::Site(document)).await;
        self.write_site(document, content).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    fn rec(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[tokio::test]
    async fn test_missing_file_is_created_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalJsonStore::new(dir.path());

        let records = store.find(RecordCollection::Posts, &Query::new()).await.unwrap();
        assert!(records.is_empty());

        let on_disk = std::fs::read_to_string(dir.path().join("posts.json")).unwrap();
        assert_eq!(serde_json::from_str::<Value>(&on_disk).unwrap(), json!([]));
    }

    #[tokio::test]
    async fn test_insert_then_find_by_id() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalJsonStore::new(dir.path());

        store
            .insert(RecordCollection::Ads, rec(json!({"id": "a1", "name": "Top"})))
            .await
            .unwrap();

        let found = store.find_by_id(RecordCollection::Ads, "a1").await.unwrap();
        assert_eq!(found.unwrap()["name"], "Top");
        assert!(store
            .find_by_id(RecordCollection::Ads, "missing")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_numeric_ids_in_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("posts.json"),
            r#"[{"id": 1717000000000, "title": "Legacy"}]"#,
        )
        .unwrap();
        let store = LocalJsonStore::new(dir.path());

        let found = store
            .find_by_id(RecordCollection::Posts, "1717000000000")
            .await
            .unwrap();
        assert_eq!(found.unwrap()["title"], "Legacy");
    }

    #[tokio::test]
    async fn test_merge_reports_missing_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalJsonStore::new(dir.path());

        let merged = store
            .merge(RecordCollection::Posts, "nope", rec(json!({"title": "x"})))
            .await
            .unwrap();
        assert!(!merged);
        let all = store.find(RecordCollection::Posts, &Query::new()).await.unwrap();
        assert!(all.is_empty());
    }

    #[tokio::test]
    async fn test_remove_reports_whether_removed() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalJsonStore::new(dir.path());
        store
            .insert(RecordCollection::SocialLinks, rec(json!({"id": "s1"})))
            .await
            .unwrap();

        assert!(store.remove(RecordCollection::SocialLinks, "s1").await.unwrap());
        assert!(!store.remove(RecordCollection::SocialLinks, "s1").await.unwrap());
    }

    #[tokio::test]
    async fn test_replace_inserts_or_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalJsonStore::new(dir.path());

        store
            .replace(RecordCollection::SocialLinks, "fb", rec(json!({"id": "fb", "url": "a"})))
            .await
            .unwrap();
        store
            .replace(RecordCollection::SocialLinks, "fb", rec(json!({"id": "fb", "platform": "Facebook"})))
            .await
            .unwrap();

        let all = store
            .find(RecordCollection::SocialLinks, &Query::new())
            .await
            .unwrap();
        assert_eq!(all, vec![rec(json!({"id": "fb", "platform": "Facebook"}))]);
    }

    #[tokio::test]
    async fn test_menu_accepts_bare_array() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("menu.json"),
            r#"[{"label": "Pets", "href": "/pets"}]"#,
        )
        .unwrap();
        let store = LocalJsonStore::new(dir.path());

        let menu = store
            .load_site_document(SiteDocument::Menu)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(menu["data"][0]["href"], "/pets");
    }

    #[tokio::test]
    async fn test_site_documents_use_separate_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalJsonStore::new(dir.path());

        store
            .merge_site_document(SiteDocument::Settings, rec(json!({"siteName": "Amaj"})))
            .await
            .unwrap();
        store
            .merge_site_document(SiteDocument::Settings, rec(json!({"copyright": "2024"})))
            .await
            .unwrap();

        assert!(dir.path().join("site-settings.json").exists());
        assert!(!dir.path().join("menu.json").exists());
        let settings = store
            .load_site_document(SiteDocument::Settings)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(settings, rec(json!({"siteName": "Amaj", "copyright": "2024"})));
    }

    #[tokio::test]
    async fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("ads.json"), "{ not json").unwrap();
        let store = LocalJsonStore::new(dir.path());

        let result = store.find(RecordCollection::Ads, &Query::new()).await;
        assert!(matches!(result, Err(StoreError::PersistenceFailure(_))));
    }

    #[tokio::test]
    async fn test_failed_replace_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        // A directory in place of the target makes the rename fail.
        std::fs::create_dir(dir.path().join("site-settings.json")).unwrap();
        let store = LocalJsonStore::new(dir.path());

        let result = store
            .replace_site_document(SiteDocument::Settings, rec(json!({"siteName": "Amaj"})))
            .await;
        assert!(matches!(result, Err(StoreError::PersistenceFailure(_))));

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name.ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty(), "left behind: {:?}", leftovers);
    }

    #[tokio::test]
    async fn test_concurrent_inserts_are_serialized() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(LocalJsonStore::new(dir.path()));

        let mut handles = Vec::new();
        for i in 0..20 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .insert(RecordCollection::Posts, rec(json!({"id": i.to_string()})))
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let all = store.find(RecordCollection::Posts, &Query::new()).await.unwrap();
        assert_eq!(all.len(), 20);
    }
}
