use crate::content::changes;
use crate::db::collection::RecordCollection;
use crate::db::models::{decode_all, to_record, AdConfig};
use crate::db::query::Query;
use crate::error::StoreError;
use crate::store::DocumentStore;

const ADS: RecordCollection = RecordCollection::Ads;

fn validate(ad: &AdConfig) -> Result<(), StoreError> {
    if ad.name.trim().is_empty() {
        return Err(StoreError::InvalidArgument("Ad name cannot be empty".into()));
    }
    if ad.location.trim().is_empty() {
        return Err(StoreError::InvalidArgument("Ad location cannot be empty".into()));
    }
    if ad.content.trim().is_empty() {
        return Err(StoreError::InvalidArgument("Ad content cannot be empty".into()));
    }
    Ok(())
}

fn active() -> Query {
    Query::new().where_eq("status", "active")
}

pub async fn active_ads(store: &DocumentStore) -> Vec<AdConfig> {
    decode_all(ADS.as_str(), store.get_many(ADS, &active()).await)
}

pub async fn all_ads(store: &DocumentStore) -> Vec<AdConfig> {
    decode_all(ADS.as_str(), store.get_many(ADS, &Query::new()).await)
}

/// The first active ad for a placement such as `home-top`.
pub async fn ad_for_location(store: &DocumentStore, location: &str) -> Option<AdConfig> {
    let query = active().where_eq("location", location).limit(1);
    decode_all(ADS.as_str(), store.get_many(ADS, &query).await)
        .into_iter()
        .next()
}

pub async fn add_ad(store: &DocumentStore, ad: AdConfig) -> Result<String, StoreError> {
    validate(&ad)?;
    let id = store.add_one(ADS, to_record(&ad)?).await?;
    tracing::info!("Added ad '{}' at {} ({})", ad.name, ad.location, id);
    Ok(id)
}

pub async fn update_ad(store: &DocumentStore, id: &str, ad: &AdConfig) -> Result<(), StoreError> {
    validate(ad)?;
    let mut record = changes(ad)?;
    record.entry("link").or_insert(serde_json::Value::Null);
    store.update_one(ADS, id, record).await
}

pub async fn remove_ad(store: &DocumentStore, id: &str) -> Result<bool, StoreError> {
    store.delete_one(ADS, id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::StorageBackend;
    use crate::db::local::LocalJsonStore;
    use crate::db::models::{ActiveStatus, AdKind};

    fn ad(name: &str, location: &str, status: ActiveStatus) -> AdConfig {
        AdConfig {
            id: String::new(),
            name: name.into(),
            kind: AdKind::Image,
            content: format!("/ads/{}.png", name),
            link: Some("https://example.com".into()),
            location: location.into(),
            status,
        }
    }

    #[tokio::test]
    async fn test_ad_for_location_picks_active() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::new(StorageBackend::local(LocalJsonStore::new(dir.path())));

        add_ad(&store, ad("old", "home-top", ActiveStatus::Inactive)).await.unwrap();
        let live = add_ad(&store, ad("live", "home-top", ActiveStatus::Active)).await.unwrap();
        add_ad(&store, ad("footer", "post-bottom", ActiveStatus::Active)).await.unwrap();

        let found = ad_for_location(&store, "home-top").await.unwrap();
        assert_eq!(found.id, live);
        assert!(ad_for_location(&store, "sidebar").await.is_none());
        assert_eq!(active_ads(&store).await.len(), 2);
        assert_eq!(all_ads(&store).await.len(), 3);
    }

    #[tokio::test]
    async fn test_update_clears_link() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::new(StorageBackend::local(LocalJsonStore::new(dir.path())));

        let id = add_ad(&store, ad("banner", "home-top", ActiveStatus::Active)).await.unwrap();
        let mut code = ad("banner", "home-top", ActiveStatus::Active);
        code.kind = AdKind::Code;
        code.content = "<script>ads()</script>".into();
        code.link = None;
        update_ad(&store, &id, &code).await.unwrap();

        let stored = ad_for_location(&store, "home-top").await.unwrap();
        assert_eq!(stored.kind, AdKind::Code);
        assert_eq!(stored.link, None);

        assert!(remove_ad(&store, &id).await.unwrap());
        assert!(active_ads(&store).await.is_empty());
    }
}
