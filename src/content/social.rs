use crate::db::collection::RecordCollection;
use crate::db::models::{decode_all, to_record, SocialLink};
use crate::db::query::{Query, SortDirection};
use crate::error::StoreError;
use crate::store::DocumentStore;

const SOCIAL_LINKS: RecordCollection = RecordCollection::SocialLinks;

/// All social profile links, ordered by platform.
pub async fn list_links(store: &DocumentStore) -> Vec<SocialLink> {
    let query = Query::new().order_by("platform", SortDirection::Asc);
    decode_all(
        SOCIAL_LINKS.as_str(),
        store.get_many(SOCIAL_LINKS, &query).await,
    )
}

pub async fn add_link(store: &DocumentStore, link: SocialLink) -> Result<String, StoreError> {
    if link.platform.trim().is_empty() {
        return Err(StoreError::InvalidArgument("Social link platform cannot be empty".into()));
    }
    if link.url.trim().is_empty() {
        return Err(StoreError::InvalidArgument("Social link URL cannot be empty".into()));
    }

    let id = store.add_one(SOCIAL_LINKS, to_record(&link)?).await?;
    tracing::info!("Added {} link {}", link.platform, id);
    Ok(id)
}

pub async fn remove_link(store: &DocumentStore, id: &str) -> Result<bool, StoreError> {
    store.delete_one(SOCIAL_LINKS, id).await
}
