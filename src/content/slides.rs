use crate::content::changes;
use crate::db::collection::RecordCollection;
use crate::db::models::{decode_all, to_record, ActiveStatus, SlideConfig};
use crate::db::query::Query;
use crate::error::StoreError;
use crate::store::DocumentStore;

const HERO_SLIDES: RecordCollection = RecordCollection::HeroSlides;

fn validate(slide: &SlideConfig) -> Result<(), StoreError> {
    if slide.title.trim().is_empty() {
        return Err(StoreError::InvalidArgument("Slide title cannot be empty".into()));
    }
    if slide.image_url.trim().is_empty() {
        return Err(StoreError::InvalidArgument("Slide image URL cannot be empty".into()));
    }
    Ok(())
}

/// Slides shown on the home page.
pub async fn active_slides(store: &DocumentStore) -> Vec<SlideConfig> {
    let query = Query::new().where_eq("status", "active");
    decode_all(HERO_SLIDES.as_str(), store.get_many(HERO_SLIDES, &query).await)
}

pub async fn all_slides(store: &DocumentStore) -> Vec<SlideConfig> {
    decode_all(
        HERO_SLIDES.as_str(),
        store.get_many(HERO_SLIDES, &Query::new()).await,
    )
}

pub async fn add_slide(store: &DocumentStore, slide: SlideConfig) -> Result<String, StoreError> {
    validate(&slide)?;
    store.add_one(HERO_SLIDES, to_record(&slide)?).await
}

pub async fn update_slide(
    store: &DocumentStore,
    id: &str,
    slide: &SlideConfig,
) -> Result<(), StoreError> {
    validate(slide)?;
    store.update_one(HERO_SLIDES, id, changes(slide)?).await
}

pub async fn remove_slide(store: &DocumentStore, id: &str) -> Result<bool, StoreError> {
    store.delete_one(HERO_SLIDES, id).await
}

/// Toggle whether a slide is shown.
pub async fn set_slide_status(
    store: &DocumentStore,
    id: &str,
    status: ActiveStatus,
) -> Result<(), StoreError> {
    let mut partial = crate::db::models::Record::new();
    partial.insert("status".to_string(), serde_json::to_value(status)?);
    store.update_one(HERO_SLIDES, id, partial).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::StorageBackend;
    use crate::db::local::LocalJsonStore;

    fn slide(title: &str, status: ActiveStatus) -> SlideConfig {
        SlideConfig {
            id: String::new(),
            title: title.into(),
            subtitle: None,
            image_url: format!("/slides/{}.jpg", title.to_lowercase()),
            button_text: Some("Read more".into()),
            button_link: Some("/fashion".into()),
            status,
        }
    }

    #[tokio::test]
    async fn test_active_slides_filter() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::new(StorageBackend::local(LocalJsonStore::new(dir.path())));

        let summer = add_slide(&store, slide("Summer", ActiveStatus::Active)).await.unwrap();
        add_slide(&store, slide("Winter", ActiveStatus::Inactive)).await.unwrap();

        let active = active_slides(&store).await;
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, summer);
        assert_eq!(all_slides(&store).await.len(), 2);

        set_slide_status(&store, &summer, ActiveStatus::Inactive).await.unwrap();
        assert!(active_slides(&store).await.is_empty());
    }

    #[tokio::test]
    async fn test_update_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::new(StorageBackend::local(LocalJsonStore::new(dir.path())));

        let id = add_slide(&store, slide("Spring", ActiveStatus::Active)).await.unwrap();
        let mut edited = slide("Spring Sale", ActiveStatus::Active);
        edited.subtitle = Some("Up to 50% off".into());
        update_slide(&store, &id, &edited).await.unwrap();

        let stored = all_slides(&store).await;
        assert_eq!(stored[0].title, "Spring Sale");
        assert_eq!(stored[0].id, id);

        assert!(matches!(
            update_slide(&store, "missing", &edited).await,
            Err(StoreError::RecordNotFound { .. })
        ));
        assert!(remove_slide(&store, &id).await.unwrap());
        assert!(all_slides(&store).await.is_empty());
    }

    #[tokio::test]
    async fn test_add_requires_image() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::new(StorageBackend::local(LocalJsonStore::new(dir.path())));

        let mut bad = slide("Empty", ActiveStatus::Active);
        bad.image_url.clear();
        assert!(matches!(
            add_slide(&store, bad).await,
            Err(StoreError::InvalidArgument(_))
        ));
    }
}
