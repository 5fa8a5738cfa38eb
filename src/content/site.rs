use crate::content::changes;
use crate::db::collection::{Collection, SiteDocument};
use crate::db::models::{from_record, to_record, MenuDocument, MenuItem, SiteSettings};
use crate::error::StoreError;
use crate::seed::default_menu;
use crate::store::DocumentStore;

/// The navigation tree. Empty when nothing is stored or the stored menu is
/// malformed.
pub async fn get_menu(store: &DocumentStore) -> Vec<MenuItem> {
    let Some(record) = store
        .get_one(Collection::SiteData, SiteDocument::Menu.key())
        .await
    else {
        return Vec::new();
    };

    match from_record::<MenuDocument>(record) {
        Ok(menu) => menu.data,
        Err(e) => {
            tracing::warn!("Ignoring malformed menu document: {}", e);
            Vec::new()
        }
    }
}

/// The stored menu, or the built-in one when none is stored.
pub async fn menu_or_default(store: &DocumentStore) -> Vec<MenuItem> {
    let menu = get_menu(store).await;
    if menu.is_empty() {
        default_menu()
    } else {
        menu
    }
}

/// Replace the whole navigation tree.
pub async fn save_menu(store: &DocumentStore, items: Vec<MenuItem>) -> Result<(), StoreError> {
    let record = to_record(&MenuDocument { data: items })?;
    store
        .set_one(Collection::SiteData, SiteDocument::Menu.key(), record)
        .await
}

/// Depth-first search for the menu entry with the given href.
pub fn find_category<'a>(menu: &'a [MenuItem], href: &str) -> Option<&'a MenuItem> {
    for item in menu {
        if item.href == href {
            return Some(item);
        }
        if let Some(found) = find_category(&item.children, href) {
            return Some(found);
        }
    }
    None
}

/// The href of an entry followed by the hrefs of all its descendants.
pub fn subtree_paths(item: &MenuItem) -> Vec<String> {
    let mut paths = vec![item.href.clone()];
    for child in &item.children {
        paths.extend(subtree_paths(child));
    }
    paths
}

/// Every category path in the menu, parents before children. `/` is skipped.
pub fn category_paths(menu: &[MenuItem]) -> Vec<String> {
    menu.iter()
        .flat_map(subtree_paths)
        .filter(|path| path != "/")
        .collect()
}

/// Site settings; defaults when none are stored.
pub async fn get_settings(store: &DocumentStore) -> SiteSettings {
    let Some(record) = store
        .get_one(Collection::SiteData, SiteDocument::Settings.key())
        .await
    else {
        return SiteSettings::default();
    };

    from_record(record).unwrap_or_else(|e| {
        tracing::warn!("Ignoring malformed settings document: {}", e);
        SiteSettings::default()
    })
}

/// Merge `settings` into the stored settings. Unset fields are left as they are.
pub async fn save_settings(store: &DocumentStore, settings: &SiteSettings) -> Result<(), StoreError> {
    let mut record = changes(settings)?;
    record.retain(|_, value| !value.is_null());
    store
        .update_one(Collection::SiteData, SiteDocument::Settings.key(), record)
        .await
}
