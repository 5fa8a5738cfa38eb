use crate::content::site::{save_menu, save_settings};
use crate::db::collection::SiteDocument;
use crate::db::models::{MenuItem, SiteSettings};
use crate::error::StoreError;
use crate::store::DocumentStore;

/// The built-in navigation tree.
pub fn default_menu() -> Vec<MenuItem> {
    vec![
        MenuItem::new("Fashion", "/fashion").with_children(vec![
            MenuItem::new("Nail Care & Art", "/fashion/nail-care-art"),
            MenuItem::new("Women’s Fashion", "/fashion/womens-fashion"),
            MenuItem::new("Men’s Fashion", "/fashion/mens-fashion"),
            MenuItem::new("Kids Fashion & Essentials", "/fashion/kids-fashion"),
        ]),
        MenuItem::new("Health & Beauty", "/health-beauty").with_children(vec![
            MenuItem::new("Skin Care & Glow", "/health-beauty/skin-care"),
            MenuItem::new("Hair Care & Growth", "/health-beauty/hair-care"),
            MenuItem::new("Weight Loss & Fitness", "/health-beauty/fitness"),
        ]),
        MenuItem::new("Home & Kitchen", "/home-kitchen").with_children(vec![
            MenuItem::new("Home Decor Ideas", "/home-kitchen/decor"),
            MenuItem::new("Smart Kitchen Tools", "/home-kitchen/kitchen-tools"),
            MenuItem::new("Cleaning & Storage", "/home-kitchen/cleaning-storage"),
        ]),
        MenuItem::new("Gadgets", "/gadgets").with_children(vec![
            MenuItem::new("Smart Home Devices", "/gadgets/smart-home"),
            MenuItem::new("Portable & Travel Gadgets", "/gadgets/portable-gadgets"),
            MenuItem::new("Trending Amazon Gadgets", "/gadgets/amazon-gadgets"),
        ]),
        MenuItem::new("Pets", "/pets").with_children(vec![
            MenuItem::new("Funny & Viral Pet Gadgets", "/pets/viral-gadgets"),
            MenuItem::new("Amazon Pet Favorites", "/pets/amazon-favorites"),
            MenuItem::new("Dog Training & Care Hacks", "/pets/dog-care"),
        ]),
        MenuItem::new("Fishing", "/fishing").with_children(vec![
            MenuItem::new("Fishing Gear & Tackle", "/fishing/gear"),
            MenuItem::new("Fishing Tips & Techniques", "/fishing/tips"),
            MenuItem::new("Best Fishing Spots", "/fishing/spots"),
            MenuItem::new("Fishing Accessories", "/fishing/accessories"),
        ]),
    ]
}

pub fn default_settings() -> SiteSettings {
    SiteSettings {
        site_name: Some("Blogdeck".to_string()),
        site_description: Some("Guides, reviews and ideas for everyday living".to_string()),
        logo_url: None,
        copyright: Some("All rights reserved.".to_string()),
    }
}

/// Write the built-in menu and settings where none are stored.
///
/// Existing documents are never overwritten, including an empty menu. If
/// the primary backend cannot tell whether a document exists, nothing more
/// is written and the error is returned. Returns the keys of the documents
/// that were written.
pub async fn seed_defaults(store: &DocumentStore) -> Result<Vec<&'static str>, StoreError> {
    tracing::info!("Seeding default site data...");
    let mut seeded = Vec::new();

    for document in SiteDocument::ALL {
        if store.site_document_exists(document).await? {
            tracing::info!("Site document '{}' already exists, skipping.", document.key());
            continue;
        }

        match document {
            SiteDocument::Menu => save_menu(store, default_menu()).await?,
            SiteDocument::Settings => save_settings(store, &default_settings()).await?,
        }
        tracing::info!("Seeded site document '{}'.", document.key());
        seeded.push(document.key());
    }

    Ok(seeded)
}
