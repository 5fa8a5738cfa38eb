use std::fmt;
use std::str::FromStr;

use crate::error::StoreError;

/// A collection stored as an array of records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordCollection {
    Posts,
    SocialLinks,
    HeroSlides,
    Ads,
}

impl RecordCollection {
    pub const ALL: [RecordCollection; 4] = [
        RecordCollection::Posts,
        RecordCollection::SocialLinks,
        RecordCollection::HeroSlides,
        RecordCollection::Ads,
    ];

    /// Wire name, also used as the MongoDB collection name.
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordCollection::Posts => "posts",
            RecordCollection::SocialLinks => "socialLinks",
            RecordCollection::HeroSlides => "heroSlides",
            RecordCollection::Ads => "ads",
        }
    }

    /// Name of the JSON file backing this collection in local mode.
    pub fn file_name(&self) -> &'static str {
        match self {
            RecordCollection::Posts => "posts.json",
            RecordCollection::SocialLinks => "socialLinks.json",
            RecordCollection::HeroSlides => "heroSlides.json",
            RecordCollection::Ads => "ads.json",
        }
    }
}

/// One of the two singleton documents held by `site-data`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SiteDocument {
    Menu,
    Settings,
}

impl SiteDocument {
    pub const ALL: [SiteDocument; 2] = [SiteDocument::Menu, SiteDocument::Settings];

    pub fn key(&self) -> &'static str {
        match self {
            SiteDocument::Menu => "menu",
            SiteDocument::Settings => "settings",
        }
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            SiteDocument::Menu => "menu.json",
            SiteDocument::Settings => "site-settings.json",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "menu" => Some(SiteDocument::Menu),
            "settings" => Some(SiteDocument::Settings),
            _ => None,
        }
    }
}

/// Every collection the store knows about.
///
/// `site-data` is not an array of records; it holds the menu tree and the
/// settings singleton, and every operation routes it separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Records(RecordCollection),
    SiteData,
}

pub const SITE_DATA: &str = "site-data";

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Records(records) => records.as_str(),
            Collection::SiteData => SITE_DATA,
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for RecordCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<RecordCollection> for Collection {
    fn from(records: RecordCollection) -> Self {
        Collection::Records(records)
    }
}

impl FromStr for Collection {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == SITE_DATA {
            return Ok(Collection::SiteData);
        }
        RecordCollection::ALL
            .iter()
            .find(|c| c.as_str() == s)
            .map(|c| Collection::Records(*c))
            .ok_or_else(|| StoreError::InvalidArgument(format!("Unknown collection '{}'", s)))
    }
}

/// Anything the accessor accepts as a collection reference.
///
/// Typed callers pass `RecordCollection` / `Collection` directly; the string
/// impls exist for boundaries such as the admin CLI.
pub trait IntoCollection {
    fn into_collection(self) -> Result<Collection, StoreError>;
}

impl IntoCollection for Collection {
    fn into_collection(self) -> Result<Collection, StoreError> {
        Ok(self)
    }
}

impl IntoCollection for RecordCollection {
    fn into_collection(self) -> Result<Collection, StoreError> {
        Ok(Collection::Records(self))
    }
}

impl IntoCollection for &str {
    fn into_collection(self) -> Result<Collection, StoreError> {
        self.parse()
    }
}

impl IntoCollection for &String {
    fn into_collection(self) -> Result<Collection, StoreError> {
        self.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_names() {
        assert_eq!(
            "posts".parse::<Collection>().unwrap(),
            Collection::Records(RecordCollection::Posts)
        );
        assert_eq!(
            "socialLinks".parse::<Collection>().unwrap(),
            Collection::Records(RecordCollection::SocialLinks)
        );
        assert_eq!("site-data".parse::<Collection>().unwrap(), Collection::SiteData);
    }

    #[test]
    fn test_parse_is_case_sensitive() {
        assert!("Posts".parse::<Collection>().is_err());
        assert!("sociallinks".parse::<Collection>().is_err());
    }

    #[test]
    fn test_unknown_collection_is_invalid_argument() {
        match "comments".parse::<Collection>() {
            Err(StoreError::InvalidArgument(msg)) => assert!(msg.contains("comments")),
            other => panic!("Expected InvalidArgument, got: {:?}", other),
        }
    }

    #[test]
    fn test_names_round_trip_through_display() {
        for records in RecordCollection::ALL {
            let collection = Collection::from(records);
            assert_eq!(collection.to_string().parse::<Collection>().unwrap(), collection);
        }
    }

    #[test]
    fn test_site_document_keys() {
        assert_eq!(SiteDocument::from_key("menu"), Some(SiteDocument::Menu));
        assert_eq!(SiteDocument::from_key("settings"), Some(SiteDocument::Settings));
        assert_eq!(SiteDocument::from_key("footer"), None);
        assert_eq!(SiteDocument::Settings.file_name(), "site-settings.json");
    }
}
