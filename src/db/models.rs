use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::StoreError;

/// A semi-structured record: field name to JSON value.
///
/// After creation every record carries a string `id`, unique within its
/// collection.
pub type Record = Map<String, Value>;

pub const ID_FIELD: &str = "id";

/// The record's id in string form.
///
/// Older files may hold numeric ids, so numbers are stringified.
pub fn record_id(record: &Record) -> Option<String> {
    match record.get(ID_FIELD)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub fn has_id(record: &Record, id: &str) -> bool {
    record_id(record).as_deref() == Some(id)
}

/// Shallow merge: top-level fields of `partial` overwrite, everything else is
/// preserved. The `id` field of `partial` is never applied.
pub fn merge_into(target: &mut Record, partial: Record) {
    for (key, value) in partial {
        if key == ID_FIELD {
            continue;
        }
        target.insert(key, value);
    }
}

/// Serialize a typed entity into a record.
pub fn to_record<T: Serialize>(value: &T) -> Result<Record, StoreError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::InvalidArgument(format!(
            "Expected a JSON object, got: {}",
            other
        ))),
    }
}

/// Decode a record into a typed entity.
pub fn from_record<T: DeserializeOwned>(record: Record) -> Result<T, StoreError> {
    Ok(serde_json::from_value(Value::Object(record))?)
}

/// Decode a batch of records, skipping (and logging) any that do not fit `T`.
pub fn decode_all<T: DeserializeOwned>(collection: &str, records: Vec<Record>) -> Vec<T> {
    records
        .into_iter()
        .filter_map(|record| {
            let id = record_id(&record).unwrap_or_default();
            match from_record(record) {
                Ok(item) => Some(item),
                Err(e) => {
                    tracing::warn!("Skipping malformed record '{}' in '{}': {}", id, collection, e);
                    None
                }
            }
        })
        .collect()
}

/// Publication state of a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Published,
    #[default]
    Draft,
    Scheduled,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Published => "published",
            PostStatus::Draft => "draft",
            PostStatus::Scheduled => "scheduled",
        }
    }
}

/// A blog post stored in `posts`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub slug: String,
    pub title: String,
    /// Rich HTML content.
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub image_url: String,
    /// Path matching a menu entry's href, e.g. `/fashion/mens-fashion`.
    #[serde(default)]
    pub category: String,
    /// RFC 3339 timestamp.
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub status: PostStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_ai_hint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seo_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seo_description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub views: u64,
}

/// A navigation entry; children make it a tree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MenuItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub label: String,
    pub href: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<MenuItem>,
}

impl MenuItem {
    pub fn new(label: &str, href: &str) -> Self {
        Self {
            id: None,
            label: label.to_string(),
            href: href.to_string(),
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<MenuItem>) -> Self {
        self.children = children;
        self
    }
}

/// Shape of the `menu` site document: the tree wrapped under `data`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct MenuDocument {
    #[serde(default)]
    pub data: Vec<MenuItem>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ActiveStatus {
    #[default]
    Active,
    Inactive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdKind {
    /// `content` is an image URL, `link` the click-through destination.
    Image,
    /// `content` is an inline code snippet.
    Code,
}

/// An ad placement stored in `ads`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AdConfig {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: AdKind,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    /// Placement identifier such as `home-top` or `post-bottom`.
    pub location: String,
    #[serde(default)]
    pub status: ActiveStatus,
}

/// A hero slider entry stored in `heroSlides`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SlideConfig {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    pub image_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub button_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub button_link: Option<String>,
    #[serde(default)]
    pub status: ActiveStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SocialLink {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// Platform name, e.g. `Facebook` or `Youtube`.
    pub platform: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// The settings singleton held in `site-data`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SiteSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copyright: Option<String>,
}
