//! Typed operations over the document store for each blog collection.

pub mod ads;
pub mod posts;
pub mod site;
pub mod slides;
pub mod social;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::db::models::{decode_all, Record};
use crate::db::query::Page;

/// A page of decoded entities with the accessor's paging metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Paged<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub page_size: usize,
    pub total_count: usize,
    pub total_pages: usize,
}

impl<T: DeserializeOwned> Paged<T> {
    pub(crate) fn decode(collection: &str, page: Page) -> Self {
        Self {
            items: decode_all(collection, page.records),
            page: page.page,
            page_size: page.page_size,
            total_count: page.total_count,
            total_pages: page.total_pages,
        }
    }
}

/// Serialize an entity for a partial update, dropping its `id`.
pub(crate) fn changes<T: Serialize>(entity: &T) -> Result<Record, crate::error::StoreError> {
    let mut record = crate::db::models::to_record(entity)?;
    record.remove(crate::db::models::ID_FIELD);
    Ok(record)
}
