pub mod backend;
pub mod config;
pub mod content;
pub mod error;
pub mod seed;
pub mod store;

pub mod db {
    pub mod collection;
    pub mod local;
    pub mod models;
    pub mod query;
    #[cfg(feature = "mongo")]
    pub mod remote;
    pub mod repository;
}

pub use backend::{BackendMode, StorageBackend};
pub use config::StoreConfig;
pub use db::collection::Collection;
pub use db::models::Record;
pub use db::query::{Page, Query};
pub use error::StoreError;
pub use store::DocumentStore;
