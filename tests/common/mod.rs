#![allow(dead_code)]

use serde_json::{json, Value};
use tempfile::TempDir;

use blogdeck::backend::StorageBackend;
use blogdeck::db::local::LocalJsonStore;
use blogdeck::db::models::Record;
use blogdeck::store::DocumentStore;

/// A store over local JSON files in a fresh temporary directory.
///
/// The directory is removed when this struct is dropped.
pub struct LocalEnv {
    pub dir: TempDir,
    pub store: DocumentStore,
}

impl LocalEnv {
    pub fn start() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let store = DocumentStore::new(StorageBackend::local(LocalJsonStore::new(dir.path())));
        Self { dir, store }
    }

    pub fn file(&self, name: &str) -> std::path::PathBuf {
        self.dir.path().join(name)
    }

    /// Parse a data file as JSON.
    pub fn read_file(&self, name: &str) -> Value {
        let content = std::fs::read_to_string(self.file(name)).expect("Failed to read data file");
        serde_json::from_str(&content).expect("Data file is not valid JSON")
    }

    pub fn write_file(&self, name: &str, value: &Value) {
        std::fs::write(self.file(name), serde_json::to_string_pretty(value).unwrap())
            .expect("Failed to write data file");
    }
}

pub fn record(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        other => panic!("Expected a JSON object, got: {:?}", other),
    }
}

/// A published post record dated on day `day` of January 2024.
pub fn published_post(n: usize, day: u32) -> Record {
    record(json!({
        "slug": format!("post-{}", n),
        "title": format!("Post {}", n),
        "content": "<p>Hello</p>",
        "category": "/fashion/mens-fashion",
        "date": format!("2024-01-{:02}T09:00:00+00:00", day),
        "status": "published",
        "tags": ["style"],
        "views": n,
    }))
}

#[cfg(feature = "mongo")]
pub mod mongo {
    use testcontainers::runners::AsyncRunner;
    use testcontainers::ContainerAsync;
    use testcontainers_modules::mongo::Mongo;

    use blogdeck::config::{StorageMode, StoreConfig};
    use blogdeck::backend::StorageBackend;
    use blogdeck::store::DocumentStore;

    /// Holds a running MongoDB container and a store connected to it.
    ///
    /// The container is stopped when this struct is dropped.
    pub struct MongoEnv {
        _mongo: ContainerAsync<Mongo>,
        pub uri: String,
        pub store: DocumentStore,
    }

    impl MongoEnv {
        pub async fn start() -> Self {
            let container = Mongo::default()
                .start()
                .await
                .expect("Failed to start MongoDB container");
            let port = container
                .get_host_port_ipv4(27017)
                .await
                .expect("Failed to get MongoDB port");
            let uri = format!("mongodb://127.0.0.1:{}", port);

            let mut config = StoreConfig::default();
            config.storage.mode = StorageMode::Remote;
            config.storage.read_fallback = false;
            config.mongodb.uri = Some(uri.clone());
            config.mongodb.database = "blogdeck_test".to_string();
            config.mongodb.timeout_secs = 10;

            let store = DocumentStore::new(StorageBackend::connect(&config).await);
            Self {
                _mongo: container,
                uri,
                store,
            }
        }
    }
}
