use std::fmt;
use std::sync::Arc;

use crate::config::{StorageMode, StoreConfig};
use crate::db::local::LocalJsonStore;
use crate::db::repository::{DocumentBackend, UnavailableBackend};

/// Which storage the process ended up with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendMode {
    /// Connected to MongoDB.
    Remote,
    /// Local JSON files.
    Local,
    /// MongoDB was required but could not be reached.
    Disconnected,
}

impl fmt::Display for BackendMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendMode::Remote => write!(f, "remote"),
            BackendMode::Local => write!(f, "local"),
            BackendMode::Disconnected => write!(f, "disconnected"),
        }
    }
}

/// The storage decision for the lifetime of the process.
///
/// Built once at startup and injected into the store; there is no runtime
/// transition back to remote storage.
#[derive(Clone)]
pub struct StorageBackend {
    mode: BackendMode,
    primary: Arc<dyn DocumentBackend>,
    read_fallback: Option<Arc<dyn DocumentBackend>>,
}

impl StorageBackend {
    /// Assemble a backend from explicit parts (useful for testing / DI).
    pub fn new(
        mode: BackendMode,
        primary: Arc<dyn DocumentBackend>,
        read_fallback: Option<Arc<dyn DocumentBackend>>,
    ) -> Self {
        Self {
            mode,
            primary,
            read_fallback,
        }
    }

    pub fn local(store: LocalJsonStore) -> Self {
        Self::new(BackendMode::Local, Arc::new(store), None)
    }

    /// Select the backend according to `config.storage.mode`.
    ///
    /// - `local`: local JSON files.
    /// - `remote`: MongoDB; if unreachable, writes fail and reads use the
    ///   local files when `read_fallback` is set.
    /// - `auto`: MongoDB if reachable, local JSON files otherwise.
    pub async fn connect(config: &StoreConfig) -> Self {
        let local = || -> Arc<dyn DocumentBackend> {
            Arc::new(LocalJsonStore::new(&config.storage.data_dir))
        };
        let fallback = || config.storage.read_fallback.then(local);

        if config.storage.mode == StorageMode::Local {
            tracing::info!(
                "Using local JSON storage at {}",
                config.storage.data_dir.display()
            );
            return Self::new(BackendMode::Local, local(), None);
        }

        match connect_remote(config).await {
            Ok(remote) => {
                tracing::info!("Connected to MongoDB database '{}'", config.mongodb.database);
                Self::new(BackendMode::Remote, remote, fallback())
            }
            Err(reason) if config.storage.mode == StorageMode::Auto => {
                tracing::warn!(
                    "MongoDB unavailable ({}); using local JSON storage at {}",
                    reason,
                    config.storage.data_dir.display()
                );
                Self::new(BackendMode::Local, local(), None)
            }
            Err(reason) => {
                tracing::error!("MongoDB unavailable ({}); writes will fail", reason);
                Self::new(
                    BackendMode::Disconnected,
                    Arc::new(UnavailableBackend::new(reason)),
                    fallback(),
                )
            }
        }
    }

    pub fn mode(&self) -> BackendMode {
        self.mode
    }

    pub fn primary(&self) -> &dyn DocumentBackend {
        self.primary.as_ref()
    }

    pub fn read_fallback(&self) -> Option<&dyn DocumentBackend> {
        self.read_fallback.as_deref()
    }
}

impl fmt::Debug for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageBackend")
            .field("mode", &self.mode)
            .field("primary", &self.primary.name())
            .field("read_fallback", &self.read_fallback.as_ref().map(|b| b.name()))
            .finish()
    }
}

#[cfg(feature = "mongo")]
async fn connect_remote(config: &StoreConfig) -> Result<Arc<dyn DocumentBackend>, String> {
    use crate::db::remote::MongoStore;

    let uri = config
        .mongodb
        .uri
        .as_deref()
        .filter(|uri| !uri.trim().is_empty())
        .ok_or_else(|| "no MongoDB URI configured".to_string())?;

    MongoStore::connect(uri, &config.mongodb.database, config.timeout())
        .await
        .map(|store| Arc::new(store) as Arc<dyn DocumentBackend>)
        .map_err(|e| e.to_string())
}

#[cfg(not(feature = "mongo"))]
async fn connect_remote(_config: &StoreConfig) -> Result<Arc<dyn DocumentBackend>, String> {
    Err("built without MongoDB support".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;

    #[tokio::test]
    async fn test_local_mode() {
        let dir = tempfile::tempdir().unwrap();
        let backend = StorageBackend::connect(&StoreConfig::local(dir.path())).await;
        assert_eq!(backend.mode(), BackendMode::Local);
        assert_eq!(backend.primary().name(), "local");
        assert!(backend.read_fallback().is_none());
    }

    #[tokio::test]
    async fn test_auto_without_uri_falls_back_to_local() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = StoreConfig::local(dir.path());
        config.storage.mode = StorageMode::Auto;
        config.mongodb.uri = None;

        let backend = StorageBackend::connect(&config).await;
        assert_eq!(backend.mode(), BackendMode::Local);
    }

    #[tokio::test]
    async fn test_remote_without_uri_is_disconnected() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = StoreConfig::local(dir.path());
        config.storage.mode = StorageMode::Remote;
        config.mongodb.uri = Some(String::new());

        let backend = StorageBackend::connect(&config).await;
        assert_eq!(backend.mode(), BackendMode::Disconnected);
        assert_eq!(backend.primary().name(), "disconnected");
        assert_eq!(backend.read_fallback().map(|b| b.name()), Some("local"));
    }

    #[tokio::test]
    async fn test_remote_without_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = StoreConfig::local(dir.path());
        config.storage.mode = StorageMode::Remote;
        config.storage.read_fallback = false;

        let backend = StorageBackend::connect(&config).await;
        assert_eq!(backend.mode(), BackendMode::Disconnected);
        assert!(backend.read_fallback().is_none());
    }
}
