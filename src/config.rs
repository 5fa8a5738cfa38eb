use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// How the storage backend is chosen at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageMode {
    /// Local JSON files only.
    Local,
    /// MongoDB is required; if it cannot be reached, writes fail.
    Remote,
    /// MongoDB when reachable at startup, local JSON files otherwise.
    #[default]
    Auto,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageSection {
    #[serde(default)]
    pub mode: StorageMode,
    /// Directory holding the local JSON collection files.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Serve reads from the local files when the remote read fails.
    #[serde(default = "default_true")]
    pub read_fallback: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MongoSection {
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Store configuration.
///
/// Sources, later ones overriding earlier ones: built-in defaults, an
/// optional TOML file, `BLOGDECK__SECTION__KEY` environment variables, then
/// `MONGODB_URI` / `MONGODB_DATABASE`.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    pub storage: StorageSection,
    pub mongodb: MongoSection,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_true() -> bool {
    true
}

fn default_database() -> String {
    "blogdeck".to_string()
}

fn default_timeout_secs() -> u64 {
    5
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            storage: StorageSection {
                mode: StorageMode::default(),
                data_dir: default_data_dir(),
                read_fallback: true,
            },
            mongodb: MongoSection {
                uri: None,
                database: default_database(),
                timeout_secs: default_timeout_secs(),
            },
        }
    }
}

impl StoreConfig {
    pub const DEFAULT_FILE: &'static str = "blogdeck.toml";

    /// Load from `path` (which must exist) or, when `None`, from
    /// `blogdeck.toml` in the working directory if present.
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name(Self::DEFAULT_FILE).required(false),
        };

        let mut builder = config::Config::builder()
            .set_default("storage.mode", "auto")?
            .set_default("storage.data_dir", "data")?
            .set_default("storage.read_fallback", true)?
            .set_default("mongodb.database", default_database())?
            .set_default("mongodb.timeout_secs", default_timeout_secs() as i64)?
            .add_source(file)
            .add_source(
                config::Environment::with_prefix("BLOGDECK")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );

        if let Ok(uri) = std::env::var("MONGODB_URI") {
            builder = builder.set_override("mongodb.uri", uri)?;
        }
        if let Ok(database) = std::env::var("MONGODB_DATABASE") {
            builder = builder.set_override("mongodb.database", database)?;
        }

        builder.build()?.try_deserialize()
    }

    pub fn local(data_dir: impl Into<PathBuf>) -> Self {
        let mut config = Self::default();
        config.storage.mode = StorageMode::Local;
        config.storage.data_dir = data_dir.into();
        config
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.mongodb.timeout_secs.max(1))
    }
}
