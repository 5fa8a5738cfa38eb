use thiserror::Error;

/// Errors surfaced by the document store.
///
/// Read operations never return these to their callers; they are logged and
/// converted to empty results. Write operations propagate them unchanged.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The remote backend is required for this operation but is not connected.
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// An update addressed an id that does not exist in the collection.
    #[error("Record not found: {collection}/{id}")]
    RecordNotFound { collection: String, id: String },

    /// Malformed arguments, such as a zero page size or an unknown collection.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The underlying file or remote write itself failed.
    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),
}

impl StoreError {
    pub fn not_found(collection: impl Into<String>, id: impl Into<String>) -> Self {
        StoreError::RecordNotFound {
            collection: collection.into(),
            id: id.into(),
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::PersistenceFailure(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::PersistenceFailure(format!("JSON error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message() {
        let err = StoreError::not_found("posts", "abc");
        assert_eq!(err.to_string(), "Record not found: posts/abc");
    }

    #[test]
    fn test_io_error_maps_to_persistence_failure() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        match StoreError::from(io) {
            StoreError::PersistenceFailure(msg) => assert!(msg.contains("denied")),
            other => panic!("Expected PersistenceFailure, got: {:?}", other),
        }
    }
}
