//! Error types for the kerb pipeline.

use thiserror::Error;

/// Unified error type for all kerb operations.
///
/// Anomalies fall into two families: validation-level problems are absorbed
/// at the call site with a default value and a warning, structural problems
/// are surfaced through one of these variants.
#[derive(Error, Debug)]
pub enum KerbError {
    /// Configuration validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Structural layer anomalies (duplicate keys, missing columns)
    #[error("Schema error in layer '{layer}': {message}")]
    Schema { layer: String, message: String },

    /// Structural subgraph anomalies (bad indices, malformed node tables)
    #[error("Graph error: {0}")]
    Graph(String),

    /// Cache read/write failures; always recoverable by rebuilding
    #[error("Cache error at {path}: {message}")]
    Cache { path: String, message: String },

    /// Tensor assembly errors (shape or column mismatches)
    #[error("Tensor error: {0}")]
    Tensor(String),

    /// Model dimension or numerical errors
    #[error("Model error: {0}")]
    Model(String),

    /// I/O errors (layer files, cache directories, output writing)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic errors (fallback)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl KerbError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        KerbError::Config(message.into())
    }

    /// Creates a schema error for a named layer.
    pub fn schema(layer: impl Into<String>, message: impl Into<String>) -> Self {
        KerbError::Schema {
            layer: layer.into(),
            message: message.into(),
        }
    }

    /// Creates a graph error.
    pub fn graph(message: impl Into<String>) -> Self {
        KerbError::Graph(message.into())
    }

    /// Creates a cache error for a path.
    pub fn cache(path: impl Into<String>, message: impl Into<String>) -> Self {
        KerbError::Cache {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a tensor error.
    pub fn tensor(message: impl Into<String>) -> Self {
        KerbError::Tensor(message.into())
    }

    /// Creates a model error.
    pub fn model(message: impl Into<String>) -> Self {
        KerbError::Model(message.into())
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        KerbError::Internal(message.into())
    }

    /// Checks if this error is recoverable within a run.
    ///
    /// Recoverable errors (cache problems) warrant a warning and a rebuild;
    /// everything else aborts the operation that produced it.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, KerbError::Cache { .. })
    }
}

/// Result type alias for kerb operations.
pub type Result<T> = std::result::Result<T, KerbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_constructors() {
        let config_err = KerbError::config("buffer_m must be positive");
        assert!(matches!(config_err, KerbError::Config(_)));

        let schema_err = KerbError::schema("neighborhoods", "duplicate lie_name 'Midtown'");
        assert!(matches!(schema_err, KerbError::Schema { .. }));

        let cache_err = KerbError::cache("kerb_cache/midtown.json", "truncated entry");
        assert!(matches!(cache_err, KerbError::Cache { .. }));
    }

    #[test]
    fn test_recoverable_errors() {
        let cache = KerbError::cache("kerb_cache/a.json", "permission denied");
        assert!(cache.is_recoverable());

        let tensor = KerbError::tensor("empty node table");
        assert!(!tensor.is_recoverable());

        let schema = KerbError::schema("roads", "missing class column");
        assert!(!schema.is_recoverable());
    }

    #[test]
    fn test_error_display() {
        let err = KerbError::schema("transit", "unknown class 'tram_stop'");
        assert_eq!(
            err.to_string(),
            "Schema error in layer 'transit': unknown class 'tram_stop'"
        );
    }
}
