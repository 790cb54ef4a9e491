//! Error types for keypath-index

use std::fmt;
use thiserror::Error;

use crate::config::ConfigError;

/// Index error kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A keypath did not resolve against a document
    FieldResolution,
    /// The store rejected an atomic batch
    StoreWrite,
    /// The store failed a point lookup or scan
    StoreLookup,
    /// Serialization/deserialization errors
    Serialization,
    /// Configuration errors
    Config,
    /// I/O errors
    IO,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::FieldResolution => "field_resolution",
            ErrorKind::StoreWrite => "store_write",
            ErrorKind::StoreLookup => "store_lookup",
            ErrorKind::Serialization => "serialization",
            ErrorKind::Config => "config",
            ErrorKind::IO => "io",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Index error type
#[derive(Debug, Error)]
#[error("[{kind}] {message}")]
pub struct IndexError {
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
    pub kind: ErrorKind,
    pub message: String,
}

impl IndexError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    // Convenience constructors
    pub fn field_resolution(keypath: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::FieldResolution,
            format!("Keypath did not resolve: {}", keypath.into()),
        )
    }

    pub fn store_write(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::StoreWrite, message)
    }

    pub fn store_lookup(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::StoreLookup, message)
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Serialization, message)
    }

    /// True for failures raised by the underlying store
    pub fn is_store_error(&self) -> bool {
        matches!(self.kind, ErrorKind::StoreWrite | ErrorKind::StoreLookup)
    }
}

// JSON error conversions
impl From<serde_json::Error> for IndexError {
    fn from(err: serde_json::Error) -> Self {
        IndexError::serialization(format!("JSON error: {}", err)).with_source(err)
    }
}

impl From<ConfigError> for IndexError {
    fn from(err: ConfigError) -> Self {
        let kind = match err {
            ConfigError::Io(_) => ErrorKind::IO,
            _ => ErrorKind::Config,
        };
        IndexError::new(kind, err.to_string()).with_source(err)
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, IndexError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    // ═══════════════════════════════════════════════════════════════════════
    // Error Construction Tests
    // ═══════════════════════════════════════════════════════════════════════

    #[test]
    fn test_error_display() {
        let err = IndexError::field_resolution("value.email");
        let msg = format!("{}", err);
        assert!(msg.contains("field_resolution"));
        assert!(msg.contains("value.email"));
    }

    #[test]
    fn test_store_write_error() {
        let err = IndexError::store_write("batch rejected");
        assert_eq!(err.kind, ErrorKind::StoreWrite);
        assert_eq!(err.message, "batch rejected");
        assert!(err.source.is_none());
        assert!(err.is_store_error());

        assert_eq!(format!("{}", err), "[store_write] batch rejected");
    }

    #[test]
    fn test_store_lookup_error() {
        let err = IndexError::store_lookup("disk unavailable");
        assert_eq!(err.kind, ErrorKind::StoreLookup);
        assert!(err.is_store_error());
        assert_eq!(format!("{}", err), "[store_lookup] disk unavailable");
    }

    #[test]
    fn test_serialization_error_is_not_store_error() {
        let err = IndexError::serialization("Invalid JSON");
        assert_eq!(err.kind, ErrorKind::Serialization);
        assert!(!err.is_store_error());
    }

    #[test]
    fn test_with_source() {
        use std::io;

        let io_err = io::Error::new(io::ErrorKind::NotFound, "sst missing");
        let err = IndexError::store_lookup("get failed").with_source(io_err);

        assert!(err.source.is_some());
        let source = err.source().unwrap();
        assert!(source.to_string().contains("sst missing"));
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Conversion Tests
    // ═══════════════════════════════════════════════════════════════════════

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json")
            .err()
            .unwrap();
        let err: IndexError = json_err.into();

        assert_eq!(err.kind, ErrorKind::Serialization);
        assert!(err.message.contains("JSON error"));
        assert!(err.source.is_some());
    }

    #[test]
    fn test_from_config_error() {
        let err: IndexError = ConfigError::MissingVersion.into();
        assert_eq!(err.kind, ErrorKind::Config);

        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: IndexError = ConfigError::Io(io).into();
        assert_eq!(err.kind, ErrorKind::IO);
    }

    #[test]
    fn test_error_kind_as_str() {
        assert_eq!(ErrorKind::FieldResolution.as_str(), "field_resolution");
        assert_eq!(ErrorKind::StoreWrite.as_str(), "store_write");
        assert_eq!(ErrorKind::StoreLookup.as_str(), "store_lookup");
        assert_eq!(ErrorKind::Serialization.as_str(), "serialization");
        assert_eq!(ErrorKind::Config.as_str(), "config");
        assert_eq!(ErrorKind::IO.as_str(), "io");
    }
}
