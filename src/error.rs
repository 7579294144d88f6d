use thiserror::Error;

/// Main error type for qrgraph
#[derive(Error, Debug)]
pub enum QrgraphError {
    /// Database-related errors outside of a traversal (migrations, audit, schema checks)
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// None of the requested seeds is a usable record identifier, or none survived detail fetch
    #[error("No seed identifiers resolved: {0}")]
    NoSeedsResolved(String),

    /// The record store failed while the graph was being built
    #[error("Data source error ({context}): {message}")]
    DataSource { context: String, message: String },

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Payload serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl QrgraphError {
    /// Wrap a store failure with the view/id it happened on.
    pub fn data_source(context: impl Into<String>, err: impl std::fmt::Display) -> Self {
        QrgraphError::DataSource {
            context: context.into(),
            message: err.to_string(),
        }
    }
}

/// Convenient Result type using QrgraphError
pub type Result<T> = std::result::Result<T, QrgraphError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = QrgraphError::Config("Test error".to_string());
        assert!(err.to_string().contains("Configuration error"));
        assert!(err.to_string().contains("Test error"));
    }

    #[test]
    fn test_error_from_rusqlite() {
        let rusqlite_err = rusqlite::Error::InvalidQuery;
        let err: QrgraphError = rusqlite_err.into();
        assert!(matches!(err, QrgraphError::Database(_)));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: QrgraphError = io_err.into();
        assert!(matches!(err, QrgraphError::Io(_)));
    }

    #[test]
    fn test_no_seeds_and_data_source_are_distinct() {
        let no_seeds = QrgraphError::NoSeedsResolved("all seeds invalid".to_string());
        let source = QrgraphError::data_source("v_nce id=100", rusqlite::Error::InvalidQuery);
        assert!(no_seeds.to_string().starts_with("No seed identifiers resolved"));
        assert!(source.to_string().starts_with("Data source error (v_nce id=100)"));
    }
}
