//! Error types for loading, mapping, and composing policy results.

use std::path::PathBuf;

/// Result type alias using the crate's `Error` type.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures surfaced to callers. Shape mismatches inside a document are not
/// errors; they contribute zero normalized results.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Decision document is not valid JSON.
    #[error("failed to parse opa results for {file}: {source}")]
    Parse {
        file: String,
        #[source]
        source: serde_json::Error,
    },

    /// Decision document parsed but its top level is not a mapping.
    #[error("opa results for {file} are not a JSON object")]
    Shape { file: String },

    /// File or directory could not be read or written.
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Directory walk hit an unreadable entry.
    #[error("walk error: {0}")]
    Walk(#[from] glob::GlobError),

    /// Walk pattern could not be built from the results root.
    #[error("invalid results path pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    /// Configuration or catalog validation failed.
    #[error("configuration error: {0}")]
    Config(String),

    /// Catalog file could not be deserialized.
    #[error("invalid catalog {file}: {message}")]
    Catalog { file: String, message: String },

    /// External bundle compiler failed.
    #[error("bundle error: {0}")]
    Bundle(String),
}

impl Error {
    /// Wrap an I/O failure with the path it concerns.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a new configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
