use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("migration of table '{table}' failed: {message}")]
    Migration { table: String, message: String },

    #[error("cleanup incomplete: {}", .0.join("; "))]
    PartialCleanup(Vec<String>),

    #[error("vetoed by hook: {0}")]
    Vetoed(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("artifact storage error: {0}")]
    Artifact(#[from] crate::artifacts::ArtifactStorageError),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn migration(table: &str, err: impl std::fmt::Display) -> Self {
        Self::Migration {
            table: table.to_string(),
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
