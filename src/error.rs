use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReaderError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("Invalid span ({start}, {end}) over {source_length} tokens")]
    InvalidSpan {
        start: usize,
        end: usize,
        source_length: usize,
    },

    #[error("Malformed production rule: {0}")]
    MalformedRule(String),

    #[error("Action missing from the catalog: {0}")]
    UnknownAction(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, ReaderError>;
