//! Reader configuration
//!
//! One immutable record of the toggles the dataset reader understands.
//! Invalid combinations are rejected when the reader is constructed, not
//! at first use.

use crate::error::{ReaderError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReaderConfig {
    /// Use every SQL query with identical semantics, or just the first one.
    pub use_all_sql: bool,
    /// Keep duplicate (question, sql) pairs instead of deduplicating them.
    pub use_all_queries: bool,
    /// Use the pre-linked entities shipped with the text2sql data.
    /// This reader requires pre-linking; disabling it is a configuration error.
    pub use_prelinked_entities: bool,
    /// Keep examples the grammar cannot derive (with an empty gold sequence)
    /// instead of dropping them.
    pub keep_if_unparsable: bool,
    /// Cross-validation split to exclude, e.g. `Some(3)` skips any file whose
    /// name contains `split_3`.
    pub cross_validation_split_to_exclude: Option<u32>,
    /// Try to load instances from a per-file cache directory before processing.
    pub load_cache: bool,
    /// Write produced instances to the per-file cache directory.
    pub save_cache: bool,
    /// Stop after producing this many instances.
    pub loading_limit: Option<usize>,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            use_all_sql: false,
            use_all_queries: true,
            use_prelinked_entities: true,
            keep_if_unparsable: false,
            cross_validation_split_to_exclude: None,
            load_cache: false,
            save_cache: false,
            loading_limit: None,
        }
    }
}

impl ReaderConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.use_prelinked_entities {
            return Err(ReaderError::Config(
                "the grammar based text2sql dataset reader requires the use of entity pre-linking"
                    .to_string(),
            ));
        }
        if let Some(0) = self.loading_limit {
            return Err(ReaderError::Config(
                "loading_limit of 0 would produce no instances".to_string(),
            ));
        }
        Ok(())
    }
}
