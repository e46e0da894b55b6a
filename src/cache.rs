//! Per-file instance cache
//!
//! Instance assembly is deterministic, so processed instances can be reused
//! across runs. The cache wraps the read loop from the outside; it never
//! participates in instance assembly itself. Only parsable examples are
//! written, mirroring what processing would produce.

use crate::error::Result;
use crate::instance::Instance;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub struct InstanceCache {
    directory: PathBuf,
}

impl InstanceCache {
    /// Cache directory for one dataset file: a `spans_grammar_cache_<stem>`
    /// sibling of the file. `data/geography/train.json` caches in
    /// `data/geography/spans_grammar_cache_train/`.
    pub fn for_dataset_file(dataset_file: &Path) -> Self {
        let stem = dataset_file
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        let directory = dataset_file
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(format!("spans_grammar_cache_{stem}"));
        Self { directory }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn exists(&self) -> bool {
        self.directory.is_dir()
    }

    pub fn create(&self) -> Result<()> {
        fs::create_dir_all(&self.directory)?;
        Ok(())
    }

    fn entry_path(&self, example_index: usize) -> PathBuf {
        self.directory.join(format!("instance-{example_index}.json"))
    }

    /// Load the cached instance for one example, or `None` when the entry
    /// is missing or unreadable (the caller then processes the example
    /// normally).
    pub fn load(&self, example_index: usize) -> Option<Instance> {
        let path = self.entry_path(example_index);
        let contents = fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&contents) {
            Ok(instance) => Some(instance),
            Err(e) => {
                debug!("ignoring unreadable cache entry {}: {e}", path.display());
                None
            }
        }
    }

    pub fn store(&self, example_index: usize, instance: &Instance) -> Result<()> {
        let path = self.entry_path(example_index);
        fs::write(&path, serde_json::to_string(instance)?)?;
        Ok(())
    }

    pub fn announce_load(&self) {
        info!("trying to load cache from {}", self.directory.display());
    }
}
