use std::fs;
use std::path::{Path, PathBuf};

use sivia_core::KnowledgeBase;

use crate::error::Result;

/// The knowledge base as a pretty-printed JSON object on disk.
#[derive(Clone, Debug)]
pub struct KnowledgeFile {
    path: PathBuf,
}

impl KnowledgeFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Persisted entries, or the built-in set when nothing is persisted yet.
    /// A file that exists but does not parse is an error, not a silent reset.
    pub fn load(&self) -> Result<KnowledgeBase> {
        if !self.exists() {
            tracing::debug!(path = %self.path.display(), "no knowledge file, using built-in entries");
            return Ok(KnowledgeBase::builtin());
        }
        let json = fs::read_to_string(&self.path)?;
        let kb = KnowledgeBase::from_json(&json)?;
        tracing::debug!(path = %self.path.display(), entries = kb.len(), "knowledge loaded");
        Ok(kb)
    }

    /// Write atomically: temp file in the same directory, then rename.
    pub fn save(&self, kb: &KnowledgeBase) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        let mut json = kb.to_json()?;
        json.push('\n');
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        tracing::info!(path = %self.path.display(), entries = kb.len(), "knowledge saved");
        Ok(())
    }

    /// Load, writing the built-in set first if the file is absent.
    pub fn load_or_init(&self) -> Result<KnowledgeBase> {
        if self.exists() {
            return self.load();
        }
        let kb = KnowledgeBase::builtin();
        self.save(&kb)?;
        Ok(kb)
    }
}
