use std::path::{Path, PathBuf};
use std::{env, fs};

use crate::config;
use crate::error::{Result, StoreError};
use crate::knowledge::KnowledgeFile;

pub const DATA_DIR_ENV: &str = "SIVIA_DATA_DIR";
pub const KNOWLEDGE_FILE: &str = "knowledge.json";
pub const CONFIG_FILE: &str = "config.toml";

/// `$SIVIA_DATA_DIR`, else `~/.sivia`.
pub fn default_base_dir() -> PathBuf {
    env::var_os(DATA_DIR_ENV)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| dirs_home().join(".sivia"))
}

fn dirs_home() -> PathBuf {
    env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

/// Everything SIVIA keeps on disk.
///
/// Layout:
/// ```text
/// ~/.sivia/
/// ├── config.toml      (optional, user-written)
/// └── knowledge.json
/// ```
#[derive(Clone, Debug)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    /// Open the directory, creating it if needed.
    /// `base_dir` overrides the default location (flags, tests).
    pub fn open(base_dir: Option<&Path>) -> Result<Self> {
        let root = base_dir.map(PathBuf::from).unwrap_or_else(default_base_dir);
        fs::create_dir_all(&root).map_err(|e| {
            StoreError::InvalidData(format!("failed to create {}: {e}", root.display()))
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn knowledge_path(&self) -> PathBuf {
        self.root.join(KNOWLEDGE_FILE)
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    pub fn knowledge(&self) -> KnowledgeFile {
        KnowledgeFile::new(self.knowledge_path())
    }

    /// `config.toml` (if any) with environment overrides applied.
    pub fn load_config(&self) -> Result<sivia_core::EngineConfig> {
        let mut config = config::load_file(&self.config_path())?;
        config::apply_env_overrides(&mut config, |key| env::var(key).ok());
        Ok(config)
    }
}
