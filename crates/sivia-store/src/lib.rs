//! On-disk state for SIVIA: the knowledge-base file, `config.toml` and the
//! data-directory layout that holds them.

pub mod config;
pub mod data_dir;
pub mod error;
pub mod knowledge;

pub use data_dir::{DATA_DIR_ENV, DataDir, default_base_dir};
pub use error::{Result, StoreError};
pub use knowledge::KnowledgeFile;
