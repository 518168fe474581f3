use std::fs;
use std::path::Path;

use sivia_core::EngineConfig;

use crate::error::Result;

pub const API_KEY_ENV: &str = "GOOGLE_API_KEY";
pub const MODEL_ENV: &str = "GENAI_MODEL";

/// Parse `config.toml`. A missing file means all defaults.
pub fn load_file(path: &Path) -> Result<EngineConfig> {
    if !path.is_file() {
        return Ok(EngineConfig::default());
    }
    let raw = fs::read_to_string(path)?;
    let config = parse(&raw)?;
    tracing::debug!(path = %path.display(), "config loaded");
    Ok(config)
}

pub fn parse(raw: &str) -> Result<EngineConfig> {
    Ok(toml::from_str(raw)?)
}

/// Environment wins over the file. Blank values are ignored.
pub fn apply_env_overrides<F>(config: &mut EngineConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
    if let Some(key) = get(API_KEY_ENV) {
        config.model.api_key = Some(key.trim().to_string());
    }
    if let Some(model) = get(MODEL_ENV) {
        config.model.model = model.trim().to_string();
    }
}
