//! Config loader (strict parsing).

pub mod schema;

use std::fs;
use std::path::Path;

use tagscope_core::error::{Result, TagScopeError};

pub use schema::{BucketsConfig, ReporterKind, ReporterSection, ScopeSection, TagScopeConfig};

pub fn load_from_file(path: impl AsRef<Path>) -> Result<TagScopeConfig> {
    let path = path.as_ref();
    let s = fs::read_to_string(path).map_err(|e| {
        TagScopeError::Internal(format!("read config failed ({}): {e}", path.display()))
    })?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<TagScopeConfig> {
    let cfg: TagScopeConfig = serde_yaml::from_str(s)
        .map_err(|e| TagScopeError::InvalidConfig(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
