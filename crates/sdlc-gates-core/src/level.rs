//! Current workflow level of a project.
//!
//! Layout:
//!   .sdlc/level.json   `{ "level": "production", "set_date": "..." }`

use crate::config::{GatesConfig, DEFAULT_LEVEL};
use crate::error::Result;
use crate::io;
use crate::paths;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelFile {
    pub level: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set_date: Option<String>,
}

/// The project's selected level, or the default when none was ever set.
pub fn current_level(root: &Path) -> Result<String> {
    let Some(data) = io::read_if_exists(&paths::level_path(root))? else {
        return Ok(DEFAULT_LEVEL.to_string());
    };
    let file: LevelFile = serde_json::from_str(&data)?;
    Ok(file.level)
}

/// Persist `level` after checking the configuration knows it.
pub fn set_level(root: &Path, config: &GatesConfig, level: &str) -> Result<LevelFile> {
    config.validate_level(level)?;
    let file = LevelFile {
        level: level.to_string(),
        set_date: Some(Utc::now().to_rfc3339()),
    };
    let data = serde_json::to_string_pretty(&file)?;
    io::atomic_write(&paths::level_path(root), data.as_bytes())?;
    Ok(file)
}
