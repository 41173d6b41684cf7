use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

/// `$PARTNERTAG_HOME`, or `~/.partnertag`.
pub fn partnertag_home() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("PARTNERTAG_HOME") {
        if !dir.trim().is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".partnertag"))
}

pub fn ensure_partnertag_home() -> Result<PathBuf> {
    let dir = partnertag_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

/// Where the local backend keeps its mapping tables unless configured otherwise.
pub fn default_data_dir() -> Result<PathBuf> {
    Ok(partnertag_home()?.join("data"))
}
