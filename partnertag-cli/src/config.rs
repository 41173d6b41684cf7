use anyhow::{Context, Result, bail};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::state::{default_data_dir, ensure_partnertag_home};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendSection,
    #[serde(default)]
    pub flow: FlowSection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Statement service over HTTP.
    Http,
    /// Partner file plus mapping tables on disk.
    Local,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSection {
    pub kind: BackendKind,
    pub base_url: String,
    pub timeout_secs: u64,
    /// For kind = "local": JSON array of partners in the `/get_next_partners` shape.
    pub partners_file: Option<PathBuf>,
    /// For kind = "local": where expense/income mapping tables live.
    pub data_dir: Option<PathBuf>,
    /// For kind = "local": catalog JSON; the built-in catalog when unset.
    pub catalog_file: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowSection {
    /// 1 walks partners one by one; larger values page through the backlog.
    pub batch_size: usize,
}

impl Default for BackendSection {
    fn default() -> Self {
        Self {
            kind: BackendKind::Http,
            base_url: partnertag_backend::DEFAULT_BASE_URL.to_string(),
            timeout_secs: 30,
            partners_file: None,
            data_dir: None,
            catalog_file: None,
        }
    }
}

impl Default for FlowSection {
    fn default() -> Self {
        Self { batch_size: 1 }
    }
}

impl BackendSection {
    pub fn data_dir(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => default_data_dir(),
        }
    }

    pub fn partners_file(&self) -> Result<&Path> {
        match &self.partners_file {
            Some(p) => Ok(p.as_path()),
            None => bail!(
                "local backend needs a partners file: set backend.partners_file or pass --partners"
            ),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_partnertag_home()?.join("config.toml"))
}

pub fn load_config() -> Result<Config> {
    let p = config_path()?;
    load_config_from(&p)
}

pub fn load_config_from(p: &Path) -> Result<Config> {
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(p).with_context(|| format!("read {}", p.display()))?;
    toml::from_str(&s).with_context(|| format!("parse {}", p.display()))
}

pub fn save_config(cfg: &Config) -> Result<()> {
    let p = config_path()?;
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(&p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

pub fn init_config() -> Result<()> {
    let p = config_path()?;
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    save_config(&Config::default())?;
    println!("Wrote {}", p.display());
    Ok(())
}
