//! Picks the collaborator adapters named by the config.

use anyhow::{Result, bail};
use partnertag_backend::{HttpBackend, LocalBackend, default_catalog, load_catalog_file};
use partnertag_core::{
    CategorizationRecorder, CategorySource, PartnerSelector, StatementService,
};
use std::sync::Arc;
use std::time::Duration;

use crate::config::{BackendKind, BackendSection};

pub enum Backend {
    Http(Arc<HttpBackend>),
    Local(Arc<LocalBackend>),
}

impl Backend {
    pub fn from_config(section: &BackendSection) -> Result<Self> {
        match section.kind {
            BackendKind::Http => {
                let http = HttpBackend::new(
                    section.base_url.clone(),
                    Duration::from_secs(section.timeout_secs),
                )?;
                Ok(Backend::Http(Arc::new(http)))
            }
            BackendKind::Local => {
                let catalog = match &section.catalog_file {
                    Some(path) => load_catalog_file(path)?,
                    None => default_catalog(),
                };
                let local =
                    LocalBackend::open(section.partners_file()?, &section.data_dir()?, catalog)?;
                Ok(Backend::Local(Arc::new(local)))
            }
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Backend::Http(b) => format!("http backend at {}", b.base_url()),
            Backend::Local(b) => format!("local backlog, mappings in {}", b.data_dir().display()),
        }
    }

    pub fn selector(&self) -> Arc<dyn PartnerSelector> {
        match self {
            Backend::Http(b) => b.clone(),
            Backend::Local(b) => b.clone(),
        }
    }

    pub fn categories(&self) -> Arc<dyn CategorySource> {
        match self {
            Backend::Http(b) => b.clone(),
            Backend::Local(b) => b.clone(),
        }
    }

    pub fn recorder(&self) -> Arc<dyn CategorizationRecorder> {
        match self {
            Backend::Http(b) => b.clone(),
            Backend::Local(b) => b.clone(),
        }
    }

    /// Upload and insights are served by the statement service only.
    pub fn statements(&self) -> Result<Arc<dyn StatementService>> {
        match self {
            Backend::Http(b) => Ok(b.clone()),
            Backend::Local(_) => bail!("statement upload and insights need the http backend"),
        }
    }
}
