//! In-process backend over a pre-aggregated partner file.
//!
//! Partners are read from a JSON array in the `/get_next_partners` shape and
//! served in file order, skipping any partner already present in the mapping
//! table for its polarity. Assignments land in memory on `record` and reach
//! disk on `persist`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use partnertag_core::{
    CategorizationAssignment, CategorizationRecorder, CategoryCatalog, CategorySource, Partner,
    PartnerBatch, PartnerSelector, Progress,
};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info};

use crate::mapping::{MappingStore, MappingTables};
use crate::wire::PartnerPayload;

pub struct LocalBackend {
    partners: Vec<Partner>,
    distinct: usize,
    catalog: CategoryCatalog,
    data_dir: PathBuf,
    tables: Mutex<MappingTables>,
}

impl LocalBackend {
    pub fn new(partners: Vec<Partner>, catalog: CategoryCatalog, store: MappingStore) -> Self {
        let distinct = partners
            .iter()
            .map(|p| p.name.as_str())
            .collect::<HashSet<_>>()
            .len();
        Self {
            partners,
            distinct,
            catalog,
            data_dir: store.dir().to_path_buf(),
            tables: Mutex::new(store.tables().clone()),
        }
    }

    /// Load partners from `partners_file` and mappings from `data_dir`.
    pub fn open(partners_file: &Path, data_dir: &Path, catalog: CategoryCatalog) -> Result<Self> {
        let partners = load_partners(partners_file)?;
        let store = MappingStore::load(data_dir)?;
        info!(
            partners = partners.len(),
            data_dir = %data_dir.display(),
            "opened local backlog"
        );
        Ok(Self::new(partners, catalog, store))
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Snapshot of the in-memory tables, including unpersisted records.
    pub fn tables(&self) -> Result<MappingTables> {
        Ok(self.lock()?.clone())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MappingTables>> {
        self.tables
            .lock()
            .map_err(|_| anyhow::anyhow!("mapping tables lock poisoned"))
    }
}

pub fn load_partners(path: &Path) -> Result<Vec<Partner>> {
    let s = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let payloads: Vec<PartnerPayload> =
        serde_json::from_str(&s).with_context(|| format!("parse {}", path.display()))?;
    Ok(payloads.into_iter().map(PartnerPayload::into_partner).collect())
}

#[async_trait]
impl PartnerSelector for LocalBackend {
    async fn next_batch(&self, size: usize) -> Result<PartnerBatch> {
        let tables = self.lock()?;
        let progress = Progress::new(tables.categorized_count() as u64, self.distinct as u64);

        let mut seen = HashSet::new();
        let partners: Vec<Partner> = self
            .partners
            .iter()
            .filter(|p| !tables.is_mapped(&p.name, p.is_expense))
            .filter(|p| seen.insert(p.name.as_str()))
            .take(size)
            .cloned()
            .collect();

        debug!(size, served = partners.len(), progress = %progress, "local next batch");
        Ok(PartnerBatch::new(partners, progress))
    }
}

#[async_trait]
impl CategorySource for LocalBackend {
    async fn list(&self) -> Result<CategoryCatalog> {
        Ok(self.catalog.clone())
    }
}

#[async_trait]
impl CategorizationRecorder for LocalBackend {
    async fn record(&self, assignment: &CategorizationAssignment) -> Result<()> {
        let previous = self.lock()?.assign(assignment);
        match previous {
            Some(prev) => debug!(
                partner = %assignment.partner,
                previous = %prev,
                "overwriting existing mapping"
            ),
            None => debug!(partner = %assignment.partner, "mapping recorded"),
        }
        Ok(())
    }

    async fn persist(&self) -> Result<()> {
        let snapshot = self.lock()?.clone();
        MappingStore::save(&self.data_dir, &snapshot).await?;
        debug!(dir = %self.data_dir.display(), "mapping tables persisted");
        Ok(())
    }
}
