//! Persisted partner -> label tables.
//!
//! Expense and income partners are mapped separately, each table a flat JSON
//! object `{"<partner>": "<Category> - <Subcategory>"}` in the data directory.

use anyhow::{Context, Result};
use partnertag_core::CategorizationAssignment;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

pub const EXPENSE_MAPPING_FILE: &str = "expense_mapping.json";
pub const INCOME_MAPPING_FILE: &str = "income_mapping.json";

pub type MappingTable = BTreeMap<String, String>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MappingTables {
    pub expense: MappingTable,
    pub income: MappingTable,
}

impl MappingTables {
    pub fn table(&self, is_expense: bool) -> &MappingTable {
        if is_expense { &self.expense } else { &self.income }
    }

    pub fn is_mapped(&self, partner: &str, is_expense: bool) -> bool {
        self.table(is_expense).contains_key(partner)
    }

    pub fn label(&self, partner: &str, is_expense: bool) -> Option<&str> {
        self.table(is_expense).get(partner).map(String::as_str)
    }

    /// Insert or overwrite. Returns the previous label, if any.
    pub fn assign(&mut self, assignment: &CategorizationAssignment) -> Option<String> {
        let table = if assignment.is_expense {
            &mut self.expense
        } else {
            &mut self.income
        };
        table.insert(assignment.partner.clone(), assignment.mapping_label())
    }

    /// Distinct partner names present in either table.
    pub fn categorized_count(&self) -> usize {
        self.expense
            .keys()
            .chain(self.income.keys())
            .collect::<HashSet<_>>()
            .len()
    }
}

/// Mapping tables bound to a data directory.
#[derive(Debug, Clone)]
pub struct MappingStore {
    dir: PathBuf,
    tables: MappingTables,
}

impl MappingStore {
    /// Load both tables from `dir`. Missing files start empty.
    pub fn load(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        let tables = MappingTables {
            expense: read_table(&dir.join(EXPENSE_MAPPING_FILE))?,
            income: read_table(&dir.join(INCOME_MAPPING_FILE))?,
        };
        Ok(Self { dir, tables })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn tables(&self) -> &MappingTables {
        &self.tables
    }

    /// Write both tables, each through a temp file and rename.
    pub async fn save(dir: &Path, tables: &MappingTables) -> Result<()> {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("create {}", dir.display()))?;
        write_table(&dir.join(EXPENSE_MAPPING_FILE), &tables.expense).await?;
        write_table(&dir.join(INCOME_MAPPING_FILE), &tables.income).await?;
        Ok(())
    }
}

fn read_table(path: &Path) -> Result<MappingTable> {
    if !path.exists() {
        return Ok(MappingTable::new());
    }
    let s = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&s).with_context(|| format!("parse {}", path.display()))
}

async fn write_table(path: &Path, table: &MappingTable) -> Result<()> {
    let json = serde_json::to_string_pretty(table).context("serialize mapping")?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, json)
        .await
        .with_context(|| format!("write {}", tmp.display()))?;
    tokio::fs::rename(&tmp, path)
        .await
        .with_context(|| format!("rename {} -> {}", tmp.display(), path.display()))?;
    Ok(())
}
