//! Collaborator seams the workflow is driven against.
//!
//! Transport, storage and selection policy live behind these traits; real
//! adapters are in `partnertag-backend`. Implementations report failures as
//! `anyhow::Error` and the flow classifies them into `FlowError`.

use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

use crate::assignment::CategorizationAssignment;
use crate::catalog::CategoryCatalog;
use crate::partner::PartnerBatch;
use crate::statement::StatementSummary;

/// Chooses the next partner(s) needing a category.
///
/// Must return fewer than `size` partners only when fewer remain, and an empty
/// batch exactly when the backlog is exhausted. Order is backend policy.
#[async_trait]
pub trait PartnerSelector: Send + Sync {
    async fn next_batch(&self, size: usize) -> Result<PartnerBatch>;
}

/// Supplies the label taxonomy.
#[async_trait]
pub trait CategorySource: Send + Sync {
    async fn list(&self) -> Result<CategoryCatalog>;
}

/// Accepts assignments and flushes the accumulated mapping to durable storage.
#[async_trait]
pub trait CategorizationRecorder: Send + Sync {
    async fn record(&self, assignment: &CategorizationAssignment) -> Result<()>;

    async fn persist(&self) -> Result<()>;
}

/// Statement upload and insights. Used by the hosting application, not the flow.
#[async_trait]
pub trait StatementService: Send + Sync {
    async fn upload(&self, statement: &Path) -> Result<StatementSummary>;

    async fn insights(&self) -> Result<StatementSummary>;
}

#[async_trait]
impl<T: PartnerSelector + ?Sized> PartnerSelector for Arc<T> {
    async fn next_batch(&self, size: usize) -> Result<PartnerBatch> {
        (**self).next_batch(size).await
    }
}

#[async_trait]
impl<T: CategorySource + ?Sized> CategorySource for Arc<T> {
    async fn list(&self) -> Result<CategoryCatalog> {
        (**self).list().await
    }
}

#[async_trait]
impl<T: CategorizationRecorder + ?Sized> CategorizationRecorder for Arc<T> {
    async fn record(&self, assignment: &CategorizationAssignment) -> Result<()> {
        (**self).record(assignment).await
    }

    async fn persist(&self) -> Result<()> {
        (**self).persist().await
    }
}

#[async_trait]
impl<T: StatementService + ?Sized> StatementService for Arc<T> {
    async fn upload(&self, statement: &Path) -> Result<StatementSummary> {
        (**self).upload(statement).await
    }

    async fn insights(&self) -> Result<StatementSummary> {
        (**self).insights().await
    }
}
