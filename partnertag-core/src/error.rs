//! Error taxonomy of the categorization workflow.
//!
//! Every variant is locally recoverable: the caller reports it and retries the
//! triggering action. Nothing here is fatal to the process.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FlowError {
    /// Backlog fetch failed. Retry with `refresh`.
    #[error("could not fetch partners: {source:#}")]
    SelectionFailed {
        #[source]
        source: anyhow::Error,
    },

    /// Category list failed or was malformed. Partners stay visible,
    /// category selection is disabled until `reload_catalog` succeeds.
    #[error("category catalog unavailable: {source:#}")]
    CatalogUnavailable {
        #[source]
        source: anyhow::Error,
    },

    /// Assignment write failed. The commit stays pending; retry it.
    #[error("could not record '{partner}': {source:#}")]
    RecordFailed {
        partner: String,
        #[source]
        source: anyhow::Error,
    },

    /// Assignment was recorded but the mapping flush failed. Durable storage
    /// may lag the recorder until persist is retried.
    #[error("recorded '{partner}' but could not persist the mapping: {source:#}")]
    PersistFailed {
        partner: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("invalid selection: {0}")]
    InvalidSelection(String),

    #[error("no partner is waiting for a category")]
    NoActivePartner,

    #[error("a categorization is still pending; retry it first")]
    CommitPending,

    #[error("batch size must be at least 1, got {0}")]
    InvalidBatchSize(usize),
}

impl FlowError {
    pub fn selection(source: impl Into<anyhow::Error>) -> Self {
        Self::SelectionFailed {
            source: source.into(),
        }
    }

    pub fn catalog(source: impl Into<anyhow::Error>) -> Self {
        Self::CatalogUnavailable {
            source: source.into(),
        }
    }

    /// True for failures of a collaborator call, as opposed to misuse of the
    /// state machine.
    pub fn is_collaborator_failure(&self) -> bool {
        matches!(
            self,
            FlowError::SelectionFailed { .. }
                | FlowError::CatalogUnavailable { .. }
                | FlowError::RecordFailed { .. }
                | FlowError::PersistFailed { .. }
        )
    }
}

pub type FlowResult<T> = std::result::Result<T, FlowError>;
