//! partnertag-core: partner categorization workflow.
//!
//! Domain types, the category-selection state machine, the collaborator
//! traits and the flow that drives them. No I/O lives here.

pub mod assignment;
pub mod catalog;
pub mod collaborators;
pub mod error;
pub mod flow;
pub mod partner;
pub mod selection;
pub mod statement;

pub use assignment::CategorizationAssignment;
pub use catalog::{CatalogError, Category, CategoryCatalog};
pub use collaborators::{CategorizationRecorder, CategorySource, PartnerSelector, StatementService};
pub use error::{FlowError, FlowResult};
pub use flow::{Advance, CategorizationFlow, FlowMode, FlowPhase, StepOutcome};
pub use partner::{AmountStats, Partner, PartnerBatch, Progress};
pub use selection::{SelectionState, SelectionStep};
pub use statement::{StatementSummary, format_grouped};
