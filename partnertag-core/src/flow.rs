//! Categorization flow: walks the partner backlog one commit at a time.
//!
//! The flow owns its batch, cursor and selection sub-state. Every operation
//! takes `&mut self`, so a flow never has two collaborator requests in flight.
//!
//! Single mode asks the selector after every commit. Batch mode keeps a cursor
//! into the current page and only asks again once the page is used up. Both
//! stop when the selector hands back an empty batch.

use std::collections::HashSet;

use anyhow::anyhow;
use tracing::{debug, info, warn};

use crate::assignment::CategorizationAssignment;
use crate::catalog::CategoryCatalog;
use crate::collaborators::{CategorizationRecorder, CategorySource, PartnerSelector};
use crate::error::{FlowError, FlowResult};
use crate::partner::{Partner, PartnerBatch, Progress};
use crate::selection::{SelectionState, SelectionStep};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowMode {
    /// One partner per selector call, no local buffering.
    Single,
    /// Pages of up to N partners stepped through locally.
    Batch(usize),
}

impl FlowMode {
    pub fn batch_size(&self) -> usize {
        match self {
            FlowMode::Single => 1,
            FlowMode::Batch(n) => *n,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowPhase {
    /// No partner loaded: not started yet, the last fetch failed, or the flow
    /// was left between pages. `refresh` fetches.
    AwaitingBatch,
    /// A partner is waiting for a category.
    Reviewing,
    /// The selector reported an empty backlog.
    Finished,
}

/// Where the flow went after a commit or a fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Next partner of the current page.
    NextInBatch,
    /// A fresh page was fetched.
    NewBatch,
    /// The backlog is exhausted.
    Finished,
}

#[derive(Debug)]
pub enum StepOutcome {
    /// Subcategories of `category` are now on offer.
    DrilledIn { category: String },
    /// The assignment was recorded and persisted.
    Committed {
        assignment: CategorizationAssignment,
        advance: Advance,
    },
    /// The assignment was recorded and persisted, but fetching the next page
    /// failed. The flow waits in `AwaitingBatch`; `refresh` retries the fetch.
    CommittedFetchFailed {
        assignment: CategorizationAssignment,
        error: FlowError,
    },
}

impl StepOutcome {
    /// The durable assignment, if this step committed one.
    pub fn assignment(&self) -> Option<&CategorizationAssignment> {
        match self {
            StepOutcome::DrilledIn { .. } => None,
            StepOutcome::Committed { assignment, .. }
            | StepOutcome::CommittedFetchFailed { assignment, .. } => Some(assignment),
        }
    }
}

pub struct CategorizationFlow<S, C, R> {
    selector: S,
    categories: C,
    recorder: R,
    mode: FlowMode,

    phase: FlowPhase,
    batch: Vec<Partner>,
    cursor: usize,
    progress: Progress,

    catalog: Option<CategoryCatalog>,
    catalog_attempted: bool,
    selection: SelectionState,

    /// Recorded but not yet persisted.
    recorded: Option<CategorizationAssignment>,
    /// `(name, is_expense)` of partners committed during this session.
    /// Expense and income sides of one name are separate backlog items.
    categorized: HashSet<(String, bool)>,
}

impl<S, C, R> CategorizationFlow<S, C, R>
where
    S: PartnerSelector,
    C: CategorySource,
    R: CategorizationRecorder,
{
    pub fn new(selector: S, categories: C, recorder: R, mode: FlowMode) -> FlowResult<Self> {
        let size = mode.batch_size();
        if size == 0 {
            return Err(FlowError::InvalidBatchSize(size));
        }
        Ok(Self::build(selector, categories, recorder, mode))
    }

    pub fn single(selector: S, categories: C, recorder: R) -> Self {
        Self::build(selector, categories, recorder, FlowMode::Single)
    }

    pub fn batched(selector: S, categories: C, recorder: R, size: usize) -> FlowResult<Self> {
        Self::new(selector, categories, recorder, FlowMode::Batch(size))
    }

    fn build(selector: S, categories: C, recorder: R, mode: FlowMode) -> Self {
        Self {
            selector,
            categories,
            recorder,
            mode,
            phase: FlowPhase::AwaitingBatch,
            batch: Vec::new(),
            cursor: 0,
            progress: Progress::default(),
            catalog: None,
            catalog_attempted: false,
            selection: SelectionState::Browsing,
            recorded: None,
            categorized: HashSet::new(),
        }
    }

    /// Fetch the first page of work, then the catalog if there is any work.
    ///
    /// A catalog failure is returned as `CatalogUnavailable` but leaves the
    /// flow reviewing partners in a degraded state.
    pub async fn start(&mut self) -> FlowResult<Advance> {
        let advance = self.fetch_batch().await?;
        self.ensure_catalog().await?;
        Ok(advance)
    }

    /// Retry the backlog fetch after `SelectionFailed`, or resume after `leave`.
    /// Does nothing while a partner is loaded or once finished.
    pub async fn refresh(&mut self) -> FlowResult<Advance> {
        match self.phase {
            FlowPhase::Reviewing => return Ok(Advance::NextInBatch),
            FlowPhase::Finished => return Ok(Advance::Finished),
            FlowPhase::AwaitingBatch => {}
        }
        let advance = self.fetch_batch().await?;
        self.ensure_catalog().await?;
        Ok(advance)
    }

    /// Fetch the catalog again after `CatalogUnavailable`. Always asks the
    /// source, whatever the phase.
    pub async fn reload_catalog(&mut self) -> FlowResult<()> {
        self.load_catalog().await
    }

    pub async fn select_category(&mut self, name: &str) -> FlowResult<StepOutcome> {
        self.require_partner()?;
        let Some(catalog) = self.catalog.as_ref() else {
            return Err(FlowError::catalog(anyhow!("category list is not loaded")));
        };

        match self.selection.choose_category(catalog, name)? {
            SelectionStep::DrilledIn { category } => {
                debug!(category = %category, "drilling into subcategories");
                Ok(StepOutcome::DrilledIn { category })
            }
            SelectionStep::Commit { .. } => self.commit().await,
        }
    }

    pub async fn select_subcategory(&mut self, name: &str) -> FlowResult<StepOutcome> {
        self.require_partner()?;
        let Some(catalog) = self.catalog.as_ref() else {
            return Err(FlowError::catalog(anyhow!("category list is not loaded")));
        };

        self.selection.choose_subcategory(catalog, name)?;
        self.commit().await
    }

    /// Return from the subcategory grid to the category grid.
    pub fn back(&mut self) -> FlowResult<()> {
        self.selection.back()
    }

    /// Retry a commit that failed in `record` or `persist`.
    pub async fn retry_commit(&mut self) -> FlowResult<StepOutcome> {
        if !self.selection.is_committing() {
            return Err(FlowError::InvalidSelection(
                "there is no pending categorization to retry".to_string(),
            ));
        }
        self.commit().await
    }

    /// Drop a commit that failed in `record`. Not allowed once the assignment
    /// reached the recorder: that one can only be persisted.
    pub fn cancel_commit(&mut self) -> FlowResult<()> {
        if self.recorded.is_some() {
            return Err(FlowError::CommitPending);
        }
        if self.selection.is_committing() {
            debug!("pending categorization cancelled");
            self.selection.reset();
        }
        Ok(())
    }

    /// Cede control to the host. A pending commit is flushed first; if that
    /// fails the error is returned and the commit stays queued for
    /// `retry_commit` or the next `leave`. Never calls the selector.
    pub async fn leave(&mut self) -> FlowResult<()> {
        if self.selection.is_committing() {
            self.flush_commit().await?;
            self.step_cursor();
        }
        info!(
            categorized = self.categorized.len(),
            phase = ?self.phase,
            "leaving categorization flow"
        );
        Ok(())
    }

    /// Forget which partners were categorized this session and start over.
    pub async fn reset_session(&mut self) -> FlowResult<Advance> {
        if self.selection.is_committing() {
            return Err(FlowError::CommitPending);
        }
        info!(forgotten = self.categorized.len(), "resetting categorization session");
        self.categorized.clear();
        self.batch.clear();
        self.cursor = 0;
        self.selection.reset();
        self.phase = FlowPhase::AwaitingBatch;
        self.refresh().await
    }

    pub fn mode(&self) -> FlowMode {
        self.mode
    }

    pub fn phase(&self) -> FlowPhase {
        self.phase
    }

    pub fn is_finished(&self) -> bool {
        self.phase == FlowPhase::Finished
    }

    pub fn current_partner(&self) -> Option<&Partner> {
        match self.phase {
            FlowPhase::Reviewing => self.batch.get(self.cursor),
            _ => None,
        }
    }

    /// 1-based position of the current partner within its page, and page length.
    pub fn position(&self) -> Option<(usize, usize)> {
        self.current_partner()
            .map(|_| (self.cursor + 1, self.batch.len()))
    }

    pub fn progress(&self) -> Progress {
        self.progress
    }

    pub fn catalog(&self) -> Option<&CategoryCatalog> {
        self.catalog.as_ref()
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn categorized_count(&self) -> usize {
        self.categorized.len()
    }

    fn require_partner(&self) -> FlowResult<&Partner> {
        if self.recorded.is_some() {
            return Err(FlowError::CommitPending);
        }
        self.current_partner().ok_or(FlowError::NoActivePartner)
    }

    async fn ensure_catalog(&mut self) -> FlowResult<()> {
        if self.catalog.is_some() || self.catalog_attempted || self.phase != FlowPhase::Reviewing {
            return Ok(());
        }
        self.load_catalog().await
    }

    async fn load_catalog(&mut self) -> FlowResult<()> {
        self.catalog_attempted = true;
        match self.categories.list().await {
            Ok(catalog) => {
                debug!(categories = catalog.len(), "category catalog loaded");
                self.catalog = Some(catalog);
                Ok(())
            }
            Err(e) => {
                warn!(error = %format!("{e:#}"), "category catalog unavailable; selection disabled");
                Err(FlowError::catalog(e))
            }
        }
    }

    async fn fetch_batch(&mut self) -> FlowResult<Advance> {
        let size = self.mode.batch_size();
        let batch = match self.selector.next_batch(size).await {
            Ok(batch) => batch,
            Err(e) => {
                self.phase = FlowPhase::AwaitingBatch;
                warn!(error = %format!("{e:#}"), "partner selection failed");
                return Err(FlowError::selection(e));
            }
        };

        let PartnerBatch { partners, progress } = batch;

        if partners.is_empty() {
            // The exhaustion sentinel may carry no counts; the backlog is
            // done, so everything seen so far is categorized.
            self.progress = if progress == Progress::default() && self.progress.total > 0 {
                Progress::new(self.progress.total, self.progress.total)
            } else {
                progress
            };
            self.batch.clear();
            self.cursor = 0;
            self.phase = FlowPhase::Finished;
            info!(progress = %self.progress, "backlog exhausted");
            return Ok(Advance::Finished);
        }

        self.progress = progress;
        let offered = partners.len();
        let admitted = self.admit(partners);
        if admitted.is_empty() {
            self.phase = FlowPhase::AwaitingBatch;
            warn!(offered, "selector only re-offered partners categorized this session");
            return Err(FlowError::selection(anyhow!(
                "selector re-offered {offered} partner(s) already categorized this session"
            )));
        }

        debug!(
            offered,
            admitted = admitted.len(),
            progress = %progress,
            "loaded partner batch"
        );
        self.batch = admitted;
        self.cursor = 0;
        self.phase = FlowPhase::Reviewing;
        Ok(Advance::NewBatch)
    }

    /// Drop partners already committed this session and in-batch duplicates.
    /// Order is left exactly as the selector gave it.
    fn admit(&self, partners: Vec<Partner>) -> Vec<Partner> {
        let mut seen = HashSet::new();
        partners
            .into_iter()
            .filter(|p| {
                let key = (p.name.clone(), p.is_expense);
                if self.categorized.contains(&key) {
                    warn!(partner = %p.name, "dropping partner re-offered after categorization");
                    return false;
                }
                if !seen.insert(key) {
                    warn!(partner = %p.name, "dropping duplicate partner within batch");
                    return false;
                }
                true
            })
            .collect()
    }

    async fn commit(&mut self) -> FlowResult<StepOutcome> {
        let assignment = self.flush_commit().await?;
        if !self.step_cursor() {
            return Ok(StepOutcome::Committed {
                assignment,
                advance: Advance::NextInBatch,
            });
        }
        match self.fetch_batch().await {
            Ok(advance) => Ok(StepOutcome::Committed { assignment, advance }),
            Err(error) => Ok(StepOutcome::CommittedFetchFailed { assignment, error }),
        }
    }

    /// Record (unless already recorded) and persist the pending choice.
    async fn flush_commit(&mut self) -> FlowResult<CategorizationAssignment> {
        let SelectionState::Committing {
            category,
            subcategory,
        } = &self.selection
        else {
            return Err(FlowError::InvalidSelection(
                "no categorization is being committed".to_string(),
            ));
        };
        let partner = self.batch.get(self.cursor).ok_or(FlowError::NoActivePartner)?;
        let assignment =
            CategorizationAssignment::new(partner, category.clone(), subcategory.clone());

        if self.recorded.is_none() {
            if let Err(e) = self.recorder.record(&assignment).await {
                warn!(partner = %assignment.partner, error = %format!("{e:#}"), "record failed");
                return Err(FlowError::RecordFailed {
                    partner: assignment.partner,
                    source: e,
                });
            }
            self.recorded = Some(assignment.clone());
        }

        if let Err(e) = self.recorder.persist().await {
            warn!(partner = %assignment.partner, error = %format!("{e:#}"), "persist failed");
            return Err(FlowError::PersistFailed {
                partner: assignment.partner,
                source: e,
            });
        }

        self.recorded = None;
        self.categorized
            .insert((assignment.partner.clone(), assignment.is_expense));
        self.selection.reset();
        info!(
            partner = %assignment.partner,
            label = %assignment.mapping_label(),
            "partner categorized"
        );
        Ok(assignment)
    }

    /// Move past the committed partner. Returns true when the page is used up
    /// and the selector must be asked again.
    fn step_cursor(&mut self) -> bool {
        self.cursor += 1;
        if self.cursor < self.batch.len() {
            return false;
        }
        self.batch.clear();
        self.cursor = 0;
        self.phase = FlowPhase::AwaitingBatch;
        true
    }
}
