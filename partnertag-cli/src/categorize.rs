//! Interactive categorization session on a line-based terminal.
//!
//! The driver renders the current partner and the category grid, reads one
//! line per action and feeds it to the flow. Errors are printed with a hint
//! and the session carries on; only a pending commit that cannot be flushed
//! when input closes ends the session with an error.

use anyhow::{Context, Result};
use chrono::{TimeDelta, Utc};
use partnertag_core::{
    Advance, CategorizationFlow, CategorizationRecorder, CategorySource, FlowError, FlowMode,
    FlowPhase, Partner, PartnerSelector, Progress, SelectionState, StepOutcome,
};
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use crate::backend::Backend;

const HELP: &str = "[number|name] select  [b] back  [r] retry  [c] cancel  [q] quit";

#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub categorized: usize,
    pub finished: bool,
    pub progress: Progress,
    pub elapsed: TimeDelta,
}

#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Pick(&'a str),
    Back,
    Retry,
    Cancel,
    Quit,
    Help,
    Empty,
}

fn parse_input(line: &str) -> Input<'_> {
    match line.trim() {
        "" => Input::Empty,
        "b" | "back" => Input::Back,
        "r" | "retry" => Input::Retry,
        "c" | "cancel" => Input::Cancel,
        "q" | "quit" => Input::Quit,
        "?" | "h" | "help" => Input::Help,
        other => Input::Pick(other),
    }
}

enum Target {
    Category(String),
    Subcategory(String),
}

/// 1-based index into `options`, or a case-insensitive name.
fn resolve<'a>(options: impl IntoIterator<Item = &'a str>, token: &str) -> Option<String> {
    let options: Vec<&str> = options.into_iter().collect();
    if let Ok(n) = token.parse::<usize>() {
        return n
            .checked_sub(1)
            .and_then(|i| options.get(i))
            .map(|s| s.to_string());
    }
    options
        .into_iter()
        .find(|o| o.eq_ignore_ascii_case(token))
        .map(str::to_string)
}

pub fn mode_for(batch_size: usize) -> FlowMode {
    if batch_size == 1 {
        FlowMode::Single
    } else {
        FlowMode::Batch(batch_size)
    }
}

/// Run a session against the configured backend on stdin/stdout.
pub async fn run_interactive(backend: &Backend, mode: FlowMode) -> Result<SessionSummary> {
    let mut flow = CategorizationFlow::new(
        backend.selector(),
        backend.categories(),
        backend.recorder(),
        mode,
    )?;
    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();
    drive(&mut flow, stdin, &mut stdout).await
}

pub async fn drive<S, C, R, I, W>(
    flow: &mut CategorizationFlow<S, C, R>,
    input: I,
    out: &mut W,
) -> Result<SessionSummary>
where
    S: PartnerSelector,
    C: CategorySource,
    R: CategorizationRecorder,
    I: AsyncBufRead + Unpin,
    W: Write,
{
    let started = Utc::now();
    let mut lines = input.lines();

    if let Err(e) = flow.start().await {
        report_error(out, &e)?;
    }

    let mut redraw = true;
    loop {
        if redraw {
            render(flow, out)?;
        }
        if flow.is_finished() {
            break;
        }
        redraw = true;

        write!(out, "> ")?;
        out.flush()?;
        let Some(line) = lines.next_line().await.context("read input")? else {
            writeln!(out)?;
            flow.leave()
                .await
                .context("input closed with a categorization still pending")?;
            break;
        };

        match parse_input(&line) {
            Input::Empty => redraw = false,
            Input::Help => {
                writeln!(out, "{HELP}")?;
                redraw = false;
            }
            Input::Quit => match flow.leave().await {
                Ok(()) => break,
                Err(e) => report_error(out, &e)?,
            },
            Input::Back => {
                if let Err(e) = flow.back() {
                    report_error(out, &e)?;
                }
            }
            Input::Cancel => match flow.cancel_commit() {
                Ok(()) => writeln!(out, "Cancelled.")?,
                Err(e) => report_error(out, &e)?,
            },
            Input::Retry => retry(flow, out).await?,
            Input::Pick(token) => {
                if !pick(flow, token, out).await? {
                    redraw = false;
                }
            }
        }
    }

    let elapsed = Utc::now() - started;
    let summary = SessionSummary {
        categorized: flow.categorized_count(),
        finished: flow.is_finished(),
        progress: flow.progress(),
        elapsed,
    };
    writeln!(
        out,
        "Categorized {} partner(s) in {}. Progress {}.",
        summary.categorized,
        format_elapsed(summary.elapsed),
        summary.progress
    )?;
    Ok(summary)
}

/// Returns false when the token matched nothing and the screen is unchanged.
async fn pick<S, C, R, W>(
    flow: &mut CategorizationFlow<S, C, R>,
    token: &str,
    out: &mut W,
) -> Result<bool>
where
    S: PartnerSelector,
    C: CategorySource,
    R: CategorizationRecorder,
    W: Write,
{
    let target = {
        let Some(catalog) = flow.catalog() else {
            writeln!(out, "Categories are not loaded. [r] reload")?;
            return Ok(false);
        };
        match flow.selection() {
            SelectionState::Browsing => {
                resolve(catalog.iter().map(|c| c.name.as_str()), token).map(Target::Category)
            }
            SelectionState::DrillingIn { category } => catalog
                .get(category)
                .and_then(|c| resolve(c.subcategories.iter().map(String::as_str), token))
                .map(Target::Subcategory),
            SelectionState::Committing { .. } => {
                writeln!(out, "A categorization is pending. [r] retry  [c] cancel")?;
                return Ok(false);
            }
        }
    };

    let outcome = match target {
        None => {
            writeln!(out, "Nothing matches '{token}'. Type a number or a name.")?;
            return Ok(false);
        }
        Some(Target::Category(name)) => flow.select_category(&name).await,
        Some(Target::Subcategory(name)) => flow.select_subcategory(&name).await,
    };
    match outcome {
        Ok(step) => report_step(out, &step)?,
        Err(e) => report_error(out, &e)?,
    }
    Ok(true)
}

async fn retry<S, C, R, W>(flow: &mut CategorizationFlow<S, C, R>, out: &mut W) -> Result<()>
where
    S: PartnerSelector,
    C: CategorySource,
    R: CategorizationRecorder,
    W: Write,
{
    let result = if flow.selection().is_committing() {
        flow.retry_commit().await.map(Some)
    } else if flow.phase() == FlowPhase::AwaitingBatch {
        flow.refresh().await.map(|_| None)
    } else if flow.catalog().is_none() {
        flow.reload_catalog().await.map(|_| None)
    } else {
        writeln!(out, "Nothing to retry.")?;
        return Ok(());
    };

    match result {
        Ok(Some(step)) => report_step(out, &step)?,
        Ok(None) => {}
        Err(e) => report_error(out, &e)?,
    }
    Ok(())
}

fn report_step<W: Write>(out: &mut W, step: &StepOutcome) -> std::io::Result<()> {
    let Some(assignment) = step.assignment() else {
        return Ok(());
    };
    writeln!(
        out,
        "Saved {} -> {}",
        assignment.partner,
        assignment.mapping_label()
    )?;
    match step {
        StepOutcome::Committed {
            advance: Advance::NewBatch,
            ..
        } => writeln!(out, "Loaded the next page of partners.")?,
        StepOutcome::CommittedFetchFailed { error, .. } => report_error(out, error)?,
        _ => {}
    }
    Ok(())
}

fn report_error<W: Write>(out: &mut W, err: &FlowError) -> std::io::Result<()> {
    writeln!(out, "error: {err}")?;
    let hint = match err {
        FlowError::SelectionFailed { .. } => Some("[r] retry fetching partners"),
        FlowError::CatalogUnavailable { .. } => Some("[r] reload categories"),
        FlowError::RecordFailed { .. } => Some("[r] retry  [c] cancel"),
        FlowError::PersistFailed { .. } | FlowError::CommitPending => Some("[r] retry saving"),
        _ => None,
    };
    if let Some(hint) = hint {
        writeln!(out, "  {hint}")?;
    }
    Ok(())
}

fn render<S, C, R, W>(flow: &CategorizationFlow<S, C, R>, out: &mut W) -> std::io::Result<()>
where
    S: PartnerSelector,
    C: CategorySource,
    R: CategorizationRecorder,
    W: Write,
{
    let progress = flow.progress();
    match flow.phase() {
        FlowPhase::Finished => {
            writeln!(out, "No more partners to categorize. ({progress} categorized)")
        }
        FlowPhase::AwaitingBatch => writeln!(out, "No partners loaded. [r] retry  [q] quit"),
        FlowPhase::Reviewing => {
            let Some(partner) = flow.current_partner() else {
                return Ok(());
            };
            writeln!(out)?;
            let page = flow
                .position()
                .filter(|(_, len)| *len > 1)
                .map(|(i, len)| format!("partner {i} of {len} on this page, "))
                .unwrap_or_default();
            writeln!(
                out,
                "== {page}{progress} categorized ({:.1}%) ==",
                progress.percent()
            )?;
            render_partner(partner, out)?;
            render_choices(flow, out)
        }
    }
}

fn render_partner<W: Write>(partner: &Partner, out: &mut W) -> std::io::Result<()> {
    writeln!(out, "{}  [{}]", partner.name, partner.kind_label())?;
    if partner.transaction_count > 0 {
        write!(out, "  {} transaction(s)", partner.transaction_count)?;
        if !partner.most_popular_info.is_empty() {
            write!(out, ", mostly \"{}\"", partner.most_popular_info)?;
        }
        writeln!(out)?;
    }
    if let Some(s) = partner.stats {
        writeln!(
            out,
            "  avg {:.2}  std {:.2}  min {:.2}  max {:.2}",
            s.avg, s.std, s.min, s.max
        )?;
    }
    if let Some(chart) = &partner.visualization {
        writeln!(out, "  amount chart attached ({} bytes)", chart.len())?;
    }
    Ok(())
}

fn render_choices<S, C, R, W>(
    flow: &CategorizationFlow<S, C, R>,
    out: &mut W,
) -> std::io::Result<()>
where
    S: PartnerSelector,
    C: CategorySource,
    R: CategorizationRecorder,
    W: Write,
{
    let Some(catalog) = flow.catalog() else {
        return writeln!(out, "Categories are unavailable. [r] reload  [q] quit");
    };
    match flow.selection() {
        SelectionState::Browsing => {
            for (i, c) in catalog.iter().enumerate() {
                let more = if c.is_terminal() { "" } else { " ..." };
                writeln!(out, "{:>3}. {} {}{more}", i + 1, c.glyph, c.name)?;
            }
        }
        SelectionState::DrillingIn { category } => {
            let glyph = catalog.get(category).map(|c| c.glyph.as_str()).unwrap_or("");
            writeln!(out, "{glyph} {category}")?;
            let subs = catalog
                .get(category)
                .map(|c| c.subcategories.as_slice())
                .unwrap_or_default();
            for (i, sub) in subs.iter().enumerate() {
                writeln!(out, "{:>3}. {sub}", i + 1)?;
            }
            writeln!(out, "  b. back to categories")?;
        }
        SelectionState::Committing {
            category,
            subcategory,
        } => {
            let label = subcategory.as_deref().unwrap_or(category);
            writeln!(
                out,
                "Pending: {category} - {label}. [r] retry  [c] cancel"
            )?;
        }
    }
    Ok(())
}

fn format_elapsed(d: TimeDelta) -> String {
    let secs = d.num_seconds().max(0);
    if secs >= 60 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{secs}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use partnertag_backend::{LocalBackend, MappingStore, default_catalog};
    use partnertag_core::PartnerBatch;
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    fn local(dir: &Path, partners: &[(&str, bool)]) -> Arc<LocalBackend> {
        let partners = partners
            .iter()
            .map(|(n, e)| Partner::new(*n, *e).with_transactions(3, "Card payment"))
            .collect();
        Arc::new(LocalBackend::new(
            partners,
            default_catalog(),
            MappingStore::load(dir).unwrap(),
        ))
    }

    #[test]
    fn test_parse_input() {
        assert_eq!(parse_input("  b "), Input::Back);
        assert_eq!(parse_input("q"), Input::Quit);
        assert_eq!(parse_input(""), Input::Empty);
        assert_eq!(parse_input("Food"), Input::Pick("Food"));
        assert_eq!(parse_input("14"), Input::Pick("14"));
    }

    #[test]
    fn test_resolve_by_number_or_name() {
        let options = ["Income", "Food"];
        assert_eq!(resolve(options, "2").as_deref(), Some("Food"));
        assert_eq!(resolve(options, "food").as_deref(), Some("Food"));
        assert_eq!(resolve(options, "0"), None);
        assert_eq!(resolve(options, "3"), None);
        assert_eq!(resolve(options, "Rent"), None);
    }

    #[test]
    fn test_mode_for_batch_size() {
        assert_eq!(mode_for(1), FlowMode::Single);
        assert_eq!(mode_for(10), FlowMode::Batch(10));
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(TimeDelta::seconds(42)), "42s");
        assert_eq!(format_elapsed(TimeDelta::seconds(125)), "2m 5s");
    }

    #[tokio::test]
    async fn test_session_categorizes_whole_backlog() {
        let dir = tempfile::tempdir().unwrap();
        let b = local(dir.path(), &[("Acme Corp", true), ("Employer", false)]);
        let mut flow = CategorizationFlow::single(b.clone(), b.clone(), b.clone());

        let input: &[u8] = b"Food\n2\nincome\n1\n";
        let mut out = Vec::new();
        let summary = drive(&mut flow, input, &mut out).await.unwrap();

        assert!(summary.finished);
        assert_eq!(summary.categorized, 2);
        assert_eq!(summary.progress, Progress::new(2, 2));

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Acme Corp  [Expense]"));
        assert!(text.contains("Saved Acme Corp -> Food - Restaurants & Cafes"));
        assert!(text.contains("Saved Employer -> Income - Salary"));
        assert!(text.contains("No more partners to categorize."));

        let stored = MappingStore::load(dir.path()).unwrap();
        assert_eq!(
            stored.tables().label("Acme Corp", true),
            Some("Food - Restaurants & Cafes")
        );
        assert_eq!(stored.tables().label("Employer", false), Some("Income - Salary"));
    }

    #[tokio::test]
    async fn test_terminal_category_by_number_in_batch_mode() {
        let dir = tempfile::tempdir().unwrap();
        let b = local(dir.path(), &[("A", true), ("B", true)]);
        let mut flow = CategorizationFlow::batched(b.clone(), b.clone(), b.clone(), 5).unwrap();

        let input: &[u8] = b"15\n15\n";
        let mut out = Vec::new();
        let summary = drive(&mut flow, input, &mut out).await.unwrap();

        assert!(summary.finished);
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("partner 1 of 2 on this page"));
        assert!(text.contains("Saved B -> Uncategorized Expenses - Uncategorized Expenses"));
    }

    #[tokio::test]
    async fn test_back_then_quit_leaves_backlog_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let b = local(dir.path(), &[("Acme Corp", true)]);
        let mut flow = CategorizationFlow::single(b.clone(), b.clone(), b.clone());

        let input: &[u8] = b"Food\nb\nnonsense\nq\n";
        let mut out = Vec::new();
        let summary = drive(&mut flow, input, &mut out).await.unwrap();

        assert!(!summary.finished);
        assert_eq!(summary.categorized, 0);
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("b. back to categories"));
        assert!(text.contains("Nothing matches 'nonsense'"));
        assert!(b.tables().unwrap().expense.is_empty());
    }

    #[tokio::test]
    async fn test_same_name_on_both_sides_is_categorized_twice() {
        let dir = tempfile::tempdir().unwrap();
        let b = local(dir.path(), &[("Friend", true), ("Friend", false)]);
        let mut flow = CategorizationFlow::single(b.clone(), b.clone(), b.clone());

        let input: &[u8] = b"15\nincome\n1\n";
        let mut out = Vec::new();
        let summary = drive(&mut flow, input, &mut out).await.unwrap();

        assert!(summary.finished);
        assert_eq!(summary.categorized, 2);
        let tables = b.tables().unwrap();
        assert_eq!(
            tables.label("Friend", true),
            Some("Uncategorized Expenses - Uncategorized Expenses")
        );
        assert_eq!(tables.label("Friend", false), Some("Income - Salary"));
    }

    /// Serves the local backlog but fails the `n`th fetch.
    struct FailingFetch {
        inner: Arc<LocalBackend>,
        fail_on: usize,
        calls: Mutex<usize>,
    }

    #[async_trait]
    impl PartnerSelector for FailingFetch {
        async fn next_batch(&self, size: usize) -> anyhow::Result<PartnerBatch> {
            let call = {
                let mut calls = self.calls.lock().unwrap();
                *calls += 1;
                *calls
            };
            if call == self.fail_on {
                anyhow::bail!("connection reset");
            }
            self.inner.next_batch(size).await
        }
    }

    #[tokio::test]
    async fn test_saved_commit_is_reported_when_next_fetch_fails() {
        let dir = tempfile::tempdir().unwrap();
        let b = local(dir.path(), &[("Acme Corp", true), ("Bolt", true)]);
        let selector = FailingFetch {
            inner: b.clone(),
            fail_on: 2,
            calls: Mutex::new(0),
        };
        let mut flow = CategorizationFlow::single(selector, b.clone(), b.clone());

        let input: &[u8] = b"15\nr\n15\n";
        let mut out = Vec::new();
        let summary = drive(&mut flow, input, &mut out).await.unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Saved Acme Corp -> Uncategorized Expenses"));
        assert!(text.contains("error: could not fetch partners: connection reset"));
        assert!(text.contains("Saved Bolt -> Uncategorized Expenses"));
        assert!(summary.finished);
        assert_eq!(summary.categorized, 2);
    }

    #[tokio::test]
    async fn test_closed_input_ends_session() {
        let dir = tempfile::tempdir().unwrap();
        let b = local(dir.path(), &[("Acme Corp", true)]);
        let mut flow = CategorizationFlow::single(b.clone(), b.clone(), b.clone());

        let input: &[u8] = b"";
        let mut out = Vec::new();
        let summary = drive(&mut flow, input, &mut out).await.unwrap();
        assert!(!summary.finished);
        assert_eq!(flow.current_partner().unwrap().name, "Acme Corp");
    }

    #[tokio::test]
    async fn test_empty_backlog_finishes_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let b = local(dir.path(), &[]);
        let mut flow = CategorizationFlow::single(b.clone(), b.clone(), b.clone());

        let input: &[u8] = b"";
        let mut out = Vec::new();
        let summary = drive(&mut flow, input, &mut out).await.unwrap();
        assert!(summary.finished);
        assert!(String::from_utf8(out).unwrap().contains("No more partners"));
    }
}
