//! Sheet-wide generation.
//!
//! Rows are processed one after another with one settings snapshot. A failing row is
//! recorded and skipped; cancellation is checked between rows, so every file already
//! written stays complete.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::credential::{CredentialPolicy, WifiCredential};
use crate::error::RowError;
use crate::logo::{LogoStatus, LogoWarning};
use crate::pipeline::{CaptionChoice, CompositionRequest, QrPipeline};
use crate::precedence::RowResolver;
use crate::property::PropertyTable;
use crate::sheet::SheetRow;
use crate::store::SourceConfigEntry;

/// Outcome of one row.
#[derive(Debug)]
pub enum RowStatus {
    Generated {
        path: PathBuf,
        logo_warning: Option<LogoWarning>,
    },
    Failed(RowError),
}

#[derive(Debug)]
pub struct RowOutcome {
    /// 1-based spreadsheet row.
    pub row: usize,
    pub room: Option<String>,
    pub status: RowStatus,
}

impl RowOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.status, RowStatus::Generated { .. })
    }
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<RowOutcome>,
    /// Rows never attempted because of cancellation.
    pub skipped: usize,
    pub cancelled: bool,
}

impl BatchReport {
    pub fn generated(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.generated()
    }
}

/// Shared inputs of a batch run.
pub struct BatchContext<'a> {
    pub pipeline: &'a QrPipeline,
    pub properties: &'a PropertyTable,
    pub policy: CredentialPolicy,
    pub output_dir: &'a Path,
    pub caption: CaptionChoice,
}

/// Generates one code per row with the sheet's settings entry.
///
/// `cancel` is polled before each row.
pub fn run_batch<'r>(
    ctx: &BatchContext<'_>,
    entry: &SourceConfigEntry,
    rows: impl IntoIterator<Item = &'r SheetRow>,
    cancel: &AtomicBool,
) -> BatchReport {
    let resolver = RowResolver::new(entry);
    let mut report = BatchReport::default();
    let mut rows = rows.into_iter();

    for row in rows.by_ref() {
        if cancel.load(Ordering::Relaxed) {
            report.cancelled = true;
            report.skipped += 1;
            break;
        }
        let outcome = process_row(ctx, &resolver, row);
        if let RowStatus::Failed(err) = &outcome.status {
            tracing::warn!(row = outcome.row, error = %err, "row skipped");
        }
        report.outcomes.push(outcome);
    }
    report.skipped += rows.count();

    tracing::info!(
        generated = report.generated(),
        failed = report.failed(),
        skipped = report.skipped,
        cancelled = report.cancelled,
        "batch finished"
    );
    report
}

/// Resolves, validates and renders a single row.
pub fn process_row(ctx: &BatchContext<'_>, resolver: &RowResolver, row: &SheetRow) -> RowOutcome {
    let room = resolver
        .column(crate::sheet::ColumnRole::Room)
        .and_then(|c| row.cell(c))
        .map(str::to_string);
    let status = match render_row(ctx, resolver, row) {
        Ok(status) => status,
        Err(err) => RowStatus::Failed(err),
    };
    RowOutcome {
        row: row.number,
        room,
        status,
    }
}

fn render_row(
    ctx: &BatchContext<'_>,
    resolver: &RowResolver,
    row: &SheetRow,
) -> Result<RowStatus, RowError> {
    let resolved = resolver.resolve(row)?;
    let credential = WifiCredential::new(&resolved.input, ctx.properties, ctx.policy)?;
    let request = CompositionRequest::new(credential, ctx.output_dir)
        .with_room(resolved.room)
        .with_caption(ctx.caption.clone());
    let rendered = ctx.pipeline.render(&request)?;
    let logo_warning = match rendered.composition.logo {
        LogoStatus::Skipped(warning) => Some(warning),
        _ => None,
    };
    Ok(RowStatus::Generated {
        path: rendered.path,
        logo_warning,
    })
}
