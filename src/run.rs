//! # Run Orchestration
//!
//! Drives one extraction end to end: open and read the database, then export
//! each non-empty batch to its own CSV. Extraction failures are fatal; export
//! failures are per-batch and never block the remaining kinds.

use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use tracing::{info, warn};

use crate::browser::BrowserProfile;
use crate::export::{self, ExportOutcome};
use crate::extract::{self, TableScan, TableStatus};
use crate::records::{CsvRecord, RecordKind, headers_for};

/// Final classification of one run, derived from the summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// At least one CSV file was written.
    Exported { files: usize },
    /// Extraction succeeded but every queried batch was empty.
    NoData,
}

/// Per-kind results of the export phase. Kinds the family's plan never
/// queries do not appear at all.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub written: Vec<(RecordKind, usize)>,
    pub skipped: Vec<RecordKind>,
    pub failed: Vec<(RecordKind, String)>,
}

impl RunSummary {
    pub fn outcome(&self) -> RunOutcome {
        if self.written.is_empty() {
            RunOutcome::NoData
        } else {
            RunOutcome::Exported { files: self.written.len() }
        }
    }
}

/// Extract every artefact class from the profile's database and export the
/// non-empty batches into `output_dir` as `{browser}_{kind}.csv`.
pub fn run_extract(profile: &BrowserProfile, output_dir: &Path) -> Result<RunSummary> {
    info!(
        "extracting {} history from {}",
        profile.browser.label(),
        profile.path.display()
    );
    let extraction = extract::extract(profile)?;

    let mut summary = RunSummary::default();
    export_kind(
        &mut summary,
        RecordKind::BrowsingHistory,
        &extraction.browsing_history,
        profile,
        output_dir,
    );
    export_kind(&mut summary, RecordKind::DownloadsHistory, &extraction.downloads, profile, output_dir);
    export_kind(
        &mut summary,
        RecordKind::DownloadsUrlChains,
        &extraction.download_url_chains,
        profile,
        output_dir,
    );
    export_kind(
        &mut summary,
        RecordKind::KeywordSearchTerms,
        &extraction.keyword_search_terms,
        profile,
        output_dir,
    );
    export_kind(&mut summary, RecordKind::Annotations, &extraction.annotations, profile, output_dir);

    if summary.written.is_empty() {
        if !summary.failed.is_empty() {
            bail!("{} batch(es) extracted but no file could be written", summary.failed.len());
        }
        warn!("no data found in {}; nothing exported", profile.path.display());
        return Ok(summary);
    }

    info!(
        "run complete: {} file(s) written, {} batch(es) empty, {} export failure(s)",
        summary.written.len(),
        summary.skipped.len(),
        summary.failed.len()
    );
    Ok(summary)
}

fn export_kind<R: CsvRecord>(
    summary: &mut RunSummary,
    kind: RecordKind,
    scan: &TableScan<R>,
    profile: &BrowserProfile,
    output_dir: &Path,
) {
    if scan.status == TableStatus::NotQueried {
        return;
    }
    let dest = output_path(output_dir, profile, kind);
    let headers = headers_for(kind, profile.family());

    match export::write_batch(&scan.rows, headers, &dest) {
        Ok(ExportOutcome::Written(rows)) => {
            info!("exported {rows} {} row(s) to {}", kind.label(), dest.display());
            summary.written.push((kind, rows));
        }
        Ok(ExportOutcome::SkippedEmpty) => {
            match &scan.status {
                TableStatus::Failed(reason) => {
                    warn!("no {} export: source query failed ({reason})", kind.label());
                }
                TableStatus::Absent => info!("no {} export: table not present", kind.label()),
                TableStatus::Present => info!("no {} export: zero rows", kind.label()),
                TableStatus::NotQueried => {}
            }
            summary.skipped.push(kind);
        }
        Err(err) => {
            warn!("could not write {} to {}: {err}", kind.label(), dest.display());
            summary.failed.push((kind, err.to_string()));
        }
    }
}

fn output_path(output_dir: &Path, profile: &BrowserProfile, kind: RecordKind) -> PathBuf {
    output_dir.join(format!("{}_{}.csv", profile.browser.label(), kind.file_stem()))
}
