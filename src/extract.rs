//! # History Extraction
//!
//! Schema-aware reads against a single browser history database. The
//! database is opened read-only exactly once per run; every table in the
//! family's plan is probed through `sqlite_master` before its query runs, so
//! an absent optional table degrades to an empty batch instead of an error.

use std::path::{Path, PathBuf};

use rusqlite::{Connection, OpenFlags};
use thiserror::Error;
use tracing::{debug, warn};

use crate::browser::{BrowserProfile, Family, TablePlan};
use crate::records::{
    AnnotationRecord, DownloadChainEntry, DownloadRecord, HistoryRecord, KeywordSearchTerm,
    RecordKind,
};
use crate::timestamp::Epoch;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("cannot open {} as a sqlite database: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },
    #[error("required table {table} is missing; not a {family} history database?")]
    MissingTable { table: &'static str, family: &'static str },
    #[error("query against table {table} failed: {source}")]
    Query {
        table: &'static str,
        #[source]
        source: rusqlite::Error,
    },
}

/// Probe outcome for one table, kept alongside the rows so callers can
/// report a skip without re-deriving why the batch is empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableStatus {
    /// Table exists and was read; the batch may still hold zero rows.
    Present,
    /// Optional table does not exist in this database.
    Absent,
    /// Optional table exists but its query failed; the batch is empty.
    Failed(String),
    /// The family's plan never touches this kind.
    NotQueried,
}

/// Rows pulled from one table plus how the probe went.
#[derive(Debug)]
pub struct TableScan<T> {
    pub rows: Vec<T>,
    pub status: TableStatus,
}

impl<T> Default for TableScan<T> {
    fn default() -> Self {
        Self { rows: Vec::new(), status: TableStatus::NotQueried }
    }
}

/// Everything one run pulled out of a single history database.
#[derive(Debug, Default)]
pub struct Extraction {
    pub browsing_history: TableScan<HistoryRecord>,
    pub downloads: TableScan<DownloadRecord>,
    pub download_url_chains: TableScan<DownloadChainEntry>,
    pub keyword_search_terms: TableScan<KeywordSearchTerm>,
    pub annotations: TableScan<AnnotationRecord>,
}

/// Open the profile's database and walk the family's extraction plan.
///
/// Only two failures abort the run: the database cannot be opened at all, or
/// a required table is missing or unreadable. Every optional step degrades to
/// an empty batch with its status recorded. The read-only connection drops on
/// every exit path.
pub fn extract(profile: &BrowserProfile) -> Result<Extraction, ExtractError> {
    let conn = open_history_db(&profile.path)?;
    let family = profile.family();
    let mut out = Extraction::default();

    for step in family.plan() {
        match step.kind {
            RecordKind::BrowsingHistory => {
                out.browsing_history =
                    scan_step(&conn, family, step, |conn, sql| fetch_history(conn, sql, family))?;
            }
            RecordKind::DownloadsHistory => {
                out.downloads = scan_step(&conn, family, step, |conn, sql| {
                    fetch_downloads(conn, sql, family.epoch())
                })?;
            }
            RecordKind::DownloadsUrlChains => {
                out.download_url_chains = scan_step(&conn, family, step, fetch_chain_entries)?;
            }
            RecordKind::KeywordSearchTerms => {
                out.keyword_search_terms = scan_step(&conn, family, step, fetch_search_terms)?;
            }
            RecordKind::Annotations => {
                out.annotations = scan_step(&conn, family, step, |conn, sql| {
                    fetch_annotations(conn, sql, family.epoch())
                })?;
            }
        }
    }

    Ok(out)
}

fn open_history_db(path: &Path) -> Result<Connection, ExtractError> {
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|source| ExtractError::Open { path: path.to_path_buf(), source })?;

    // sqlite defers reading the file until the first statement; touch the
    // schema here so a truncated or non-database file fails at open time
    // rather than halfway through the plan.
    conn.query_row("SELECT count(*) FROM sqlite_master", [], |row| row.get::<_, i64>(0))
        .map_err(|source| ExtractError::Open { path: path.to_path_buf(), source })?;

    Ok(conn)
}

fn has_table(conn: &Connection, name: &str) -> rusqlite::Result<bool> {
    let mut stmt = conn.prepare("SELECT name FROM sqlite_master WHERE type='table' AND name=?1")?;
    let mut rows = stmt.query([name])?;
    Ok(rows.next()?.is_some())
}

/// Probe one plan step and run its query, mapping failures per the step's
/// required flag.
fn scan_step<T>(
    conn: &Connection,
    family: Family,
    step: &TablePlan,
    fetch: impl FnOnce(&Connection, &str) -> rusqlite::Result<Vec<T>>,
) -> Result<TableScan<T>, ExtractError> {
    let present = has_table(conn, step.table)
        .map_err(|source| ExtractError::Query { table: step.table, source })?;
    if !present {
        if step.required {
            return Err(ExtractError::MissingTable { table: step.table, family: family.label() });
        }
        debug!("table {} absent, skipping {}", step.table, step.kind.label());
        return Ok(TableScan { rows: Vec::new(), status: TableStatus::Absent });
    }

    match fetch(conn, step.sql) {
        Ok(rows) => {
            debug!("{}: {} row(s)", step.kind.label(), rows.len());
            Ok(TableScan { rows, status: TableStatus::Present })
        }
        Err(source) if step.required => Err(ExtractError::Query { table: step.table, source }),
        Err(source) => {
            warn!(
                "query against optional table {} failed: {source}; continuing with an empty {} batch",
                step.table,
                step.kind.label()
            );
            Ok(TableScan { rows: Vec::new(), status: TableStatus::Failed(source.to_string()) })
        }
    }
}

/// Convert a raw epoch value, downgrading an out-of-range value to an absent
/// field with a warning. The record itself is always kept.
fn convert_or_blank(raw: Option<i64>, epoch: Epoch, column: &str) -> Option<String> {
    let raw = raw?;
    match epoch.to_utc(raw) {
        Ok(formatted) => Some(formatted),
        Err(err) => {
            warn!("{column}: {err}; leaving the field empty");
            None
        }
    }
}

fn fetch_history(
    conn: &Connection,
    sql: &str,
    family: Family,
) -> rusqlite::Result<Vec<HistoryRecord>> {
    let epoch = family.epoch();
    let mut out = Vec::new();
    let mut stmt = conn.prepare(sql)?;

    match family {
        Family::Chromium => {
            let rows = stmt.query_map([], |row| {
                let url: Option<String> = row.get(0)?;
                let title: Option<String> = row.get(1)?;
                let last_visit: Option<i64> = row.get(2)?;
                Ok((url, title, last_visit))
            })?;
            for row in rows {
                let (url, title, last_visit) = row?;
                out.push(HistoryRecord {
                    url: url.unwrap_or_default(),
                    title: title.unwrap_or_default(),
                    last_visit: convert_or_blank(last_visit, epoch, "last_visit_time"),
                    description: None,
                });
            }
        }
        Family::Firefox => {
            let rows = stmt.query_map([], |row| {
                let url: Option<String> = row.get(0)?;
                let title: Option<String> = row.get(1)?;
                let last_visit: Option<i64> = row.get(2)?;
                let description: Option<String> = row.get(3)?;
                Ok((url, title, last_visit, description))
            })?;
            for row in rows {
                let (url, title, last_visit, description) = row?;
                out.push(HistoryRecord {
                    url: url.unwrap_or_default(),
                    title: title.unwrap_or_default(),
                    last_visit: convert_or_blank(last_visit, epoch, "last_visit_date"),
                    // Firefox rows always carry the column; NULL renders as
                    // an empty cell, keeping the batch four columns wide.
                    description: Some(description.unwrap_or_default()),
                });
            }
        }
    }

    Ok(out)
}

fn fetch_downloads(
    conn: &Connection,
    sql: &str,
    epoch: Epoch,
) -> rusqlite::Result<Vec<DownloadRecord>> {
    let mut out = Vec::new();
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map([], |row| {
        let target_path: Option<String> = row.get(0)?;
        let start_time: Option<i64> = row.get(1)?;
        let referrer: Option<String> = row.get(2)?;
        let tab_url: Option<String> = row.get(3)?;
        let tab_referrer_url: Option<String> = row.get(4)?;
        let mime_type: Option<String> = row.get(5)?;
        Ok((target_path, start_time, referrer, tab_url, tab_referrer_url, mime_type))
    })?;

    for row in rows {
        let (target_path, start_time, referrer, tab_url, tab_referrer_url, mime_type) = row?;
        out.push(DownloadRecord {
            target_path: target_path.unwrap_or_default(),
            start_time: convert_or_blank(start_time, epoch, "start_time"),
            referrer: referrer.unwrap_or_default(),
            tab_url: tab_url.unwrap_or_default(),
            tab_referrer_url: tab_referrer_url.unwrap_or_default(),
            mime_type: mime_type.unwrap_or_default(),
        });
    }

    Ok(out)
}

fn fetch_chain_entries(conn: &Connection, sql: &str) -> rusqlite::Result<Vec<DownloadChainEntry>> {
    let mut out = Vec::new();
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map([], |row| {
        let url: Option<String> = row.get(0)?;
        Ok(url)
    })?;
    for row in rows {
        out.push(DownloadChainEntry { url: row?.unwrap_or_default() });
    }
    Ok(out)
}

fn fetch_search_terms(conn: &Connection, sql: &str) -> rusqlite::Result<Vec<KeywordSearchTerm>> {
    let mut out = Vec::new();
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map([], |row| {
        let term: Option<String> = row.get(0)?;
        Ok(term)
    })?;
    for row in rows {
        out.push(KeywordSearchTerm { term: row?.unwrap_or_default() });
    }
    Ok(out)
}

fn fetch_annotations(
    conn: &Connection,
    sql: &str,
    epoch: Epoch,
) -> rusqlite::Result<Vec<AnnotationRecord>> {
    let mut out = Vec::new();
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map([], |row| {
        let content: Option<String> = row.get(0)?;
        let date_added: Option<i64> = row.get(1)?;
        Ok((content, date_added))
    })?;
    for row in rows {
        let (content, date_added) = row?;
        out.push(AnnotationRecord {
            content: content.unwrap_or_default(),
            date_added: convert_or_blank(date_added, epoch, "dateAdded"),
        });
    }
    Ok(out)
}
