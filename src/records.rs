//! # Record Model
//!
//! Typed rows for every artefact class an extraction can produce, plus the
//! fixed CSV headers they are exported under. Timestamps are carried as
//! already-formatted strings; a record whose source value could not be
//! converted keeps an absent timestamp and renders it as an empty cell.

use crate::browser::Family;

/// The artefact classes a history database can yield.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    BrowsingHistory,
    DownloadsHistory,
    DownloadsUrlChains,
    KeywordSearchTerms,
    Annotations,
}

impl RecordKind {
    pub const ALL: [RecordKind; 5] = [
        RecordKind::BrowsingHistory,
        RecordKind::DownloadsHistory,
        RecordKind::DownloadsUrlChains,
        RecordKind::KeywordSearchTerms,
        RecordKind::Annotations,
    ];

    /// File-name component of the exported CSV.
    pub fn file_stem(self) -> &'static str {
        match self {
            RecordKind::BrowsingHistory => "browsing_history",
            RecordKind::DownloadsHistory => "downloads_history",
            RecordKind::DownloadsUrlChains => "downloads_url_chains",
            RecordKind::KeywordSearchTerms => "keyword_search_terms",
            RecordKind::Annotations => "annotations",
        }
    }

    /// Human label for log lines.
    pub fn label(self) -> &'static str {
        match self {
            RecordKind::BrowsingHistory => "browsing history",
            RecordKind::DownloadsHistory => "downloads history",
            RecordKind::DownloadsUrlChains => "download URL chains",
            RecordKind::KeywordSearchTerms => "keyword search terms",
            RecordKind::Annotations => "annotations",
        }
    }
}

/// Header row for one record kind. Browsing history grows a `Description`
/// column for Firefox; every other kind has the same layout in both families.
pub fn headers_for(kind: RecordKind, family: Family) -> &'static [&'static str] {
    match (kind, family) {
        (RecordKind::BrowsingHistory, Family::Chromium) => &["URL", "Title", "Last Visit Time"],
        (RecordKind::BrowsingHistory, Family::Firefox) => {
            &["URL", "Title", "Last Visit Time", "Description"]
        }
        (RecordKind::DownloadsHistory, _) => &[
            "File Path",
            "Start Time",
            "Referrer",
            "Tab URL",
            "Tab Referrer URL",
            "MIME Type",
        ],
        (RecordKind::DownloadsUrlChains, _) => &["URL"],
        (RecordKind::KeywordSearchTerms, _) => &["Search Term"],
        (RecordKind::Annotations, _) => &["Content", "Date Added"],
    }
}

/// A row that renders itself for the tabular exporter. Implementations must
/// emit exactly as many cells as their kind's header has columns.
pub trait CsvRecord {
    fn csv_fields(&self) -> Vec<String>;
}

/// One visited URL.
///
/// `description` is `None` for Chromium rows (the schema has no such column)
/// and always `Some` for Firefox rows, empty string included, so a batch from
/// one family has a uniform width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRecord {
    pub url: String,
    pub title: String,
    pub last_visit: Option<String>,
    pub description: Option<String>,
}

impl CsvRecord for HistoryRecord {
    fn csv_fields(&self) -> Vec<String> {
        let mut fields = vec![
            self.url.clone(),
            self.title.clone(),
            self.last_visit.clone().unwrap_or_default(),
        ];
        if let Some(description) = &self.description {
            fields.push(description.clone());
        }
        fields
    }
}

/// One completed or in-flight download from a Chromium `downloads` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRecord {
    pub target_path: String,
    pub start_time: Option<String>,
    pub referrer: String,
    pub tab_url: String,
    pub tab_referrer_url: String,
    pub mime_type: String,
}

impl CsvRecord for DownloadRecord {
    fn csv_fields(&self) -> Vec<String> {
        vec![
            self.target_path.clone(),
            self.start_time.clone().unwrap_or_default(),
            self.referrer.clone(),
            self.tab_url.clone(),
            self.tab_referrer_url.clone(),
            self.mime_type.clone(),
        ]
    }
}

/// One hop of a download's redirect chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadChainEntry {
    pub url: String,
}

impl CsvRecord for DownloadChainEntry {
    fn csv_fields(&self) -> Vec<String> {
        vec![self.url.clone()]
    }
}

/// A term typed into the omnibox search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordSearchTerm {
    pub term: String,
}

impl CsvRecord for KeywordSearchTerm {
    fn csv_fields(&self) -> Vec<String> {
        vec![self.term.clone()]
    }
}

/// A Firefox page annotation from `moz_annos`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationRecord {
    pub content: String,
    pub date_added: Option<String>,
}

impl CsvRecord for AnnotationRecord {
    fn csv_fields(&self) -> Vec<String> {
        vec![
            self.content.clone(),
            self.date_added.clone().unwrap_or_default(),
        ]
    }
}
