//! # Browser Model
//!
//! The supported browsers and the per-family query plans. Plans are fixed at
//! compile time: each family carries an ordered list of (record kind, source
//! table, query, required) entries, and the extractor walks that list without
//! any per-browser dispatch beyond the family split.

use std::fmt;
use std::path::PathBuf;

use crate::records::RecordKind;
use crate::timestamp::Epoch;

/// One of the five supported browsers.
///
/// Chrome, Edge, Brave and Opera all ship the Chromium history schema and
/// differ only in the label stamped on exported files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Browser {
    Chrome,
    Edge,
    Brave,
    Opera,
    Firefox,
}

impl Browser {
    /// File-name prefix and log label.
    pub fn label(self) -> &'static str {
        match self {
            Browser::Chrome => "chrome",
            Browser::Edge => "edge",
            Browser::Brave => "brave",
            Browser::Opera => "opera",
            Browser::Firefox => "firefox",
        }
    }

    pub fn family(self) -> Family {
        match self {
            Browser::Chrome | Browser::Edge | Browser::Brave | Browser::Opera => Family::Chromium,
            Browser::Firefox => Family::Firefox,
        }
    }
}

impl fmt::Display for Browser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Schema family: decides the query plan and the timestamp epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    Chromium,
    Firefox,
}

impl Family {
    pub fn label(self) -> &'static str {
        match self {
            Family::Chromium => "chromium",
            Family::Firefox => "firefox",
        }
    }

    pub fn epoch(self) -> Epoch {
        match self {
            Family::Chromium => Epoch::WebKit,
            Family::Firefox => Epoch::UnixMicros,
        }
    }

    /// The ordered extraction plan for this family.
    pub fn plan(self) -> &'static [TablePlan] {
        match self {
            Family::Chromium => CHROMIUM_PLAN,
            Family::Firefox => FIREFOX_PLAN,
        }
    }
}

/// One step of a family's extraction plan.
#[derive(Debug, Clone, Copy)]
pub struct TablePlan {
    pub kind: RecordKind,
    /// Source table probed before the query runs.
    pub table: &'static str,
    pub sql: &'static str,
    /// A missing required table aborts the run; a missing optional table
    /// degrades to an empty batch.
    pub required: bool,
}

const CHROMIUM_PLAN: &[TablePlan] = &[
    TablePlan {
        kind: RecordKind::BrowsingHistory,
        table: "urls",
        sql: "SELECT url, title, last_visit_time FROM urls",
        required: true,
    },
    TablePlan {
        kind: RecordKind::DownloadsHistory,
        table: "downloads",
        sql: "SELECT target_path, start_time, referrer, tab_url, tab_referrer_url, mime_type \
              FROM downloads",
        required: false,
    },
    TablePlan {
        kind: RecordKind::DownloadsUrlChains,
        table: "downloads_url_chains",
        sql: "SELECT url FROM downloads_url_chains",
        required: false,
    },
    TablePlan {
        kind: RecordKind::KeywordSearchTerms,
        table: "keyword_search_terms",
        sql: "SELECT term FROM keyword_search_terms",
        required: false,
    },
];

const FIREFOX_PLAN: &[TablePlan] = &[
    TablePlan {
        kind: RecordKind::BrowsingHistory,
        table: "moz_places",
        sql: "SELECT url, title, last_visit_date, description FROM moz_places",
        required: true,
    },
    TablePlan {
        kind: RecordKind::Annotations,
        table: "moz_annos",
        sql: "SELECT content, dateAdded FROM moz_annos",
        required: false,
    },
];

/// A resolved extraction target: which browser wrote the database at `path`.
#[derive(Debug, Clone)]
pub struct BrowserProfile {
    pub browser: Browser,
    pub path: PathBuf,
}

impl BrowserProfile {
    pub fn new(browser: Browser, path: impl Into<PathBuf>) -> Self {
        Self { browser, path: path.into() }
    }

    pub fn family(&self) -> Family {
        self.browser.family()
    }
}
