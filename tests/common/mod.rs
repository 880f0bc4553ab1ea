//! Shared fixtures for integration tests.
//!
//! Builders for miniature Chromium and Firefox history databases. Each test
//! file imports this module and assembles only the tables it needs.

#![allow(dead_code)]

use std::path::Path;

use rusqlite::{Connection, params};

// ============================================================================
// Chromium fixtures
// ============================================================================

/// Create a Chromium-style history database with the required `urls` table.
pub fn chromium_db(path: &Path) -> Connection {
    let conn = Connection::open(path).expect("create chromium db");
    conn.execute_batch(
        "CREATE TABLE urls (
            id INTEGER PRIMARY KEY,
            url TEXT,
            title TEXT,
            last_visit_time INTEGER
        );",
    )
    .expect("urls schema");
    conn
}

pub fn add_downloads_table(conn: &Connection) {
    conn.execute_batch(
        "CREATE TABLE downloads (
            id INTEGER PRIMARY KEY,
            target_path TEXT,
            start_time INTEGER,
            referrer TEXT,
            tab_url TEXT,
            tab_referrer_url TEXT,
            mime_type TEXT
        );",
    )
    .expect("downloads schema");
}

pub fn add_url_chains_table(conn: &Connection) {
    conn.execute_batch(
        "CREATE TABLE downloads_url_chains (
            id INTEGER,
            chain_index INTEGER,
            url TEXT
        );",
    )
    .expect("downloads_url_chains schema");
}

pub fn add_keyword_table(conn: &Connection) {
    conn.execute_batch(
        "CREATE TABLE keyword_search_terms (
            keyword_id INTEGER,
            url_id INTEGER,
            term TEXT
        );",
    )
    .expect("keyword_search_terms schema");
}

pub fn insert_url(conn: &Connection, url: &str, title: &str, last_visit_time: Option<i64>) {
    conn.execute(
        "INSERT INTO urls (url, title, last_visit_time) VALUES (?1, ?2, ?3)",
        params![url, title, last_visit_time],
    )
    .expect("insert url");
}

pub fn insert_download(
    conn: &Connection,
    target_path: &str,
    start_time: Option<i64>,
    referrer: &str,
    mime_type: &str,
) {
    conn.execute(
        "INSERT INTO downloads (target_path, start_time, referrer, tab_url, tab_referrer_url, mime_type)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![target_path, start_time, referrer, "", "", mime_type],
    )
    .expect("insert download");
}

pub fn insert_chain_url(conn: &Connection, url: &str) {
    conn.execute(
        "INSERT INTO downloads_url_chains (id, chain_index, url) VALUES (1, 0, ?1)",
        params![url],
    )
    .expect("insert chain url");
}

pub fn insert_search_term(conn: &Connection, term: &str) {
    conn.execute(
        "INSERT INTO keyword_search_terms (keyword_id, url_id, term) VALUES (1, 1, ?1)",
        params![term],
    )
    .expect("insert search term");
}

// ============================================================================
// Firefox fixtures
// ============================================================================

/// Create a Firefox places database with the required `moz_places` table.
pub fn firefox_db(path: &Path) -> Connection {
    let conn = Connection::open(path).expect("create firefox db");
    conn.execute_batch(
        "CREATE TABLE moz_places (
            id INTEGER PRIMARY KEY,
            url TEXT,
            title TEXT,
            last_visit_date INTEGER,
            description TEXT
        );",
    )
    .expect("moz_places schema");
    conn
}

pub fn add_annotations_table(conn: &Connection) {
    conn.execute_batch(
        "CREATE TABLE moz_annos (
            id INTEGER PRIMARY KEY,
            content TEXT,
            dateAdded INTEGER
        );",
    )
    .expect("moz_annos schema");
}

pub fn insert_place(
    conn: &Connection,
    url: &str,
    title: &str,
    last_visit_date: Option<i64>,
    description: Option<&str>,
) {
    conn.execute(
        "INSERT INTO moz_places (url, title, last_visit_date, description) VALUES (?1, ?2, ?3, ?4)",
        params![url, title, last_visit_date, description],
    )
    .expect("insert place");
}

pub fn insert_annotation(conn: &Connection, content: &str, date_added: Option<i64>) {
    conn.execute(
        "INSERT INTO moz_annos (content, dateAdded) VALUES (?1, ?2)",
        params![content, date_added],
    )
    .expect("insert annotation");
}

// ============================================================================
// CSV helpers
// ============================================================================

/// Read a CSV back as (header, data rows).
pub fn read_csv(path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
    let mut reader = csv::Reader::from_path(path).expect("open csv");
    let header: Vec<String> =
        reader.headers().expect("headers").iter().map(str::to_string).collect();
    let rows: Vec<Vec<String>> = reader
        .records()
        .map(|record| record.expect("record").iter().map(str::to_string).collect())
        .collect();
    (header, rows)
}
