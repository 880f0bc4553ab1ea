//! # Corpus Search
//!
//! Case-insensitive pattern search across a directory tree of exported CSV
//! files. Matching rows from every file are merged into one output CSV whose
//! column set is the union of the contributing files' headers; cells a file
//! never had stay empty. Unreadable files are skipped with a warning, not
//! fatal.

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use regex::{Regex, RegexBuilder};
use tracing::{info, warn};
use walkdir::WalkDir;

const SOURCE_COLUMN: &str = "Source_File";

/// Counters for one corpus search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchSummary {
    /// CSV files found under the root, readable or not.
    pub files_scanned: usize,
    /// Files that contributed at least one matching row.
    pub files_matched: usize,
    pub rows_matched: usize,
}

struct MatchedRow {
    /// Sparse cells keyed by global column index.
    cells: Vec<(usize, String)>,
    source: PathBuf,
}

/// Search every CSV under `root` for `pattern` and merge the matching rows
/// into `output`. The pattern is a case-insensitive regular expression tested
/// against each cell. No output file is created when nothing matches.
pub fn run_search(
    pattern: &str,
    root: &Path,
    output: &Path,
    add_source: bool,
) -> Result<SearchSummary> {
    let matcher = RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .with_context(|| format!("invalid search pattern {pattern:?}"))?;

    // Snapshot the corpus up front so the output file we are about to write
    // can never become part of its own search.
    let files = find_csv_files(root);
    if files.is_empty() {
        info!("no CSV files under {}", root.display());
        return Ok(SearchSummary::default());
    }

    let mut summary = SearchSummary::default();
    let mut columns: Vec<String> = Vec::new();
    let mut column_index: HashMap<String, usize> = HashMap::new();
    let mut rows: Vec<MatchedRow> = Vec::new();

    for path in &files {
        summary.files_scanned += 1;
        let (headers, records) = match scan_file(path, &matcher) {
            Ok(found) => found,
            Err(err) => {
                warn!("skipping {}: {err}", path.display());
                continue;
            }
        };
        if records.is_empty() {
            continue;
        }
        summary.files_matched += 1;

        // Only contributing files widen the union header.
        let global: Vec<usize> = dedup_headers(&headers)
            .iter()
            .map(|name| intern_column(&mut columns, &mut column_index, name))
            .collect();
        for record in records {
            let mut cells = Vec::with_capacity(record.len());
            for (i, cell) in record.iter().enumerate() {
                if cell.is_empty() {
                    continue;
                }
                if let Some(&g) = global.get(i) {
                    cells.push((g, cell.to_string()));
                }
            }
            rows.push(MatchedRow { cells, source: path.clone() });
            summary.rows_matched += 1;
        }
    }

    if rows.is_empty() {
        return Ok(summary);
    }

    write_merged(&rows, &columns, output, add_source)
        .with_context(|| format!("cannot write results to {}", output.display()))?;
    info!(
        "{} matching row(s) from {} file(s) merged into {}",
        summary.rows_matched,
        summary.files_matched,
        output.display()
    );
    Ok(summary)
}

fn find_csv_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("csv")))
        .collect();
    // Directory walk order varies by platform; sort for reproducible output.
    files.sort();
    files
}

/// Read one CSV and return its header plus every matching data row. Fails as
/// a whole file, so a partially read file never contributes rows.
fn scan_file(
    path: &Path,
    matcher: &Regex,
) -> Result<(csv::StringRecord, Vec<csv::StringRecord>), csv::Error> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let headers = reader.headers()?.clone();
    let mut matched = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.iter().any(|cell| matcher.is_match(cell)) {
            matched.push(record);
        }
    }
    Ok((headers, matched))
}

/// Repeated column names within one file get suffixed (`URL`, `URL.1`) so a
/// later cell cannot overwrite an earlier one in the merged row. Names are
/// only deduplicated within a file; the same name across files still merges
/// into one column.
fn dedup_headers(headers: &csv::StringRecord) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(headers.len());
    for name in headers.iter() {
        let mut effective = name.to_string();
        let mut k = 1;
        while out.contains(&effective) {
            effective = format!("{name}.{k}");
            k += 1;
        }
        out.push(effective);
    }
    out
}

fn intern_column(
    columns: &mut Vec<String>,
    index: &mut HashMap<String, usize>,
    name: &str,
) -> usize {
    if let Some(&i) = index.get(name) {
        return i;
    }
    let i = columns.len();
    columns.push(name.to_string());
    index.insert(name.to_string(), i);
    i
}

fn write_merged(
    rows: &[MatchedRow],
    columns: &[String],
    output: &Path,
    add_source: bool,
) -> Result<(), csv::Error> {
    let width = columns.len() + usize::from(add_source);
    let file = File::create(output)?;
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);

    let mut header: Vec<&str> = columns.iter().map(String::as_str).collect();
    if add_source {
        header.push(SOURCE_COLUMN);
    }
    writer.write_record(&header)?;

    for row in rows {
        let mut cells = vec![String::new(); width];
        for (idx, value) in &row.cells {
            cells[*idx] = value.clone();
        }
        if add_source {
            cells[width - 1] = row.source.display().to_string();
        }
        writer.write_record(&cells)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn write_corpus(dir: &Path) {
        fs::write(
            dir.join("chrome_browsing_history.csv"),
            "URL,Title,Last Visit Time\n\
             https://evil.example/stage2,Loader,2024-01-01 00:00:00 UTC\n\
             https://docs.example/,Docs,2024-01-02 00:00:00 UTC\n",
        )
        .expect("write history");
        fs::write(
            dir.join("chrome_downloads_history.csv"),
            "File Path,Start Time,Referrer,Tab URL,Tab Referrer URL,MIME Type\n\
             /tmp/stage2.bin,2024-01-01 00:00:00 UTC,https://EVIL.example/,,,application/octet-stream\n",
        )
        .expect("write downloads");
        fs::write(dir.join("notes.txt"), "evil.example mentioned here is not csv")
            .expect("write txt");
    }

    #[test]
    fn matches_are_case_insensitive_and_merged_across_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_corpus(dir.path());
        let out = dir.path().join("results").join("IOC.csv");
        fs::create_dir_all(out.parent().expect("parent")).expect("results dir");

        let summary = run_search("evil\\.example", dir.path(), &out, false).expect("search");
        assert_eq!(summary.files_scanned, 2);
        assert_eq!(summary.files_matched, 2);
        assert_eq!(summary.rows_matched, 2);

        let mut reader = csv::Reader::from_path(&out).expect("open results");
        let header = reader.headers().expect("headers").clone();
        // union of both contributing headers, first-seen order
        let names: Vec<&str> = header.iter().collect();
        assert_eq!(
            names,
            [
                "URL",
                "Title",
                "Last Visit Time",
                "File Path",
                "Start Time",
                "Referrer",
                "Tab URL",
                "Tab Referrer URL",
                "MIME Type"
            ]
        );
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.expect("row")).collect();
        assert_eq!(rows.len(), 2);
        // history row leaves the download columns empty
        assert_eq!(&rows[0][0], "https://evil.example/stage2");
        assert_eq!(&rows[0][3], "");
        // download row leaves the history columns empty
        assert_eq!(&rows[1][0], "");
        assert_eq!(&rows[1][3], "/tmp/stage2.bin");
    }

    #[test]
    fn source_column_is_appended_on_request() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_corpus(dir.path());
        let out = dir.path().join("IOC_sourced.csv");

        run_search("stage2", dir.path(), &out, true).expect("search");

        let mut reader = csv::Reader::from_path(&out).expect("open results");
        let header = reader.headers().expect("headers").clone();
        assert_eq!(header.iter().last(), Some(SOURCE_COLUMN));
        for row in reader.records() {
            let row = row.expect("row");
            let source = row.iter().last().expect("source cell");
            assert!(source.ends_with(".csv"), "source was {source:?}");
        }
    }

    #[test]
    fn no_match_leaves_no_output_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_corpus(dir.path());
        let out = dir.path().join("IOC.csv");

        let summary = run_search("definitely-absent-token", dir.path(), &out, false)
            .expect("search");
        assert_eq!(summary.rows_matched, 0);
        assert!(!out.exists());
    }

    #[test]
    fn unreadable_file_is_skipped_not_fatal() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_corpus(dir.path());
        // invalid UTF-8 makes the csv reader fail mid-file
        fs::write(dir.path().join("broken.csv"), b"URL,Title\n\xff\xfe\xfd,oops\n")
            .expect("write broken");
        let out = dir.path().join("IOC.csv");

        let summary = run_search("evil\\.example", dir.path(), &out, false).expect("search");
        assert_eq!(summary.files_scanned, 3);
        assert_eq!(summary.rows_matched, 2);
        assert!(out.exists());
    }

    #[test]
    fn repeated_column_names_keep_both_cells() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(
            dir.path().join("doubled.csv"),
            "URL,URL\nhttps://first.example/,https://second.example/\n",
        )
        .expect("write");
        let out = dir.path().join("IOC.csv");

        run_search("example", dir.path(), &out, false).expect("search");

        let mut reader = csv::Reader::from_path(&out).expect("open results");
        let names: Vec<String> =
            reader.headers().expect("headers").iter().map(str::to_string).collect();
        assert_eq!(names, ["URL", "URL.1"]);
        let row = reader.records().next().expect("one row").expect("row");
        assert_eq!(&row[0], "https://first.example/");
        assert_eq!(&row[1], "https://second.example/");
    }

    #[test]
    fn invalid_pattern_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let out = dir.path().join("IOC.csv");
        assert!(run_search("[unclosed", dir.path(), &out, false).is_err());
    }

    #[test]
    fn header_cells_are_not_matched_as_data() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("only_header_hit.csv"), "MIME Type\ntext/plain\n")
            .expect("write");
        let out = dir.path().join("IOC.csv");

        // "MIME" appears only in the header row
        let summary = run_search("MIME", dir.path(), &out, false).expect("search");
        assert_eq!(summary.rows_matched, 0);
        assert!(!out.exists());
    }
}
