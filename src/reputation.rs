//! # Hash Reputation
//!
//! Enriches a hash inventory CSV with VirusTotal verdicts. Every row's SHA1
//! is looked up through the v3 file endpoint; rows flagged by at least one
//! engine are kept with their detection details, and hashes the service has
//! never seen are kept as "Not found" so an analyst can chase them manually.
//! Clean, known files are dropped from the output.

use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use std::thread;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

pub const RESULT_HEADERS: &[&str] = &[
    "FullPath",
    "SHA1",
    "FileKeyLastWriteTimestamp",
    "DetectionRatio",
    "Signers",
    "PopularThreatLabel",
    "OriginalFileName",
];

const NOT_AVAILABLE: &str = "Not available";
const NOT_FOUND: &str = "Not found";
const VT_BASE_URL: &str = "https://www.virustotal.com";
const HTTP_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum ReputationError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("inventory is missing the {0} column")]
    MissingColumn(&'static str),
    #[error("api key rejected (HTTP {0}); check the key and its quota")]
    KeyRejected(u16),
    #[error("http error: {0}")]
    Http(String),
}

/// One row of the input inventory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryRow {
    pub full_path: String,
    pub sha1: String,
    pub last_write: String,
}

/// What the lookup service knows about one hash.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Verdict {
    pub malicious: u64,
    pub total_engines: u64,
    pub signers: Option<String>,
    pub threat_label: Option<String>,
    pub original_name: Option<String>,
}

impl Verdict {
    pub fn detection_ratio(&self) -> String {
        format!("{}/{}", self.malicious, self.total_engines)
    }
}

/// An inventory row that survived triage, joined with its lookup result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlaggedEntry {
    pub full_path: String,
    pub sha1: String,
    pub last_write: String,
    pub detection_ratio: String,
    pub signers: String,
    pub threat_label: String,
    pub original_name: String,
}

/// Hash lookup seam so the enrichment loop can run offline in tests.
pub trait ReputationClient {
    /// `Ok(None)` means the service has never seen the hash.
    fn lookup(&self, sha1: &str) -> Result<Option<Verdict>, ReputationError>;
}

/// VirusTotal v3 `files/{hash}` client.
pub struct VirusTotalClient {
    client: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
}

impl VirusTotalClient {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, ReputationError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|err| ReputationError::Http(err.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.trim().to_string(),
        })
    }

    pub fn public(api_key: &str) -> Result<Self, ReputationError> {
        Self::new(VT_BASE_URL, api_key)
    }
}

impl ReputationClient for VirusTotalClient {
    fn lookup(&self, sha1: &str) -> Result<Option<Verdict>, ReputationError> {
        let url = format!("{}/api/v3/files/{sha1}", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("x-apikey", &self.api_key)
            .send()
            .map_err(|err| ReputationError::Http(err.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(ReputationError::KeyRejected(status.as_u16()));
        }
        if !status.is_success() {
            return Err(ReputationError::Http(format!("status {status} for {sha1}")));
        }

        let parsed: VtResponse =
            response.json().map_err(|err| ReputationError::Http(err.to_string()))?;
        Ok(Some(parsed.data.attributes.into_verdict()))
    }
}

#[derive(Debug, Deserialize)]
struct VtResponse {
    data: VtData,
}

#[derive(Debug, Deserialize)]
struct VtData {
    attributes: VtAttributes,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct VtAttributes {
    last_analysis_stats: HashMap<String, u64>,
    signature_info: VtSignatureInfo,
    popular_threat_classification: VtThreatClassification,
    meaningful_name: Option<String>,
    names: Vec<String>,
}

impl VtAttributes {
    /// The service serves empty strings where it has nothing; treat those as
    /// absent so they fall back the same way a missing field does.
    fn into_verdict(self) -> Verdict {
        let malicious = self.last_analysis_stats.get("malicious").copied().unwrap_or(0);
        let total_engines = self.last_analysis_stats.values().sum();
        let signers =
            self.signature_info.signers.as_ref().map(VtSigners::join).filter(|s| !s.is_empty());
        let threat_label =
            self.popular_threat_classification.suggested_threat_label.filter(|s| !s.is_empty());
        let original_name = self
            .meaningful_name
            .filter(|s| !s.is_empty())
            .or_else(|| self.names.first().cloned());
        Verdict { malicious, total_engines, signers, threat_label, original_name }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct VtSignatureInfo {
    signers: Option<VtSigners>,
}

/// The API serves `signers` as either one string or a list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum VtSigners {
    One(String),
    Many(Vec<String>),
}

impl VtSigners {
    fn join(&self) -> String {
        match self {
            VtSigners::One(signer) => signer.clone(),
            VtSigners::Many(signers) => signers.join(", "),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct VtThreatClassification {
    suggested_threat_label: Option<String>,
}

/// Read the inventory, look up every hash, and write the flagged entries to
/// `output`. Returns the number of entries written; zero means either an
/// empty inventory or a fully clean one, and no file is created.
pub fn run_reputation(
    inventory: &Path,
    output: &Path,
    api_key: Option<&str>,
    delay: Duration,
) -> Result<usize, ReputationError> {
    let rows = read_inventory(inventory)?;
    if rows.is_empty() {
        info!("inventory {} has no rows", inventory.display());
        return Ok(0);
    }

    let key = match api_key {
        Some(key) => key.trim().to_string(),
        None => prompt_api_key()?,
    };
    let client = VirusTotalClient::public(&key)?;

    info!(
        "querying {} hash(es), pausing {}s between lookups",
        rows.len(),
        delay.as_secs()
    );
    let flagged = enrich(&client, &rows, delay)?;
    if flagged.is_empty() {
        info!("all {} inventory entries are known clean", rows.len());
        return Ok(0);
    }

    write_results(&flagged, output)?;
    info!("wrote {} flagged entries to {}", flagged.len(), output.display());
    Ok(flagged.len())
}

/// Look up every row, keeping the malicious and the unknown. A rejected API
/// key aborts the whole run; any other lookup failure downgrades that row to
/// "Not found" so one flaky response cannot lose the rest of the inventory.
pub fn enrich(
    client: &dyn ReputationClient,
    rows: &[InventoryRow],
    delay: Duration,
) -> Result<Vec<FlaggedEntry>, ReputationError> {
    let mut flagged = Vec::new();
    for (i, row) in rows.iter().enumerate() {
        if i > 0 && !delay.is_zero() {
            thread::sleep(delay);
        }
        info!("lookup {}/{}: {}", i + 1, rows.len(), row.sha1);
        match client.lookup(&row.sha1) {
            Ok(Some(verdict)) => {
                if verdict.malicious > 0 {
                    flagged.push(flagged_entry(row, &verdict));
                }
            }
            Ok(None) => flagged.push(not_found_entry(row)),
            Err(err @ ReputationError::KeyRejected(_)) => return Err(err),
            Err(err) => {
                warn!("lookup failed for {}: {err}", row.sha1);
                flagged.push(not_found_entry(row));
            }
        }
    }
    Ok(flagged)
}

fn flagged_entry(row: &InventoryRow, verdict: &Verdict) -> FlaggedEntry {
    FlaggedEntry {
        full_path: row.full_path.clone(),
        sha1: row.sha1.clone(),
        last_write: row.last_write.clone(),
        detection_ratio: verdict.detection_ratio(),
        signers: verdict.signers.clone().unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        threat_label: verdict.threat_label.clone().unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        original_name: verdict.original_name.clone().unwrap_or_else(|| NOT_AVAILABLE.to_string()),
    }
}

fn not_found_entry(row: &InventoryRow) -> FlaggedEntry {
    FlaggedEntry {
        full_path: row.full_path.clone(),
        sha1: row.sha1.clone(),
        last_write: row.last_write.clone(),
        detection_ratio: NOT_FOUND.to_string(),
        signers: NOT_AVAILABLE.to_string(),
        threat_label: NOT_AVAILABLE.to_string(),
        original_name: NOT_AVAILABLE.to_string(),
    }
}

/// Parse the inventory CSV. Columns are located by name, so extra columns
/// and arbitrary ordering are fine.
pub fn read_inventory(path: &Path) -> Result<Vec<InventoryRow>, ReputationError> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();
    let column = |name: &'static str| -> Result<usize, ReputationError> {
        headers.iter().position(|h| h == name).ok_or(ReputationError::MissingColumn(name))
    };
    let full_path_col = column("FullPath")?;
    let sha1_col = column("SHA1")?;
    let last_write_col = column("FileKeyLastWriteTimestamp")?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(InventoryRow {
            full_path: record.get(full_path_col).unwrap_or_default().to_string(),
            sha1: record.get(sha1_col).unwrap_or_default().to_string(),
            last_write: record.get(last_write_col).unwrap_or_default().to_string(),
        });
    }
    Ok(rows)
}

pub fn write_results(entries: &[FlaggedEntry], output: &Path) -> Result<(), ReputationError> {
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_path(output)?;
    writer.write_record(RESULT_HEADERS)?;
    for entry in entries {
        writer.write_record([
            entry.full_path.as_str(),
            entry.sha1.as_str(),
            entry.last_write.as_str(),
            entry.detection_ratio.as_str(),
            entry.signers.as_str(),
            entry.threat_label.as_str(),
            entry.original_name.as_str(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn prompt_api_key() -> Result<String, ReputationError> {
    print!("Enter your VirusTotal API key: ");
    std::io::stdout().flush()?;
    let mut key = String::new();
    std::io::stdin().read_line(&mut key)?;
    Ok(key.trim().to_string())
}
