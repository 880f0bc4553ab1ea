//! # Utility Module
//!
//! Small shared helpers: CLI-to-domain conversions, output directory
//! preparation and source hashing.

use std::fs::{File, OpenOptions};
use std::io::Read;
use std::path::Path;

use anyhow::{Result, anyhow};
use sha2::{Digest, Sha256};
#[cfg(unix)]
use tracing::warn;

use crate::browser::Browser;
use crate::cli;

/// Convert the CLI browser choice to the domain enum.
pub fn browser_from_cli(kind: cli::BrowserKind) -> Browser {
    match kind {
        cli::BrowserKind::Chrome => Browser::Chrome,
        cli::BrowserKind::Edge => Browser::Edge,
        cli::BrowserKind::Brave => Browser::Brave,
        cli::BrowserKind::Opera => Browser::Opera,
        cli::BrowserKind::Firefox => Browser::Firefox,
    }
}

/// Ensure the output directory exists and is writable, warning on unsafe
/// permissions.
pub fn ensure_output_dir(path: &Path) -> Result<()> {
    if path.exists() {
        let metadata = std::fs::metadata(path)?;
        if !metadata.is_dir() {
            return Err(anyhow!("output path is not a directory: {}", path.display()));
        }
    } else {
        std::fs::create_dir_all(path)?;
    }
    let metadata = std::fs::metadata(path)?;

    let probe_path = path.join(".trailhound_write_probe");
    match OpenOptions::new().write(true).create(true).open(&probe_path) {
        Ok(_) => {
            let _ = std::fs::remove_file(&probe_path);
        }
        Err(err) => {
            return Err(anyhow!(
                "output directory is not writable: {} ({})",
                path.display(),
                err
            ));
        }
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = metadata.permissions().mode();
        if mode & 0o002 != 0 {
            warn!("output directory is world-writable: {}", path.display());
        }
    }
    #[cfg(not(unix))]
    let _ = metadata;

    Ok(())
}

/// Hex SHA-256 of a file, streamed in 1 MiB reads.
pub fn sha256_file(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 1024 * 1024];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}
