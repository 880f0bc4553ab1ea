//! # Timestamp Conversion
//!
//! Browser history databases store visit times as raw integers whose meaning
//! depends on the browser family. Chromium-family databases count microseconds
//! since 1601-01-01 00:00:00 UTC (the WebKit epoch); Firefox counts
//! microseconds since the Unix epoch. Both are rendered into one canonical
//! human-readable form so every exported CSV carries the same notation.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Microseconds between the WebKit epoch (1601-01-01) and the Unix epoch
/// (1970-01-01): 11_644_473_600 seconds.
const WEBKIT_UNIX_OFFSET_MICROS: i64 = 11_644_473_600_000_000;

const MICROS_PER_SEC: i64 = 1_000_000;

/// Timestamp base of a browser family.
///
/// The epoch is fixed by the schema the value came from. It is never guessed
/// from the magnitude of the value: a small Chromium timestamp decodes to a
/// 1601-era date rather than being reinterpreted as a Unix time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Epoch {
    /// Microseconds since 1601-01-01 00:00:00 UTC.
    WebKit,
    /// Microseconds since 1970-01-01 00:00:00 UTC.
    UnixMicros,
}

impl Epoch {
    pub fn label(self) -> &'static str {
        match self {
            Epoch::WebKit => "webkit",
            Epoch::UnixMicros => "unix-micros",
        }
    }

    /// Convert a raw database value to `YYYY-MM-DD HH:MM:SS UTC`.
    ///
    /// Conversion is exact integer arithmetic; sub-second precision is
    /// truncated when rendering. Values outside the representable calendar
    /// range fail with [`ConversionError`] instead of clamping to a
    /// placeholder date.
    pub fn to_utc(self, micros: i64) -> Result<String, ConversionError> {
        let unix_micros = match self {
            Epoch::WebKit => micros
                .checked_sub(WEBKIT_UNIX_OFFSET_MICROS)
                .ok_or(ConversionError { micros, epoch: self.label() })?,
            Epoch::UnixMicros => micros,
        };
        // Floor division keeps pre-epoch values on the correct side of the
        // second boundary (-1us is 23:59:59, not 00:00:00).
        let secs = unix_micros.div_euclid(MICROS_PER_SEC);
        let nanos = (unix_micros.rem_euclid(MICROS_PER_SEC) * 1_000) as u32;
        let moment = DateTime::<Utc>::from_timestamp(secs, nanos)
            .ok_or(ConversionError { micros, epoch: self.label() })?;
        Ok(moment.format("%Y-%m-%d %H:%M:%S UTC").to_string())
    }
}

/// A stored timestamp that cannot be expressed as a calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{epoch} timestamp {micros} is outside the representable date range")]
pub struct ConversionError {
    pub micros: i64,
    pub epoch: &'static str,
}
