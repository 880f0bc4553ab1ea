//! Forensic browser-history triage toolkit.
//!
//! Reads Chromium-family (`History`) and Firefox (`places.sqlite`) databases
//! straight from disk images or profile copies, normalizes their epoch-bound
//! timestamps, and exports each artefact class to its own CSV. A search
//! command greps exported corpora for indicators and a reputation command
//! checks hash inventories against VirusTotal.

pub mod browser;
pub mod cli;
pub mod export;
pub mod extract;
pub mod logging;
pub mod records;
pub mod reputation;
pub mod run;
pub mod search;
pub mod timestamp;
pub mod util;
