use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowserKind {
    Chrome,
    Edge,
    Brave,
    Opera,
    Firefox,
}

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Extract history artefacts from a browser database into CSV files
    Extract(ExtractArgs),
    /// Search exported CSV files for a pattern and merge the hits
    Search(SearchArgs),
    /// Check a hash inventory CSV against VirusTotal
    Reputation(ReputationArgs),
}

#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// Browser that produced the database
    #[arg(short, long, value_enum)]
    pub browser: BrowserKind,

    /// Path to the history database (History or places.sqlite)
    #[arg(short, long)]
    pub file: PathBuf,

    /// Output directory for the CSV files
    #[arg(short, long, default_value = ".")]
    pub output: PathBuf,

    /// Log the SHA-256 of the source database before extraction
    #[arg(long)]
    pub hash_source: bool,
}

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Case-insensitive regular expression tested against every cell
    pub pattern: String,

    /// Directory tree to scan for CSV files
    #[arg(default_value = ".")]
    pub root: PathBuf,

    /// Output CSV for the matching rows
    #[arg(short, long, default_value = "IOC.csv")]
    pub output: PathBuf,

    /// Record each matching row's file in a Source_File column
    #[arg(long)]
    pub add_source: bool,
}

#[derive(Args, Debug)]
pub struct ReputationArgs {
    /// Inventory CSV with FullPath, SHA1 and FileKeyLastWriteTimestamp columns
    pub inventory: PathBuf,

    /// Output CSV for flagged entries
    #[arg(short, long, default_value = "reputation_results.csv")]
    pub output: PathBuf,

    /// VirusTotal API key (prompted for when omitted)
    #[arg(long)]
    pub api_key: Option<String>,

    /// Seconds to wait between lookups (the free tier allows 4 per minute)
    #[arg(long, default_value_t = 15)]
    pub delay_secs: u64,
}

pub fn parse() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::{BrowserKind, Cli, Command};
    use clap::Parser;

    #[test]
    fn parses_extract_with_browser_and_file() {
        let cli = Cli::try_parse_from([
            "trailhound",
            "extract",
            "--browser",
            "firefox",
            "--file",
            "places.sqlite",
        ])
        .expect("parse");
        match cli.command {
            Command::Extract(args) => {
                assert_eq!(args.browser, BrowserKind::Firefox);
                assert_eq!(args.file.to_str(), Some("places.sqlite"));
                assert_eq!(args.output.to_str(), Some("."));
                assert!(!args.hash_source);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_browser() {
        let result = Cli::try_parse_from([
            "trailhound",
            "extract",
            "--browser",
            "netscape",
            "--file",
            "History",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn extract_requires_the_file_argument() {
        let result = Cli::try_parse_from(["trailhound", "extract", "--browser", "chrome"]);
        assert!(result.is_err());
    }

    #[test]
    fn parses_search_with_defaults() {
        let cli = Cli::try_parse_from(["trailhound", "search", "evil.example"]).expect("parse");
        match cli.command {
            Command::Search(args) => {
                assert_eq!(args.pattern, "evil.example");
                assert_eq!(args.root.to_str(), Some("."));
                assert_eq!(args.output.to_str(), Some("IOC.csv"));
                assert!(!args.add_source);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn parses_search_with_root_and_source_flag() {
        let cli = Cli::try_parse_from([
            "trailhound",
            "search",
            "stage2",
            "/cases/2024-001/exports",
            "--add-source",
            "-o",
            "hits.csv",
        ])
        .expect("parse");
        match cli.command {
            Command::Search(args) => {
                assert_eq!(args.root.to_str(), Some("/cases/2024-001/exports"));
                assert_eq!(args.output.to_str(), Some("hits.csv"));
                assert!(args.add_source);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn parses_reputation_delay_override() {
        let cli = Cli::try_parse_from([
            "trailhound",
            "reputation",
            "inventory.csv",
            "--api-key",
            "abcdef",
            "--delay-secs",
            "0",
        ])
        .expect("parse");
        match cli.command {
            Command::Reputation(args) => {
                assert_eq!(args.inventory.to_str(), Some("inventory.csv"));
                assert_eq!(args.api_key.as_deref(), Some("abcdef"));
                assert_eq!(args.delay_secs, 0);
                assert_eq!(args.output.to_str(), Some("reputation_results.csv"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
