use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;
use tracing::{error, info, warn};

use trailhound::{browser, cli, logging, reputation, run, search, util};

// grep-style outcome codes shared by every subcommand
const EXIT_OK: u8 = 0;
const EXIT_NO_DATA: u8 = 1;
const EXIT_FATAL: u8 = 2;

fn main() -> ExitCode {
    logging::init_logging();

    let cli = cli::parse();
    match dispatch(cli) {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            error!("{err:#}");
            ExitCode::from(EXIT_FATAL)
        }
    }
}

fn dispatch(cli: cli::Cli) -> Result<u8> {
    match cli.command {
        cli::Command::Extract(args) => extract_cmd(args),
        cli::Command::Search(args) => search_cmd(args),
        cli::Command::Reputation(args) => reputation_cmd(args),
    }
}

fn extract_cmd(args: cli::ExtractArgs) -> Result<u8> {
    util::ensure_output_dir(&args.output)?;
    if args.hash_source {
        let digest = util::sha256_file(&args.file)?;
        info!("source sha256={digest}");
    }

    let profile = browser::BrowserProfile::new(util::browser_from_cli(args.browser), args.file);
    let summary = run::run_extract(&profile, &args.output)?;
    match summary.outcome() {
        run::RunOutcome::Exported { .. } => Ok(EXIT_OK),
        run::RunOutcome::NoData => Ok(EXIT_NO_DATA),
    }
}

fn search_cmd(args: cli::SearchArgs) -> Result<u8> {
    let summary = search::run_search(&args.pattern, &args.root, &args.output, args.add_source)?;
    if summary.rows_matched == 0 {
        warn!("no occurrences of {:?} under {}", args.pattern, args.root.display());
        return Ok(EXIT_NO_DATA);
    }
    Ok(EXIT_OK)
}

fn reputation_cmd(args: cli::ReputationArgs) -> Result<u8> {
    let flagged = reputation::run_reputation(
        &args.inventory,
        &args.output,
        args.api_key.as_deref(),
        Duration::from_secs(args.delay_secs),
    )?;
    if flagged == 0 {
        return Ok(EXIT_NO_DATA);
    }
    Ok(EXIT_OK)
}
