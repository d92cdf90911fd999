//! docs-backup - incremental backup of Google Docs to a local directory
//!
//! Exports every Google Doc, Sheet, Slides deck and Form the user can see
//! into a folder tree under the destination directory. Documents whose
//! version has not changed since the last run are not downloaded again.

use anyhow::{Context, Result};
use clap::Parser;
use drive::{DriveAuth, DriveClient, DriveCredentials, SyncEngine, SyncError, SyncOptions, SyncStats};
use log::info;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "docs-backup", version)]
#[command(about = "Back up Google Docs, Sheets, Slides and Forms to a local directory", long_about = None)]
struct Cli {
    /// Local directory to place backup files in
    #[arg(short, long)]
    destination: PathBuf,

    /// Show verbose debug information
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp_millis()
        .init();

    match backup(&cli.destination) {
        Ok(stats) => {
            println!("{}", summary(&stats));
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            if e.downcast_ref::<SyncError>().is_some_and(SyncError::is_structural) {
                eprintln!("This is caused by how folders are arranged in Drive; retrying will not help.");
            }
            ExitCode::FAILURE
        }
    }
}

fn summary(stats: &SyncStats) -> String {
    format!(
        "Backed up {} documents: {} downloaded ({} bytes), {} unchanged",
        stats.documents_listed,
        stats.documents_downloaded,
        stats.bytes_downloaded,
        stats.documents_skipped
    )
}

fn backup(destination: &Path) -> Result<SyncStats> {
    config::init().context("Failed to initialize config directory")?;

    let destination = std::path::absolute(destination)
        .with_context(|| format!("Invalid destination: {}", destination.display()))?;
    std::fs::create_dir_all(&destination)
        .with_context(|| format!("Failed to create destination: {}", destination.display()))?;

    let credentials = DriveCredentials::load()?;
    let auth = DriveAuth::new(credentials.client_id, credentials.client_secret)?;
    let client = DriveClient::new(auth);
    client.authenticate().context("Drive authentication failed")?;

    info!("Backing up Google Docs to {}", destination.display());
    let mut engine = SyncEngine::new(&client, &destination, SyncOptions::default());
    let stats = engine.run_with_progress(|count| info!("Listing {} files", count))?;

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_destination_is_required() {
        assert!(Cli::try_parse_from(["docs-backup"]).is_err());
    }

    #[test]
    fn test_parse_flags() {
        let cli = Cli::try_parse_from(["docs-backup", "-d", "/tmp/backup", "-v"]).unwrap();
        assert_eq!(cli.destination, PathBuf::from("/tmp/backup"));
        assert!(cli.verbose);

        let cli = Cli::try_parse_from(["docs-backup", "--destination", "out"]).unwrap();
        assert!(!cli.verbose);
    }

    #[test]
    fn test_summary_line() {
        let stats = SyncStats {
            documents_listed: 5,
            documents_downloaded: 2,
            documents_skipped: 3,
            bytes_downloaded: 2048,
            duration_ms: 10,
        };
        assert_eq!(
            summary(&stats),
            "Backed up 5 documents: 2 downloaded (2048 bytes), 3 unchanged"
        );
    }

    #[test]
    fn test_extra_arguments_are_rejected() {
        assert!(Cli::try_parse_from(["docs-backup", "-d", "out", "stray"]).is_err());
    }
}
