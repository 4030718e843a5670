//! Airtable backup/restore tool
//!
//! Restores table dumps into Airtable-ready records, relinking attachments
//! through S3-compatible or local storage, and encodes files into the dump's
//! attachment format.

// airtabletool/src/main.rs
mod backup;
mod config;
mod descriptor;
mod errors;
mod restore;
mod storage;
mod utils;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::{AppConfig, RestoreOverrides, load_restore_config};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Back up and restore Airtable table attachments", long_about = None)]
struct Cli {
    /// Path to the JSON configuration file
    #[arg(long, global = true, default_value = "config.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args, Debug, Clone, Default)]
struct RestoreArgs {
    /// Table dump to read (overrides table_dump_path)
    #[arg(long)]
    input: Option<PathBuf>,

    /// Where to write restored records as JSON Lines (overrides output_path; stdout when unset)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Skip the MD5 check of decoded attachments
    #[arg(long)]
    no_integrity_check: bool,

    /// Ignore configured storage; attachment fields are omitted from the output
    #[arg(long)]
    no_storage: bool,

    /// Object name prefix for uploaded attachments (overrides folder_prefix)
    #[arg(long)]
    prefix: Option<String>,
}

impl From<RestoreArgs> for RestoreOverrides {
    fn from(args: RestoreArgs) -> Self {
        RestoreOverrides {
            table_dump_path: args.input,
            output_path: args.output,
            skip_integrity_check: args.no_integrity_check,
            no_storage: args.no_storage,
            prefix: args.prefix,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Decode attachments, upload them and write Airtable-ready records
    Restore(RestoreArgs),
    /// Check every attachment in a dump against its stored hash
    Verify {
        /// Table dump to read (overrides table_dump_path)
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// Encode files into attachment descriptors
    Encode {
        inputs: Vec<PathBuf>,

        /// Compress file bodies with LZMA (xz)
        #[arg(long)]
        compress: bool,

        /// Write descriptors here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

/// Main entry point for the backup/restore tool
#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    init_tracing();

    match run_app(Cli::parse()).await {
        Ok(_) => {
            eprintln!("✅ Operation completed successfully.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("❌ Error: {:?}", e);
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr so that stdout can carry restored records.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run_app(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Restore(args) => {
            eprintln!("🔄 Starting Restore Process...");
            let app_config = AppConfig::load_from_json(&cli.config).with_context(|| {
                format!("Failed to load application configuration from {}", cli.config.display())
            })?;
            let restore_config = load_restore_config(&app_config, &args.into())
                .context("Failed to load restore configuration")?;
            let summary = restore::run_restore_flow(&restore_config)
                .await
                .context("Restore process failed")?;
            eprintln!("Restored {} records from {}", summary.records, restore_config.table_dump_path.display());
        }
        Commands::Verify { input } => {
            eprintln!("🔍 Verifying attachments...");
            let app_config = AppConfig::load_from_json(&cli.config).with_context(|| {
                format!("Failed to load application configuration from {}", cli.config.display())
            })?;
            let overrides = RestoreOverrides {
                table_dump_path: input,
                no_storage: true,
                ..Default::default()
            };
            let restore_config = load_restore_config(&app_config, &overrides)
                .context("Failed to load verification configuration")?;
            let report = restore::run_verify_flow(&restore_config)?;
            report
                .write_json(std::io::stdout().lock())
                .context("Failed to write verification report")?;
            eprintln!(
                "Checked {} attachments in {} records, {} failed",
                report.attachments,
                report.records,
                report.corrupted.len()
            );
            if !report.is_clean() {
                anyhow::bail!(
                    "{} attachment(s) failed verification",
                    report.corrupted.len()
                );
            }
        }
        Commands::Encode { inputs, compress, output } => {
            if inputs.is_empty() {
                anyhow::bail!("No input files given to encode");
            }
            eprintln!("📦 Encoding {} input path(s)...", inputs.len());
            let descriptors = backup::run_encode_flow(&inputs, compress, output.as_deref())
                .context("Encode process failed")?;
            eprintln!("Encoded {} file(s)", descriptors.len());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_restore_flags_become_overrides() {
        let cli = Cli::parse_from([
            "airtabletool",
            "--config",
            "other.json",
            "restore",
            "--input",
            "dump.json",
            "--no-integrity-check",
            "--prefix",
            "files/",
        ]);
        assert_eq!(cli.config, PathBuf::from("other.json"));
        let Commands::Restore(args) = cli.command else {
            panic!("expected restore command");
        };
        let overrides: RestoreOverrides = args.into();
        assert_eq!(overrides.table_dump_path, Some(PathBuf::from("dump.json")));
        assert!(overrides.skip_integrity_check);
        assert!(!overrides.no_storage);
        assert_eq!(overrides.prefix.as_deref(), Some("files/"));
    }
}
