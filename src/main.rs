//! es2scan - Multi-page document scanning on top of epsonscan2
//!
//! Main entry point for the command line application.
//!
//! # Execution Flow
//!
//! 1. Parse arguments and initialize logging (console, optional rotating file)
//! 2. Load the base settings file; a broken file aborts before any scan
//! 3. Create the `scan_<YYYYMMDD_HHMMSS>/` working directory
//! 4. Scan page by page until the page bound (or empty feeder) stops the session
//! 5. Merge the pages into `scan_<YYYYMMDD_HHMMSS>.pdf` and remove the working directory
//!
//! # Exit Codes
//!
//! - `0`: document written
//! - `1`: startup failure (logging, runtime)
//! - `2`: settings file missing, malformed or unwritable
//! - `3`: scanner driver missing or failing persistently
//! - `4`: merge failed (working directory kept)
//! - `5`: working directory could not be created

use anyhow::{Context, Result};
use camino::Utf8Path;
use clap::Parser;
use es2scan::cli::Cli;
use es2scan::services::{Epsonscan2Invoker, MagickAssembler};
use es2scan::session::{DocumentReport, TracingObserver};
use es2scan::{logging, scan_document, ScanConfiguration, SessionError, Workspace, APP_NAME, VERSION};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    match try_main(&cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn try_main(cli: &Cli) -> Result<ExitCode> {
    // Held until exit so buffered file logs are flushed
    let _guard = logging::setup_logging(cli.log_dir.as_deref(), cli.debug)?;

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    // One device, one driver process at a time
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")?;

    match runtime.block_on(run(cli)) {
        Ok(report) => {
            tracing::info!(
                "Scanned {} pages into {}",
                report.assembly.pages,
                report.assembly.output
            );
            if cli.json {
                let json = serde_json::to_string_pretty(&report)
                    .context("Failed to serialize run report")?;
                println!("{}", json);
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            tracing::error!("{}", e);
            Ok(ExitCode::from(e.exit_code()))
        }
    }
}

async fn run(cli: &Cli) -> Result<DocumentReport, SessionError> {
    let settings = cli.session_settings();

    let config = ScanConfiguration::load(&cli.settingsfile)?;
    let workspace = Workspace::create_now(Utf8Path::new("."))?;

    let invoker = Epsonscan2Invoker::new(settings.driver_program.clone(), settings.driver_timeout);
    let mut assembler = MagickAssembler::new(settings.converter_program.clone());

    scan_document(
        config,
        &workspace,
        &settings,
        invoker,
        &mut assembler,
        TracingObserver,
    )
    .await
}
