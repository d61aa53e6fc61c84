//! Fleet ETL command-line entry point.
//!
//! `run` processes a batch of files for one configured source, writes the
//! deliverables and prints the JSON batch report; `inspect` shows how a
//! file's sheets would be read.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fleet_etl::config::ConfigLoader;
use fleet_etl::export::{ExportFormat, Exporter};
use fleet_etl::pipeline::Pipeline;

/// Command-line arguments for fleet-etl
#[derive(Parser, Debug)]
#[command(name = "fleet-etl")]
#[command(about = "Normalizes fleet spreadsheets into clean deliverables")]
#[command(version)]
struct Args {
    /// Configuration directory (pipeline.yaml + sources/)
    #[arg(short, long, default_value = "./config")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Process files and write deliverables
    Run {
        /// Source configuration to apply
        #[arg(short, long)]
        source: String,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = ExportFormat::Csv)]
        format: ExportFormat,

        /// Output directory
        #[arg(short, long, default_value = "./out")]
        out: PathBuf,

        /// Also write the JSON batch report to this file
        #[arg(long)]
        report: Option<PathBuf>,

        /// Exit non-zero if a file was skipped or an allocation is still over the limit
        #[arg(long, default_value = "false")]
        strict: bool,

        /// Input files (.csv, .xlsx, .xls, .xlsm)
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Show detected sheets, header rows and column mappings
    Inspect {
        /// Source configuration to apply
        #[arg(short, long)]
        source: String,

        /// File to inspect
        file: PathBuf,
    },
    /// List configured sources
    Sources,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fleet_etl=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let loader = ConfigLoader::load(&args.config).with_context(|| {
        format!("Failed to load configuration from {}", args.config.display())
    })?;

    match args.command {
        Command::Run {
            source,
            format,
            out,
            report,
            strict,
            files,
        } => {
            let pipeline = Pipeline::from_loader(&loader, &source)?;
            let mut outcome = pipeline.process_files(&files);

            let exporter = Exporter::new(pipeline.source(), &out);
            let summary = outcome
                .export(&exporter, format)
                .context("Failed to write deliverables")?;
            info!(
                files = summary.files.len(),
                partitions = summary.partitions.len(),
                out = %out.display(),
                "Export complete"
            );

            let adjustments = outcome.data.allocations().map(|r| &r.adjustments);
            if let Some(adjustments) = adjustments.filter(|a| !a.is_empty()) {
                let path = out.join(format!("{}_adjustments.json", pipeline.source().file_stem()));
                let json = serde_json::to_string_pretty(adjustments)?;
                fs::write(&path, json)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                info!(path = %path.display(), count = adjustments.len(), "Adjustment audit written");
            }

            let json = serde_json::to_string_pretty(&outcome.report)?;
            if let Some(path) = report {
                fs::write(&path, &json)
                    .with_context(|| format!("Failed to write report to {}", path.display()))?;
            }
            println!("{}", json);

            if strict && !outcome.report.is_clean() {
                bail!(
                    "batch not clean: {} file(s) skipped, {} residual allocation violation(s)",
                    outcome.report.files_skipped,
                    outcome.report.residual_violations
                );
            }
        }
        Command::Inspect { source, file } => {
            let pipeline = Pipeline::from_loader(&loader, &source)?;
            let inspections = pipeline
                .inspect_file(&file)
                .with_context(|| format!("Failed to inspect {}", file.display()))?;
            println!("{}", serde_json::to_string_pretty(&inspections)?);
        }
        Command::Sources => {
            for name in loader.source_names() {
                println!("{}", name);
            }
        }
    }

    Ok(())
}
