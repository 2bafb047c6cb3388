use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tally_core::NumberLocale;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

mod config;
mod pipeline;

use config::{Overrides, ReportConfig};

#[derive(Parser, Debug)]
#[command(
    name = "tally",
    version,
    about = "Turn a sales spreadsheet into a PDF report"
)]
struct Cli {
    /// Spreadsheet to read (.xlsx, .xlsm, .xls, .xlsb, .ods or .csv)
    input: PathBuf,

    /// Where to write the PDF
    output: PathBuf,

    /// TOML file with report settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Report title
    #[arg(long)]
    title: Option<String>,

    /// How many products to rank
    #[arg(long)]
    top_n: Option<usize>,

    /// Number format: en, pt-BR or de
    #[arg(long)]
    locale: Option<NumberLocale>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let config = ReportConfig::resolve(
        cli.config.as_deref(),
        Overrides {
            title: cli.title,
            top_n: cli.top_n,
            locale: cli.locale,
        },
    )?;
    info!(?config, "starting report");

    let generated_at = chrono::Local::now().naive_local();
    let report = pipeline::run(&cli.input, &cli.output, &config, generated_at)?;

    println!(
        "Wrote {} ({} records, {} skipped, {} products, {} months)",
        cli.output.display(),
        report.summary.record_count,
        report.skipped_rows,
        report.summary.distinct_products,
        report.summary.months.len()
    );
    Ok(())
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
