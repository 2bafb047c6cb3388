//! One report run: read, normalize, aggregate, chart, compose, write.

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use std::io::Write;
use std::path::{Path, PathBuf};
use tally_core::{ReportError, SalesSummary};
use tally_ingest::{normalize_table, read_table};
use tally_render::{ChartRenderer, Composer, ReportMeta};
use tally_summary::Aggregator;
use tempfile::NamedTempFile;
use tracing::info;

use crate::config::ReportConfig;

/// Everything a finished run produced
#[derive(Debug)]
pub struct Report {
    pub summary: SalesSummary,
    pub skipped_rows: usize,
    pub pdf: Vec<u8>,
}

pub fn build_report(
    input: &Path,
    config: &ReportConfig,
    generated_at: NaiveDateTime,
) -> Result<Report> {
    let table = read_table(input)?;
    let normalized = normalize_table(&table)
        .with_context(|| format!("normalizing {}", input.display()))?;
    let summary = Aggregator::new(config.top_n)?.summarize(&normalized.records)?;

    let format = config.number_format();
    let charts = ChartRenderer::new(format);
    let product_chart = charts
        .product_chart(&summary.products)
        .context("rendering product chart")?;
    let month_chart = charts
        .month_chart(&summary.months)
        .context("rendering month chart")?;

    let meta = ReportMeta {
        title: config.title.clone(),
        subtitle: Some(config.subtitle_for(input)),
        generated_at,
        producer: producer(),
        skipped_rows: normalized.skipped_count(),
    };
    let pdf = Composer::new(format)
        .compose(&meta, &summary, &product_chart, &month_chart)
        .context("composing document")?;

    Ok(Report {
        summary,
        skipped_rows: normalized.skipped_count(),
        pdf,
    })
}

pub fn run(
    input: &Path,
    output: &Path,
    config: &ReportConfig,
    generated_at: NaiveDateTime,
) -> Result<Report> {
    let report = build_report(input, config, generated_at)?;
    write_atomic(output, &report.pdf)?;
    info!(
        output = %output.display(),
        bytes = report.pdf.len(),
        "wrote report"
    );
    Ok(report)
}

/// Write through a temp file in the target directory, then rename over
/// the target. On failure the target is untouched and the temp file is
/// removed when dropped.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), ReportError> {
    let fail = |source: std::io::Error| ReportError::OutputWriteFailure {
        path: path.to_path_buf(),
        source,
    };

    let dir = target_dir(path);
    let mut tmp = NamedTempFile::new_in(&dir).map_err(fail)?;
    tmp.write_all(bytes).map_err(fail)?;
    tmp.as_file().sync_all().map_err(fail)?;
    tmp.persist(path).map_err(|e| fail(e.error))?;
    Ok(())
}

fn target_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn producer() -> String {
    format!("tally {}", env!("CARGO_PKG_VERSION"))
}
