//! Aggregator: per-product ranking and per-month totals.
//!
//! Ordering is fully deterministic. Products sort by total descending, then by
//! label ascending; months sort chronologically. Input order never matters.

use anyhow::Result;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use tally_core::{
    DEFAULT_TOP_N, MonthSummary, ProductSummary, ReportError, SaleRecord, SalesSummary, YearMonth,
};
use tracing::info;

/// Builds a [`SalesSummary`] keeping the top `top_n` products
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Aggregator {
    top_n: usize,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self {
            top_n: DEFAULT_TOP_N,
        }
    }
}

impl Aggregator {
    pub fn new(top_n: usize) -> Result<Self> {
        if top_n == 0 {
            return Err(ReportError::InvalidConfig("top_n must be at least 1".into()).into());
        }
        Ok(Self { top_n })
    }

    pub fn top_n(&self) -> usize {
        self.top_n
    }

    pub fn summarize(&self, records: &[SaleRecord]) -> Result<SalesSummary> {
        let mut products = summarize_by_product(records)?;
        let distinct_products = products.len();
        products.truncate(self.top_n);

        let months = summarize_by_month(records)?;
        let grand_total = checked_sum(records.iter().map(|r| r.amount))?;

        let summary = SalesSummary {
            products,
            months,
            record_count: records.len(),
            distinct_products,
            grand_total,
            first_date: records.iter().map(|r| r.date).min(),
            last_date: records.iter().map(|r| r.date).max(),
        };

        info!(
            records = summary.record_count,
            products = summary.distinct_products,
            months = summary.months.len(),
            total = %summary.grand_total,
            "aggregated sales"
        );
        Ok(summary)
    }
}

/// Every distinct product, ranked. Not truncated.
pub fn summarize_by_product(records: &[SaleRecord]) -> Result<Vec<ProductSummary>> {
    let mut totals: HashMap<&str, Decimal> = HashMap::new();
    for rec in records {
        let slot = totals.entry(rec.product.as_str()).or_insert(Decimal::ZERO);
        *slot = slot
            .checked_add(rec.amount)
            .ok_or(ReportError::AmountOverflow)?;
    }

    let mut ranked: Vec<(&str, Decimal)> = totals.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    Ok(ranked
        .into_iter()
        .enumerate()
        .map(|(i, (product, total_amount))| ProductSummary {
            product: product.to_string(),
            total_amount,
            rank: i + 1,
        })
        .collect())
}

/// One entry per month that has records, oldest first
pub fn summarize_by_month(records: &[SaleRecord]) -> Result<Vec<MonthSummary>> {
    let mut totals: BTreeMap<YearMonth, Decimal> = BTreeMap::new();
    for rec in records {
        let slot = totals.entry(rec.month()).or_insert(Decimal::ZERO);
        *slot = slot
            .checked_add(rec.amount)
            .ok_or(ReportError::AmountOverflow)?;
    }

    Ok(totals
        .into_iter()
        .map(|(month, total_amount)| MonthSummary {
            month,
            total_amount,
        })
        .collect())
}

fn checked_sum(amounts: impl Iterator<Item = Decimal>) -> Result<Decimal> {
    let mut total = Decimal::ZERO;
    for a in amounts {
        total = total.checked_add(a).ok_or(ReportError::AmountOverflow)?;
    }
    Ok(total)
}
