//! Aggregated summary types handed from the aggregator to the renderers

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::record::YearMonth;

/// Default number of products kept in the ranking
pub const DEFAULT_TOP_N: usize = 10;

/// One ranked product (rank starts at 1)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSummary {
    pub product: String,
    pub total_amount: Decimal,
    pub rank: usize,
}

/// Total sales for one calendar month that has at least one record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthSummary {
    pub month: YearMonth,
    pub total_amount: Decimal,
}

/// Everything the charts and the document need from one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesSummary {
    /// Descending by total, ties by label ascending, at most `top_n` entries
    pub products: Vec<ProductSummary>,
    /// Ascending by month, never zero-filled
    pub months: Vec<MonthSummary>,
    pub record_count: usize,
    /// Distinct products before top-N truncation
    pub distinct_products: usize,
    pub grand_total: Decimal,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
}

impl SalesSummary {
    pub fn is_empty(&self) -> bool {
        self.record_count == 0
    }

    /// Sum over the (possibly truncated) product ranking
    pub fn ranked_total(&self) -> Decimal {
        self.products.iter().map(|p| p.total_amount).sum()
    }

    pub fn monthly_total(&self) -> Decimal {
        self.months.iter().map(|m| m.total_amount).sum()
    }
}
