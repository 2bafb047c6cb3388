//! Canonical sale records produced by the normalizer

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single well-typed sale: valid date, product label, non-negative amount
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleRecord {
    pub date: NaiveDate,
    pub product: String,
    pub amount: Decimal,
}

impl SaleRecord {
    /// Build a record, rejecting negative amounts and blank product labels.
    pub fn new(date: NaiveDate, product: impl Into<String>, amount: Decimal) -> Option<Self> {
        let product = product.into();
        if amount.is_sign_negative() && !amount.is_zero() {
            return None;
        }
        if product.trim().is_empty() {
            return None;
        }
        Some(Self {
            date,
            product,
            amount,
        })
    }

    /// Calendar month this sale falls into
    pub fn month(&self) -> YearMonth {
        YearMonth::from_date(self.date)
    }
}

/// Year-month grouping key, ordered chronologically
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// First day of the month
    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    /// Short axis label, e.g. "Jan 2024"
    pub fn short_label(&self) -> String {
        self.first_day().format("%b %Y").to_string()
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::dec;

    #[test]
    fn test_rejects_negative_amount() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        assert!(SaleRecord::new(date, "Widget", dec!(-1)).is_none());
        assert!(SaleRecord::new(date, "Widget", dec!(0)).is_some());
        assert!(SaleRecord::new(date, "  ", dec!(3)).is_none());
    }

    #[test]
    fn test_year_month_ordering_and_display() {
        let a = YearMonth::new(2023, 12).unwrap();
        let b = YearMonth::new(2024, 1).unwrap();
        assert!(a < b);
        assert_eq!(b.to_string(), "2024-01");
        assert_eq!(b.short_label(), "Jan 2024");
        assert!(YearMonth::new(2024, 13).is_none());
    }

    #[test]
    fn test_month_of_record() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 18).unwrap();
        let rec = SaleRecord::new(date, "Meia", dec!(99.0)).unwrap();
        assert_eq!(rec.month(), YearMonth::new(2025, 3).unwrap());
    }
}
