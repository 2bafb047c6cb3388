//! Property checks for the aggregator over arbitrary record sets.

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use tally_core::SaleRecord;
use tally_summary::Aggregator;

fn record_strategy() -> impl Strategy<Value = SaleRecord> {
    (
        2020i32..2026,
        1u32..=12,
        1u32..=28,
        prop::sample::select(vec!["Camiseta", "Tênis", "Bermuda", "Meia", "Boné", "Widget"]),
        0i64..1_000_000,
    )
        .prop_map(|(y, m, d, product, cents)| {
            let date = NaiveDate::from_ymd_opt(y, m, d).unwrap();
            SaleRecord::new(date, product, Decimal::new(cents, 2)).unwrap()
        })
}

proptest! {
    #[test]
    fn totals_are_conserved(records in prop::collection::vec(record_strategy(), 0..200)) {
        // six possible products, so a top 10 never truncates
        let s = Aggregator::default().summarize(&records).unwrap();
        let all: Decimal = records.iter().map(|r| r.amount).sum();
        prop_assert_eq!(s.ranked_total(), all);
        prop_assert_eq!(s.monthly_total(), all);
        prop_assert_eq!(s.grand_total, all);
    }

    #[test]
    fn products_are_ranked(records in prop::collection::vec(record_strategy(), 0..200), n in 1usize..8) {
        let s = Aggregator::new(n).unwrap().summarize(&records).unwrap();
        prop_assert!(s.products.len() <= n);
        for (i, p) in s.products.iter().enumerate() {
            prop_assert_eq!(p.rank, i + 1);
        }
        for w in s.products.windows(2) {
            prop_assert!(
                w[0].total_amount > w[1].total_amount
                    || (w[0].total_amount == w[1].total_amount && w[0].product < w[1].product)
            );
        }
    }

    #[test]
    fn months_are_chronological_and_present(records in prop::collection::vec(record_strategy(), 0..200)) {
        let s = Aggregator::default().summarize(&records).unwrap();
        for w in s.months.windows(2) {
            prop_assert!(w[0].month < w[1].month);
        }
        for m in &s.months {
            prop_assert!(records.iter().any(|r| r.month() == m.month));
        }
        for r in &records {
            prop_assert!(s.months.iter().any(|m| m.month == r.month()));
        }
    }

    #[test]
    fn input_order_does_not_matter(records in prop::collection::vec(record_strategy(), 0..100)) {
        let mut reversed = records.clone();
        reversed.reverse();
        let a = Aggregator::default().summarize(&records).unwrap();
        let b = Aggregator::default().summarize(&reversed).unwrap();
        prop_assert_eq!(a, b);
    }
}
