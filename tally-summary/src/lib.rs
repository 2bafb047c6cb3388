//! tally-summary: groups canonical sale records into product and month summaries

pub mod aggregator;

pub use aggregator::{Aggregator, summarize_by_month, summarize_by_product};
