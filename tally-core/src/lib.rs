//! tally-core: canonical sales types, summaries, errors, and number formatting

pub mod error;
pub mod money;
pub mod record;
pub mod summary;

pub use error::{ReportError, SkipReason, SkippedRow};
pub use money::{NumberFormat, NumberLocale};
pub use record::{SaleRecord, YearMonth};
pub use summary::{MonthSummary, ProductSummary, SalesSummary, DEFAULT_TOP_N};
