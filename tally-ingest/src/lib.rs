//! tally-ingest: spreadsheet acquisition and schema normalization into canonical sale records.

pub mod normalize;
pub mod parsers;
pub mod sheet;
pub mod types;

pub use normalize::{ColumnMap, Field, Normalized, Normalizer, normalize_table};
pub use sheet::read_table;
pub use types::{CellValue, RawRow, RawTable};
