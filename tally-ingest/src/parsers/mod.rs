//! Cell-level parsers for the date and amount columns

pub mod amount;
pub mod date;

pub use amount::AmountParser;
pub use date::{excel_serial_to_date, parse_date_text};
