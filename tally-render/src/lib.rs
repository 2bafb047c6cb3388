//! tally-render: chart rendering and PDF document composition

pub mod backend;
pub mod chart;
pub mod document;
pub mod error;
pub mod font;

pub use chart::{ChartImage, ChartRenderer};
pub use document::{Composer, ReportMeta};
pub use error::RenderError;
