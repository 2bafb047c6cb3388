use plotters::drawing::DrawingAreaErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("chart drawing failed: {0}")]
    Chart(String),

    #[error("pdf assembly failed: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("pdf serialization failed: {0}")]
    Io(#[from] std::io::Error),
}

impl<E: std::error::Error + Send + Sync> From<DrawingAreaErrorKind<E>> for RenderError {
    fn from(err: DrawingAreaErrorKind<E>) -> Self {
        RenderError::Chart(err.to_string())
    }
}
