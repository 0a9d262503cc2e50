use thiserror::Error;

pub type Result<T> = std::result::Result<T, IndexerError>;

#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Catalog error: {0}")]
    CatalogError(#[from] facet_catalog::CatalogError),

    #[error("Report not found: {0}")]
    ReportMissing(String),

    #[error("Malformed test report: {0}")]
    MalformedJunit(String),

    #[error("Malformed coverage report: {0}")]
    MalformedCoverage(String),

    #[error("Index file is corrupt: {0}")]
    CorruptIndex(String),

    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for IndexerError {
    fn from(err: serde_json::Error) -> Self {
        IndexerError::Other(format!("JSON serialization failed: {err}"))
    }
}
