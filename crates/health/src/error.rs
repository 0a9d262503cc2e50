use thiserror::Error;

pub type Result<T> = std::result::Result<T, HealthError>;

#[derive(Error, Debug)]
pub enum HealthError {
    #[error("Unknown check category '{0}' (expected one of: {1})")]
    UnknownCategory(String, String),
}
