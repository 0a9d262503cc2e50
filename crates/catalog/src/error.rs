use thiserror::Error;

pub type Result<T> = std::result::Result<T, CatalogError>;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Catalog is not valid JSON: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("Catalog not found at {0}")]
    Missing(String),

    #[error("Catalog already exists at {0}")]
    AlreadyExists(String),

    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Node {0} is not a facet")]
    NotAFacet(String),

    #[error("Node {id} has children ({children}); use --force to remove anyway")]
    HasChildren { id: String, children: String },

    #[error("Invalid parent: {0}")]
    InvalidParent(String),

    #[error("Unknown status '{0}' (expected untested, passing or failing)")]
    InvalidStatus(String),

    #[error("Duplicate node id: {0}")]
    DuplicateId(String),
}
