//! # Facet Catalog
//!
//! Durable goal → expectation → facet hierarchy with derived status.
//!
//! ## Architecture
//!
//! ```text
//! facets.json
//!     │
//!     ├──> CatalogStore (load / mutate / atomic rewrite)
//!     │      └─ Catalog: ordered nodes, id allocation, ancestor chains
//!     │
//!     └──> StatusView
//!            ├─ facets: stored status
//!            ├─ expectations / goals: aggregated from children
//!            └─ Summary: satisfied, unsatisfied, coverage
//! ```
//!
//! Only facet status is persisted; everything above a facet is recomputed on read.

mod error;
mod model;
mod paths;
mod status;
mod store;

pub use error::{CatalogError, Result};
pub use model::{
    Catalog, Modification, NewNode, Node, NodeBody, NodeKind, Planning, Status, Verification,
    CATALOG_SCHEMA_VERSION, MAX_MODIFICATIONS,
};
pub use paths::{
    write_atomic, ProjectLayout, CATALOG_FILE_NAME, CONFIG_FILE_NAME, INDEX_FILE_NAME,
    PROJECTION_FILE_NAME, STATE_DIR_NAME,
};
pub use status::{aggregate, compute_status, coverage_percent, StatusView, Summary};
pub use store::CatalogStore;
