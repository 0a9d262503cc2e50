//! # Facet Indexer
//!
//! Derives which source lines implement which facet.
//!
//! ## Pipeline
//!
//! ```text
//! junit.xml ──> TestReport (test id -> passed | failed)
//!                    │
//! coverage.json ──> CoverageReport (file -> test id -> lines)
//!                    │
//! facets.json ──> facet -> test links
//!                    │
//!                    └──> IndexBuilder
//!                           ├─ forward: file -> line -> facets
//!                           ├─ reverse: facet -> file -> lines
//!                           ├─ test_results / facet_status caches
//!                           └─ facet status write-back
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use facet_catalog::ProjectLayout;
//! use facet_indexer::{ProjectIndexer, ReportPaths};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let indexer = ProjectIndexer::new(ProjectLayout::new("/path/to/project"));
//!     let outcome = indexer.index(&ReportPaths {
//!         junit: "junit.xml".into(),
//!         coverage: "coverage.json".into(),
//!     })?;
//!
//!     println!("{} status changes", outcome.stats.status_changes.len());
//!     Ok(())
//! }
//! ```

mod builder;
mod coverage;
mod error;
mod index;
mod indexer;
mod junit;
mod projection;
mod stats;

pub use builder::{map_coverage, BuildOutcome, IndexBuilder};
pub use coverage::{CoverageReport, FileCoverage};
pub use error::{IndexerError, Result};
pub use index::{ForwardMap, ReverseMap, TraceIndex};
pub use indexer::{ProjectIndexer, ReportPaths};
pub use junit::{parse_junit, test_id, TestOutcome, TestReport};
pub use projection::{CoverageProjection, FileProjectionSummary};
pub use stats::{BuildStats, StatusChange};
