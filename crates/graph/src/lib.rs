//! # Facet Graph
//!
//! Motivation resolution: which goals and expectations justify a piece of code.
//!
//! ## Architecture
//!
//! ```text
//! (file, line range)
//!     │
//!     ├──> Forward index lookup
//!     │      └─ covering facet ids
//!     │
//!     ├──> Ancestor chains (facet → expectation → goal)
//!     │
//!     └──> Motivation tree (petgraph)
//!            ├─ Nodes: catalog nodes, each at most once
//!            ├─ Edges: parent → child
//!            └─ Rendering: depth-first, id-sorted, G/E/F markers
//! ```

mod resolver;
mod types;

pub use resolver::MotivationResolver;
pub use types::{MotivationNode, MotivationTree, NestedMotivation};
