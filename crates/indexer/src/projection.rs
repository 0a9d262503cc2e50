use crate::index::{ForwardMap, TraceIndex};
use crate::Result;
use facet_catalog::write_atomic;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// Flattened `file -> line -> facet ids` artifact for consumers that only need to know
/// what a piece of code implements.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CoverageProjection(pub ForwardMap);

/// Per-file totals for the text rendering of a projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileProjectionSummary {
    pub file: String,
    pub lines: usize,
    pub facets: Vec<String>,
}

impl CoverageProjection {
    pub fn from_index(index: &TraceIndex) -> Self {
        Self(index.forward.clone())
    }

    pub fn from_forward(forward: ForwardMap) -> Self {
        Self(forward)
    }

    pub fn files(&self) -> &ForwardMap {
        &self.0
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let mut bytes = serde_json::to_vec_pretty(self)?;
        bytes.push(b'\n');
        write_atomic(path, &bytes)?;
        Ok(())
    }

    pub fn summarize(&self) -> Vec<FileProjectionSummary> {
        self.0
            .iter()
            .map(|(file, by_line)| FileProjectionSummary {
                file: file.clone(),
                lines: by_line.len(),
                facets: by_line
                    .values()
                    .flatten()
                    .cloned()
                    .collect::<BTreeSet<_>>()
                    .into_iter()
                    .collect(),
            })
            .collect()
    }
}
