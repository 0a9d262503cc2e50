use crate::{IndexerError, Result};
use facet_catalog::ProjectLayout;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// Contexts-style coverage export: file -> test id -> executed lines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageReport {
    #[serde(default)]
    pub files: BTreeMap<String, FileCoverage>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileCoverage {
    #[serde(default)]
    pub contexts: BTreeMap<String, Vec<u32>>,
}

impl CoverageReport {
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(IndexerError::ReportMissing(path.display().to_string()))
            }
            Err(err) => return Err(err.into()),
        };
        Self::parse(&bytes)
            .map_err(|err| IndexerError::MalformedCoverage(format!("{}: {err}", path.display())))
    }

    pub fn parse(bytes: &[u8]) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Rewrites file keys into the root-relative form queries use.
    ///
    /// Keys that collapse onto the same file (`./src/a.py`, `<root>/src/a.py`) are merged.
    pub fn relative_to(self, layout: &ProjectLayout) -> Self {
        let mut files: BTreeMap<String, FileCoverage> = BTreeMap::new();
        for (file, coverage) in self.files {
            let merged = files.entry(layout.relativize(&file)).or_default();
            for (test, lines) in coverage.contexts {
                merged.contexts.entry(test).or_default().extend(lines);
            }
        }
        Self { files }
    }

    /// Inverts the report: test id -> [(file, lines)].
    pub fn by_test(&self) -> HashMap<&str, Vec<(&str, &[u32])>> {
        let mut out: HashMap<&str, Vec<(&str, &[u32])>> = HashMap::new();
        for (file, coverage) in &self.files {
            for (test, lines) in &coverage.contexts {
                out.entry(test.as_str())
                    .or_default()
                    .push((file.as_str(), lines.as_slice()));
            }
        }
        out
    }
}
