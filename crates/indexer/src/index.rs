use crate::junit::TestOutcome;
use crate::{IndexerError, Result};
use facet_catalog::{write_atomic, Status};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use std::path::Path;

/// file -> line -> facet ids (sorted, de-duplicated).
pub type ForwardMap = BTreeMap<String, BTreeMap<u32, Vec<String>>>;

/// facet id -> file -> lines (sorted, de-duplicated).
pub type ReverseMap = BTreeMap<String, BTreeMap<String, Vec<u32>>>;

/// Derived traceability index. Rebuilt from scratch on every build; never hand-edited.
///
/// Line numbers are serialized as string keys in `forward`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceIndex {
    #[serde(default)]
    pub forward: ForwardMap,
    #[serde(default)]
    pub reverse: ReverseMap,
    #[serde(default)]
    pub test_results: BTreeMap<String, TestOutcome>,
    /// Facet statuses as of the build. Informational; the catalog stays authoritative.
    #[serde(default)]
    pub facet_status: BTreeMap<String, Status>,
}

impl TraceIndex {
    /// Reads the index at `path`; `None` when no build has run yet.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        match std::fs::read(path) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|err| IndexerError::CorruptIndex(format!("{}: {err}", path.display()))),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let mut bytes = serde_json::to_vec_pretty(self)?;
        bytes.push(b'\n');
        write_atomic(path, &bytes)?;
        log::debug!("wrote index to {}", path.display());
        Ok(())
    }

    /// Facet ids covering `file`, optionally restricted to an inclusive line range.
    pub fn facets_at(&self, file: &str, lines: Option<RangeInclusive<u32>>) -> Vec<String> {
        let Some(by_line) = self.forward.get(file) else {
            return Vec::new();
        };
        let mut ids: Vec<String> = match lines {
            Some(range) if range.start() > range.end() => Vec::new(),
            Some(range) => by_line
                .range(range)
                .flat_map(|(_, ids)| ids.iter().cloned())
                .collect(),
            None => by_line.values().flatten().cloned().collect(),
        };
        ids.sort();
        ids.dedup();
        ids
    }

    /// Outcome the last run recorded for `test`, as a facet status.
    pub fn implied_status(&self, test: &str) -> Option<Status> {
        self.test_results.get(test).map(|outcome| match outcome {
            TestOutcome::Passed => Status::Passing,
            TestOutcome::Failed => Status::Failing,
        })
    }

    pub fn covered_lines(&self) -> usize {
        self.forward.values().map(BTreeMap::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn sample() -> TraceIndex {
        let mut index = TraceIndex::default();
        let file = index.forward.entry("src/lib.rs".to_string()).or_default();
        file.insert(2, vec!["f-001".to_string()]);
        file.insert(10, vec!["f-001".to_string(), "f-002".to_string()]);
        file.insert(30, vec!["f-003".to_string()]);
        index
            .test_results
            .insert("t::a".to_string(), TestOutcome::Failed);
        index
    }

    #[test]
    fn line_keys_serialize_as_strings() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["forward"]["src/lib.rs"]["10"][1], "f-002");
        assert_eq!(json["test_results"]["t::a"], "failed");
    }

    #[test]
    fn facets_at_respects_inclusive_range() {
        let index = sample();
        assert_eq!(index.facets_at("src/lib.rs", Some(2..=10)), vec!["f-001", "f-002"]);
        assert_eq!(index.facets_at("src/lib.rs", Some(11..=29)), Vec::<String>::new());
        assert_eq!(index.facets_at("src/lib.rs", None).len(), 3);
        assert!(index.facets_at("src/other.rs", None).is_empty());
    }

    #[test]
    fn load_distinguishes_missing_and_corrupt() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(".facet/index.json");
        assert_eq!(TraceIndex::load(&path).unwrap(), None);

        sample().save(&path).unwrap();
        assert_eq!(TraceIndex::load(&path).unwrap(), Some(sample()));

        std::fs::write(&path, "[1,").unwrap();
        assert!(matches!(
            TraceIndex::load(&path),
            Err(IndexerError::CorruptIndex(_))
        ));
    }
}
