use crate::error::{HealthError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Independently selectable group of detectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckCategory {
    /// Several facets claim the same test
    Overload,
    /// Orphans, illegal parent kinds, empty expectations
    Structural,
    /// Stored facet status disagrees with the last test run
    Consistency,
    /// Facets with different tests cover identical lines
    Overlap,
}

impl CheckCategory {
    pub const ALL: [CheckCategory; 4] = [
        CheckCategory::Overload,
        CheckCategory::Structural,
        CheckCategory::Consistency,
        CheckCategory::Overlap,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            CheckCategory::Overload => "overload",
            CheckCategory::Structural => "structural",
            CheckCategory::Consistency => "consistency",
            CheckCategory::Overlap => "overlap",
        }
    }

    /// Whether the detectors need a built index.
    pub const fn requires_index(self) -> bool {
        matches!(self, CheckCategory::Consistency | CheckCategory::Overlap)
    }

    /// Parses a list of names; an empty list selects every category.
    pub fn parse_selection<S: AsRef<str>>(names: &[S]) -> Result<Vec<CheckCategory>> {
        if names.is_empty() {
            return Ok(Self::ALL.to_vec());
        }
        let mut out = Vec::new();
        for name in names {
            let category: CheckCategory = name.as_ref().parse()?;
            if !out.contains(&category) {
                out.push(category);
            }
        }
        out.sort();
        Ok(out)
    }
}

impl fmt::Display for CheckCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CheckCategory {
    type Err = HealthError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                let known: Vec<&str> = Self::ALL.iter().map(|c| c.as_str()).collect();
                HealthError::UnknownCategory(s.to_string(), known.join(", "))
            })
    }
}
