use crate::category::CheckCategory;
use serde::{Deserialize, Serialize};

/// Which detector produced a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    TestOverload,
    Orphan,
    HierarchyViolation,
    EmptyExpectation,
    StatusMismatch,
    CodeOverlap,
}

impl FindingKind {
    pub const fn category(self) -> CheckCategory {
        match self {
            FindingKind::TestOverload => CheckCategory::Overload,
            FindingKind::Orphan | FindingKind::HierarchyViolation | FindingKind::EmptyExpectation => {
                CheckCategory::Structural
            }
            FindingKind::StatusMismatch => CheckCategory::Consistency,
            FindingKind::CodeOverlap => CheckCategory::Overlap,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            FindingKind::TestOverload => "test overload",
            FindingKind::Orphan => "orphan",
            FindingKind::HierarchyViolation => "hierarchy violation",
            FindingKind::EmptyExpectation => "empty expectation",
            FindingKind::StatusMismatch => "status mismatch",
            FindingKind::CodeOverlap => "code overlap",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub category: CheckCategory,
    pub kind: FindingKind,
    pub description: String,
    /// Implicated node ids
    pub nodes: Vec<String>,
}

impl Finding {
    pub fn new(kind: FindingKind, description: impl Into<String>, nodes: Vec<String>) -> Self {
        Self {
            category: kind.category(),
            kind,
            description: description.into(),
            nodes,
        }
    }
}

/// A category that was selected but could not run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedCheck {
    pub category: CheckCategory,
    pub reason: String,
}

/// Outcome of a health-check run.
///
/// `checked` lists what actually ran, so an empty `findings` on a non-empty `checked`
/// means "checked, clean" rather than "not checked".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub checked: Vec<CheckCategory>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedCheck>,
    pub findings: Vec<Finding>,
}

impl HealthReport {
    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }

    pub fn count(&self, kind: FindingKind) -> usize {
        self.findings.iter().filter(|f| f.kind == kind).count()
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for skipped in &self.skipped {
            out.push_str(&format!(
                "skipped {}: {}\n",
                skipped.category, skipped.reason
            ));
        }
        if self.checked.is_empty() {
            out.push_str("no checks ran\n");
        } else if self.findings.is_empty() {
            out.push_str("no issues found\n");
        } else {
            for finding in &self.findings {
                out.push_str(&format!(
                    "[{}] {}: {}\n",
                    finding.category,
                    finding.kind.label(),
                    finding.description
                ));
            }
            out.push_str(&format!("{} issue(s) found\n", self.findings.len()));
        }
        out
    }
}
