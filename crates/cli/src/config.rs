use anyhow::{Context as AnyhowContext, Result};
use facet_catalog::ProjectLayout;
use facet_indexer::ReportPaths;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub(crate) const JUNIT_ENV: &str = "FACET_JUNIT_REPORT";
pub(crate) const COVERAGE_ENV: &str = "FACET_COVERAGE_REPORT";

const DEFAULT_JUNIT: &str = "junit.xml";
const DEFAULT_COVERAGE: &str = "coverage.json";

/// Optional `facet.toml` at the project root.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct FacetConfig {
    #[serde(default)]
    pub reports: ReportsConfig,
}

/// Report locations, relative to the project root unless absolute.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ReportsConfig {
    pub junit: Option<PathBuf>,
    pub coverage: Option<PathBuf>,
}

/// Report paths given on the command line.
#[derive(Debug, Default, Clone)]
pub(crate) struct ReportOverrides {
    pub junit: Option<PathBuf>,
    pub coverage: Option<PathBuf>,
}

impl FacetConfig {
    /// Missing file means defaults.
    pub fn load(layout: &ProjectLayout) -> Result<Self> {
        let path = layout.config_path();
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(err) => {
                return Err(err).with_context(|| format!("Failed to read {}", path.display()))
            }
        };
        toml::from_str(&raw).with_context(|| format!("Invalid config {}", path.display()))
    }

    /// Flags win over environment, environment over `facet.toml`, which wins over defaults.
    pub fn report_paths(
        &self,
        layout: &ProjectLayout,
        overrides: &ReportOverrides,
        env: impl Fn(&str) -> Option<String>,
    ) -> ReportPaths {
        let pick = |flag: &Option<PathBuf>, var: &str, file: &Option<PathBuf>, default: &str| {
            if let Some(flag) = flag {
                return flag.clone();
            }
            let configured = env(var)
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .or_else(|| file.clone())
                .unwrap_or_else(|| PathBuf::from(default));
            under_root(layout.root(), configured)
        };
        ReportPaths {
            junit: pick(&overrides.junit, JUNIT_ENV, &self.reports.junit, DEFAULT_JUNIT),
            coverage: pick(
                &overrides.coverage,
                COVERAGE_ENV,
                &self.reports.coverage,
                DEFAULT_COVERAGE,
            ),
        }
    }
}

fn under_root(root: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        root.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn defaults_live_in_the_project_root() {
        let temp = tempdir().unwrap();
        let layout = ProjectLayout::new(temp.path());
        let config = FacetConfig::load(&layout).unwrap();
        assert_eq!(config, FacetConfig::default());

        let paths = config.report_paths(&layout, &ReportOverrides::default(), no_env);
        assert_eq!(paths.junit, temp.path().join("junit.xml"));
        assert_eq!(paths.coverage, temp.path().join("coverage.json"));
    }

    #[test]
    fn precedence_is_flag_then_env_then_file() {
        let temp = tempdir().unwrap();
        std::fs::write(
            temp.path().join("facet.toml"),
            "[reports]\njunit = \"target/junit.xml\"\ncoverage = \"target/cov.json\"\n",
        )
        .unwrap();
        let layout = ProjectLayout::new(temp.path());
        let config = FacetConfig::load(&layout).unwrap();

        let env = |var: &str| (var == COVERAGE_ENV).then(|| "env/cov.json".to_string());
        let overrides = ReportOverrides {
            junit: Some(PathBuf::from("flag.xml")),
            coverage: None,
        };
        let paths = config.report_paths(&layout, &overrides, env);
        assert_eq!(paths.junit, PathBuf::from("flag.xml"));
        assert_eq!(paths.coverage, temp.path().join("env/cov.json"));

        let paths = config.report_paths(&layout, &ReportOverrides::default(), no_env);
        assert_eq!(paths.junit, temp.path().join("target/junit.xml"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let temp = tempdir().unwrap();
        std::fs::write(
            temp.path().join("facet.toml"),
            "[reports]\njunit_path = \"x.xml\"\n",
        )
        .unwrap();
        let layout = ProjectLayout::new(temp.path());
        assert!(FacetConfig::load(&layout).is_err());
    }
}
