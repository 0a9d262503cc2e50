use crate::builder::{BuildOutcome, IndexBuilder};
use crate::coverage::CoverageReport;
use crate::index::TraceIndex;
use crate::junit::TestReport;
use crate::projection::CoverageProjection;
use crate::Result;
use facet_catalog::{CatalogStore, ProjectLayout};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Report locations for one build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPaths {
    pub junit: PathBuf,
    pub coverage: PathBuf,
}

/// Rebuilds a project's index from its reports and writes facet status back.
///
/// Both reports are parsed before anything is written. Files are then written in order:
/// index, coverage projection, catalog. A crash between the index and catalog writes
/// leaves them mutually stale until the next build; the consistency health check
/// reports that state.
pub struct ProjectIndexer {
    layout: ProjectLayout,
    store: CatalogStore,
}

impl ProjectIndexer {
    pub fn new(layout: ProjectLayout) -> Self {
        let store = CatalogStore::for_layout(&layout);
        Self { layout, store }
    }

    pub fn layout(&self) -> &ProjectLayout {
        &self.layout
    }

    pub fn index(&self, reports: &ReportPaths) -> Result<BuildOutcome> {
        let start = Instant::now();
        let tests = TestReport::from_path(&reports.junit)?;
        let coverage = CoverageReport::from_path(&reports.coverage)?.relative_to(&self.layout);
        let mut catalog = self.store.load()?;

        let mut outcome = IndexBuilder::new(&tests, &coverage).build(&mut catalog);

        outcome.index.save(&self.layout.index_path())?;
        CoverageProjection::from_index(&outcome.index).save(&self.layout.projection_path())?;
        self.store.save(&catalog)?;

        outcome.stats.time_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        log::info!(
            "Indexed {} tests ({} passed, {} failed) across {} files; {} facet status changes",
            outcome.stats.tests,
            outcome.stats.passed,
            outcome.stats.failed,
            outcome.stats.covered_files,
            outcome.stats.status_changes.len()
        );
        for facet in &outcome.stats.uncovered_facets {
            log::warn!("{facet} is linked to a test with no coverage contexts");
        }
        Ok(outcome)
    }

    /// Latest persisted index, `None` before the first build.
    pub fn load_index(&self) -> Result<Option<TraceIndex>> {
        TraceIndex::load(&self.layout.index_path())
    }

    /// Projects `coverage` through the current catalog links without touching status or
    /// the index, and writes the projection file.
    pub fn project(&self, coverage: &Path) -> Result<CoverageProjection> {
        let coverage = CoverageReport::from_path(coverage)?.relative_to(&self.layout);
        let catalog = self.store.load()?;
        let (forward, _) = crate::builder::map_coverage(&catalog, &coverage);
        let projection = CoverageProjection::from_forward(forward);
        projection.save(&self.layout.projection_path())?;
        Ok(projection)
    }
}
