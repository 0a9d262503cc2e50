use std::path::{Path, PathBuf};

pub const CATALOG_FILE_NAME: &str = "facets.json";
pub const STATE_DIR_NAME: &str = ".facet";
pub const INDEX_FILE_NAME: &str = "index.json";
pub const PROJECTION_FILE_NAME: &str = "coverage.json";
pub const CONFIG_FILE_NAME: &str = "facet.toml";

/// Where a project's catalog and derived artifacts live.
///
/// The root is resolved once at the call boundary and then passed explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    root: PathBuf,
}

impl ProjectLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Walks up from `start` to the first directory holding a catalog file.
    #[must_use]
    pub fn discover(start: &Path) -> Option<Self> {
        start
            .ancestors()
            .find(|dir| dir.join(CATALOG_FILE_NAME).is_file())
            .map(Self::new)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.root.join(CATALOG_FILE_NAME)
    }

    pub fn state_dir(&self) -> PathBuf {
        self.root.join(STATE_DIR_NAME)
    }

    pub fn index_path(&self) -> PathBuf {
        self.state_dir().join(INDEX_FILE_NAME)
    }

    pub fn projection_path(&self) -> PathBuf {
        self.state_dir().join(PROJECTION_FILE_NAME)
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE_NAME)
    }

    /// `path` relative to the root when it lies inside it, with `./` stripped.
    pub fn relativize(&self, path: &str) -> String {
        let candidate = Path::new(path);
        let rel = candidate
            .strip_prefix(&self.root)
            .unwrap_or(candidate)
            .to_string_lossy()
            .replace('\\', "/");
        rel.strip_prefix("./").map(str::to_string).unwrap_or(rel)
    }
}

/// Writes `bytes` to a sibling temp file and renames it over `path`.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, path)
}
