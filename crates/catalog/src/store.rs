use crate::error::{CatalogError, Result};
use crate::model::{Catalog, Modification, NewNode, Node, Status};
use crate::paths::{write_atomic, ProjectLayout};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// File-backed catalog.
///
/// Every mutation loads the whole file, applies the change in memory and rewrites the
/// file through a temp-file rename. A failed mutation never touches the file.
#[derive(Debug, Clone)]
pub struct CatalogStore {
    path: PathBuf,
}

impl CatalogStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn for_layout(layout: &ProjectLayout) -> Self {
        Self::new(layout.catalog_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Writes an empty catalog. Refuses to clobber an existing one unless `force`.
    pub fn init(&self, force: bool) -> Result<Catalog> {
        if self.exists() && !force {
            return Err(CatalogError::AlreadyExists(self.path.display().to_string()));
        }
        let catalog = Catalog::new();
        self.save(&catalog)?;
        Ok(catalog)
    }

    pub fn load(&self) -> Result<Catalog> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(CatalogError::Missing(self.path.display().to_string()))
            }
            Err(err) => return Err(err.into()),
        };
        let catalog: Catalog = serde_json::from_slice(&bytes)?;
        catalog.validate_ids()?;
        log::debug!(
            "loaded {} nodes from {}",
            catalog.nodes.len(),
            self.path.display()
        );
        Ok(catalog)
    }

    pub fn save(&self, catalog: &Catalog) -> Result<()> {
        let mut bytes = serde_json::to_vec_pretty(catalog)?;
        bytes.push(b'\n');
        write_atomic(&self.path, &bytes)?;
        log::debug!(
            "saved {} nodes to {}",
            catalog.nodes.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Load, apply `f`, and save only if `f` succeeded.
    pub fn update<T>(&self, f: impl FnOnce(&mut Catalog) -> Result<T>) -> Result<T> {
        let mut catalog = self.load()?;
        let out = f(&mut catalog)?;
        self.save(&catalog)?;
        Ok(out)
    }

    pub fn add(&self, new: NewNode) -> Result<Node> {
        self.update(|c| c.add(new))
    }

    pub fn get(&self, id: &str) -> Result<Option<Node>> {
        Ok(self.load()?.get(id).cloned())
    }

    pub fn children(&self, id: &str) -> Result<Vec<Node>> {
        let catalog = self.load()?;
        catalog.require(id)?;
        Ok(catalog.children(id).into_iter().cloned().collect())
    }

    pub fn edit(&self, id: &str, text: &str) -> Result<()> {
        self.update(|c| c.edit(id, text))
    }

    pub fn link(&self, facet_id: &str, test: &str) -> Result<()> {
        self.update(|c| c.link(facet_id, test))
    }

    pub fn mark(&self, facet_id: &str, status: Status) -> Result<()> {
        self.update(|c| c.mark(facet_id, status))
    }

    pub fn remove(&self, id: &str, force: bool) -> Result<Node> {
        self.update(|c| c.remove(id, force))
    }

    pub fn ancestor_chain(&self, id: &str) -> Result<Vec<Node>> {
        let catalog = self.load()?;
        let chain = catalog.ancestor_chain(id)?;
        Ok(chain.into_iter().cloned().collect())
    }

    /// Stamps each id with an audit entry for `file`, edited by `tool`.
    pub fn record_modifications(&self, ids: &[String], file: &str, tool: &str) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let timestamp = current_unix_ms();
        self.update(|c| {
            for id in ids {
                c.record_modification(
                    id,
                    Modification {
                        timestamp,
                        file: file.to_string(),
                        tool: tool.to_string(),
                    },
                )?;
            }
            Ok(())
        })
    }
}

fn current_unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .and_then(|dur| u64::try_from(dur.as_millis()).ok())
        .unwrap_or(0)
}
