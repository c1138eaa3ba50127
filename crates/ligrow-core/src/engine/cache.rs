use crate::core::io::traits::LigandSource;
use crate::core::models::ligand::{Ligand, LigandError};
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

type Entry = Arc<OnceCell<Arc<Ligand>>>;

/// Fragments parsed at most once per identifier and shared by every task.
///
/// The key map lock is held only while the per-key cell is looked up or inserted; parsing
/// runs inside the cell, so concurrent first requests for one fragment wait for a single
/// parse while requests for other fragments proceed. Failed parses leave the cell empty
/// and the next request tries again. Entries are never evicted.
pub struct FragmentCache {
    source: Box<dyn LigandSource>,
    entries: RwLock<HashMap<PathBuf, Entry>>,
}

impl FragmentCache {
    pub fn new(source: impl LigandSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the fragment identified by `id`, parsing it on first use.
    ///
    /// Every successful call for the same identifier returns the same `Arc`.
    ///
    /// # Errors
    ///
    /// Returns [`LigandError::MalformedFragment`] if the source cannot parse the fragment.
    pub fn get(&self, id: &Path) -> Result<Arc<Ligand>, LigandError> {
        let entry = self.entry(id);
        entry
            .get_or_try_init(|| {
                debug!(fragment = %id.display(), "Loading fragment.");
                self.source.parse(id).map(Arc::new)
            })
            .cloned()
    }

    /// Loads every fragment in `ids`, stopping at the first failure.
    pub fn preload<P: AsRef<Path>>(
        &self,
        ids: impl IntoIterator<Item = P>,
    ) -> Result<Vec<Arc<Ligand>>, LigandError> {
        ids.into_iter().map(|id| self.get(id.as_ref())).collect()
    }

    /// Number of fragments loaded so far.
    pub fn len(&self) -> usize {
        self.read()
            .values()
            .filter(|entry| entry.get().is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `id` has been loaded successfully.
    pub fn contains(&self, id: &Path) -> bool {
        self.read()
            .get(id)
            .is_some_and(|entry| entry.get().is_some())
    }

    fn entry(&self, id: &Path) -> Entry {
        if let Some(entry) = self.read().get(id) {
            return Arc::clone(entry);
        }
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(entries.entry(id.to_path_buf()).or_default())
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<PathBuf, Entry>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }
}
