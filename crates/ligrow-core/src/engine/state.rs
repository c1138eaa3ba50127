use crate::core::models::ligand::Ligand;
use once_cell::sync::OnceCell;
use std::sync::Arc;

/// Read-only snapshot of the parents of a generation.
pub type Elites = Arc<[Arc<Ligand>]>;

/// The slots of one generation.
///
/// Each slot is written at most once, by the task that owns it, so no slot needs a lock.
/// Clones share the same slots.
#[derive(Debug, Clone)]
pub struct Population {
    slots: Arc<[OnceCell<Ligand>]>,
}

impl Population {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| OnceCell::new()).collect(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Stores `ligand` in `slot`, handing it back if the slot is taken or out of range.
    pub fn fill(&self, slot: usize, ligand: Ligand) -> Result<(), Ligand> {
        match self.slots.get(slot) {
            Some(cell) => cell.set(ligand),
            None => Err(ligand),
        }
    }

    pub fn get(&self, slot: usize) -> Option<&Ligand> {
        self.slots.get(slot).and_then(OnceCell::get)
    }

    pub fn num_filled(&self) -> usize {
        self.slots.iter().filter(|c| c.get().is_some()).count()
    }

    /// Filled slots as `(slot, ligand)`, in slot order.
    pub fn filled(&self) -> impl Iterator<Item = (usize, &Ligand)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, c)| c.get().map(|l| (i, l)))
    }
}

/// Merges parents and children and keeps the `n` with the lowest efficacy.
///
/// The sort is stable, so among equal efficacies parents stay ahead of children.
pub fn select_elites(
    parents: &[Arc<Ligand>],
    children: impl IntoIterator<Item = Ligand>,
    n: usize,
) -> Vec<Arc<Ligand>> {
    let mut pool: Vec<Arc<Ligand>> = parents
        .iter()
        .cloned()
        .chain(children.into_iter().map(Arc::new))
        .collect();
    pool.sort_by(|a, b| a.cmp_efficacy(b));
    pool.truncate(n);
    pool
}
