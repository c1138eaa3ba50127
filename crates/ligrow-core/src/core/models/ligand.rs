use super::atom::Atom;
use super::frame::{Frame, MutationPoint, preorder};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LigandError {
    #[error("Malformed fragment '{path}': {reason}", path = path.display())]
    MalformedFragment { path: PathBuf, reason: String },

    #[error("Invalid frame tree: {0}")]
    InvalidStructure(String),
}

/// A candidate molecule: a tree of rigid frames plus derived summary properties.
///
/// Frames are stored in an arena where index 0 is the ROOT and every parent precedes its
/// children. Each non-root frame corresponds to exactly one rotatable bond, so frame `k`
/// (for `k >= 1`) doubles as rotatable-bond index `k`.
///
/// A `Ligand` is built once, either by a parser or by a genetic operator, and is not
/// modified afterwards except for recording the oracle's free energy.
#[derive(Debug, Clone, PartialEq)]
pub struct Ligand {
    id: PathBuf,
    parents: Vec<PathBuf>,
    frames: Vec<Frame>,
    mutation_points: Vec<MutationPoint>,
    num_heavy_atoms: usize,
    num_hb_donors: usize,
    num_hb_acceptors: usize,
    molecular_weight: f64,
    logp: f64,
    free_energy: f64,
    efficacy: f64,
}

impl Ligand {
    /// Builds a ligand from a frame arena, validating the tree and deriving mutation
    /// points and summary properties in the same pass.
    ///
    /// # Errors
    ///
    /// Returns [`LigandError::InvalidStructure`] if the arena is empty, frame 0 is not a
    /// root, a parent does not precede its child, parent and branch links disagree, or a
    /// rotor index is out of range.
    pub fn from_frames(
        id: impl Into<PathBuf>,
        parents: Vec<PathBuf>,
        frames: Vec<Frame>,
    ) -> Result<Self, LigandError> {
        validate_frames(&frames)?;
        let mut ligand = Self {
            id: id.into(),
            parents,
            frames,
            mutation_points: Vec::new(),
            num_heavy_atoms: 0,
            num_hb_donors: 0,
            num_hb_acceptors: 0,
            molecular_weight: 0.0,
            logp: 0.0,
            free_energy: 0.0,
            efficacy: 0.0,
        };
        ligand.refresh();
        Ok(ligand)
    }

    pub fn id(&self) -> &Path {
        &self.id
    }

    /// Identifiers of the ligands this one was derived from; empty for parsed fragments.
    pub fn parents(&self) -> &[PathBuf] {
        &self.parents
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn mutation_points(&self) -> &[MutationPoint] {
        &self.mutation_points
    }

    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }

    pub fn num_rotatable_bonds(&self) -> usize {
        self.frames.len() - 1
    }

    pub fn num_atoms(&self) -> usize {
        self.frames.iter().map(|f| f.atoms.len()).sum()
    }

    pub fn num_heavy_atoms(&self) -> usize {
        self.num_heavy_atoms
    }

    pub fn num_hb_donors(&self) -> usize {
        self.num_hb_donors
    }

    pub fn num_hb_acceptors(&self) -> usize {
        self.num_hb_acceptors
    }

    pub fn molecular_weight(&self) -> f64 {
        self.molecular_weight
    }

    pub fn logp(&self) -> f64 {
        self.logp
    }

    pub fn free_energy(&self) -> f64 {
        self.free_energy
    }

    /// Free energy per heavy atom; lower is better.
    pub fn efficacy(&self) -> f64 {
        self.efficacy
    }

    /// Iterates over every atom as `(frame index, atom index, atom)`.
    pub fn atoms(&self) -> impl Iterator<Item = (usize, usize, &Atom)> {
        self.frames
            .iter()
            .enumerate()
            .flat_map(|(f, frame)| frame.atoms.iter().enumerate().map(move |(i, a)| (f, i, a)))
    }

    pub fn addition_feasible(&self) -> bool {
        !self.mutation_points.is_empty()
    }

    pub fn subtraction_feasible(&self) -> bool {
        self.num_rotatable_bonds() >= 1
    }

    pub fn crossover_feasible(&self) -> bool {
        self.num_rotatable_bonds() >= 1
    }

    /// Returns `frame` followed by all of its descendants, in preorder.
    pub fn subtree(&self, frame: usize) -> Vec<usize> {
        preorder(&self.frames, frame)
    }

    /// Records the oracle's free energy and recomputes efficacy.
    pub fn with_free_energy(mut self, free_energy: f64) -> Self {
        self.set_free_energy(free_energy);
        self
    }

    /// Records a predicted logP. Ligands read from PDBQT start at 0.0.
    pub fn with_logp(mut self, logp: f64) -> Self {
        self.logp = logp;
        self
    }

    pub(crate) fn set_free_energy(&mut self, free_energy: f64) {
        self.free_energy = free_energy;
        self.efficacy = if self.num_heavy_atoms == 0 {
            0.0
        } else {
            free_energy / self.num_heavy_atoms as f64
        };
    }

    /// Orders two ligands by ascending efficacy, the elitist selection order.
    pub fn cmp_efficacy(&self, other: &Self) -> Ordering {
        self.efficacy.total_cmp(&other.efficacy)
    }

    fn refresh(&mut self) {
        self.mutation_points = derive_mutation_points(&self.frames);

        let mut heavy = 0;
        let mut donors = 0;
        let mut acceptors = 0;
        let mut weight = 0.0;
        for (_, _, atom) in self.atoms() {
            if !atom.is_hydrogen() {
                heavy += 1;
            }
            if atom.is_hb_donor() {
                donors += 1;
            }
            if atom.is_hb_acceptor() {
                acceptors += 1;
            }
            weight += atom.atomic_weight();
        }
        self.num_heavy_atoms = heavy;
        self.num_hb_donors = donors;
        self.num_hb_acceptors = acceptors;
        self.molecular_weight = weight;
        self.set_free_energy(self.free_energy);
    }
}

fn validate_frames(frames: &[Frame]) -> Result<(), LigandError> {
    let invalid = |msg: String| -> Result<(), LigandError> {
        Err(LigandError::InvalidStructure(msg))
    };

    let Some(root) = frames.first() else {
        return invalid("ligand has no frames".to_string());
    };
    if !root.is_root() {
        return invalid("frame 0 must be the ROOT".to_string());
    }
    for (k, frame) in frames.iter().enumerate() {
        if frame.atoms.is_empty() {
            return invalid(format!("frame {} has no atoms", k));
        }
        for &child in &frame.branches {
            if child >= frames.len() || frames[child].parent != Some(k) {
                return invalid(format!("frame {} lists {} as a branch it does not own", k, child));
            }
        }
        if k == 0 {
            continue;
        }
        let Some(parent) = frame.parent else {
            return invalid(format!("frame {} is a second ROOT", k));
        };
        if parent >= k {
            return invalid(format!("frame {} precedes its parent {}", k, parent));
        }
        if !frames[parent].branches.contains(&k) {
            return invalid(format!("frame {} is missing from its parent's branches", k));
        }
        if frame.rotor_x >= frames[parent].atoms.len() || frame.rotor_y >= frame.atoms.len() {
            return invalid(format!("frame {} has an out-of-range rotor atom", k));
        }
    }
    Ok(())
}

/// Pairs every terminal hydrogen or halogen with the heavy atom it is bonded to.
///
/// Atoms that take part in a rotor bond are never growable sites.
fn derive_mutation_points(frames: &[Frame]) -> Vec<MutationPoint> {
    let mut rotor_atoms: HashSet<(usize, usize)> = HashSet::new();
    for (k, frame) in frames.iter().enumerate() {
        if let Some(parent) = frame.parent {
            rotor_atoms.insert((parent, frame.rotor_x));
            rotor_atoms.insert((k, frame.rotor_y));
        }
    }

    let mut points = Vec::new();
    for (k, frame) in frames.iter().enumerate() {
        for (i, atom) in frame.atoms.iter().enumerate() {
            if !atom.is_mutable() || rotor_atoms.contains(&(k, i)) {
                continue;
            }
            let neighbor = frame
                .atoms
                .iter()
                .enumerate()
                .find(|&(j, other)| j != i && !other.is_mutable() && atom.is_neighbor(other));
            match neighbor {
                Some((j, _)) => points.push(MutationPoint::new(k, i, j)),
                None => tracing::trace!(
                    frame = k,
                    atom = atom.name(),
                    "Terminal atom has no bonded heavy atom in its frame; not growable."
                ),
            }
        }
    }
    points
}

/// Incrementally assembles a frame arena, mainly for parsers and tests.
#[derive(Debug)]
pub struct LigandBuilder {
    id: PathBuf,
    frames: Vec<Frame>,
}

impl LigandBuilder {
    /// Starts a ligand with an empty ROOT frame (index 0).
    pub fn new(id: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            frames: vec![Frame::root()],
        }
    }

    /// Opens a BRANCH under `parent`, bonded to the parent's atom `rotor_x`, and returns
    /// its frame index. The branch's first atom becomes its rotor Y unless changed with
    /// [`set_rotor_y`](Self::set_rotor_y).
    pub fn begin_branch(&mut self, parent: usize, rotor_x: usize) -> usize {
        let index = self.frames.len();
        self.frames.push(Frame::branch(parent, rotor_x));
        self.frames[parent].branches.push(index);
        index
    }

    /// Appends an atom to `frame` and returns its index within the frame.
    pub fn add_atom(&mut self, frame: usize, atom: Atom) -> usize {
        self.frames[frame].atoms.push(atom);
        self.frames[frame].atoms.len() - 1
    }

    pub fn set_rotor_y(&mut self, frame: usize, rotor_y: usize) {
        self.frames[frame].rotor_y = rotor_y;
    }

    pub fn num_atoms(&self, frame: usize) -> usize {
        self.frames[frame].atoms.len()
    }

    pub fn build(self) -> Result<Ligand, LigandError> {
        Ligand::from_frames(self.id, Vec::new(), self.frames)
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use crate::core::models::atom::AtomType;

    #[test]
    fn seed_fixture_derives_expected_properties() {
        let ligand = seed();
        assert_eq!(ligand.num_frames(), 2);
        assert_eq!(ligand.num_rotatable_bonds(), 1);
        assert_eq!(ligand.num_atoms(), 9);
        assert_eq!(ligand.num_heavy_atoms(), 4);
        assert_eq!(ligand.num_hb_donors(), 1);
        assert_eq!(ligand.num_hb_acceptors(), 1);
        let expected_weight = 2.0 * 12.01 + 35.45 + 16.00 + 4.0 * 1.008 + 1.008;
        assert!((ligand.molecular_weight() - expected_weight).abs() < 1e-9);
    }

    #[test]
    fn mutation_points_pair_terminal_atoms_with_heavy_neighbors() {
        let ligand = seed();
        let points = ligand.mutation_points();
        assert_eq!(points.len(), 6);
        assert!(points.contains(&MutationPoint::new(0, 1, 0)));
        assert!(points.contains(&MutationPoint::new(0, 3, 0)));
        assert!(points.contains(&MutationPoint::new(1, 2, 0)));
        // The hydroxyl hydrogen is bonded to the oxygen, not the carbon.
        assert!(points.contains(&MutationPoint::new(1, 4, 1)));
    }

    #[test]
    fn rotor_atoms_are_never_mutation_points() {
        let mut b = LigandBuilder::new("rotor-h.pdbqt");
        b.add_atom(0, atom("O", AtomType::OA, 0.0, 0.0, 0.0));
        b.add_atom(0, atom("C", AtomType::C, 1.43, 0.0, 0.0));
        let f1 = b.begin_branch(0, 0);
        b.add_atom(f1, atom("HD", AtomType::HD, -0.96, 0.0, 0.0));
        let ligand = b.build().unwrap();
        assert!(ligand.mutation_points().is_empty());
        assert!(!ligand.addition_feasible());
    }

    #[test]
    fn feasibility_guards_follow_structure() {
        let seed = seed();
        assert!(seed.addition_feasible());
        assert!(seed.subtraction_feasible());
        assert!(seed.crossover_feasible());

        let rigid = rigid();
        assert!(rigid.addition_feasible());
        assert!(!rigid.subtraction_feasible());
        assert!(!rigid.crossover_feasible());
    }

    #[test]
    fn subtree_lists_descendants_in_preorder() {
        let ligand = chain();
        assert_eq!(ligand.subtree(0), vec![0, 1, 2]);
        assert_eq!(ligand.subtree(1), vec![1, 2]);
        assert_eq!(ligand.subtree(2), vec![2]);
    }

    #[test]
    fn free_energy_sets_efficacy_per_heavy_atom() {
        let ligand = seed().with_free_energy(-6.0);
        assert_eq!(ligand.free_energy(), -6.0);
        assert_eq!(ligand.efficacy(), -1.5);
    }

    #[test]
    fn cmp_efficacy_orders_more_negative_first() {
        let better = seed().with_free_energy(-8.0);
        let worse = seed().with_free_energy(-4.0);
        assert_eq!(better.cmp_efficacy(&worse), Ordering::Less);
        let mut ligands = vec![worse.clone(), better.clone()];
        ligands.sort_by(Ligand::cmp_efficacy);
        assert_eq!(ligands[0].efficacy(), better.efficacy());
    }

    #[test]
    fn from_frames_rejects_broken_trees() {
        assert!(matches!(
            Ligand::from_frames("x", Vec::new(), Vec::new()),
            Err(LigandError::InvalidStructure(_))
        ));

        let mut frames = seed().frames().to_vec();
        frames[1].rotor_x = 99;
        assert!(Ligand::from_frames("x", Vec::new(), frames).is_err());

        let mut frames = seed().frames().to_vec();
        frames[0].branches.clear();
        assert!(Ligand::from_frames("x", Vec::new(), frames).is_err());

        let mut frames = seed().frames().to_vec();
        frames[1].atoms.clear();
        assert!(Ligand::from_frames("x", Vec::new(), frames).is_err());
    }
}
