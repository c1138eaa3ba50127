use super::atom::Atom;

/// A rigid substructure of a ligand: the ROOT or one BRANCH of a PDBQT file.
///
/// Frames live in an arena owned by their [`Ligand`](super::ligand::Ligand) and refer to
/// each other by index. The rotatable bond that joins a branch to its parent runs from
/// atom `rotor_x` of the parent frame to atom `rotor_y` of this frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Index of the parent frame, `None` for the root.
    pub parent: Option<usize>,
    /// Index, within the parent frame, of the parent-side atom of the rotor bond.
    pub rotor_x: usize,
    /// Index, within this frame, of the child-side atom of the rotor bond.
    pub rotor_y: usize,
    /// Indices of the child frames, in file order.
    pub branches: Vec<usize>,
    /// Atoms belonging to this frame.
    pub atoms: Vec<Atom>,
}

impl Frame {
    pub fn root() -> Self {
        Self {
            parent: None,
            rotor_x: 0,
            rotor_y: 0,
            branches: Vec::new(),
            atoms: Vec::new(),
        }
    }

    pub fn branch(parent: usize, rotor_x: usize) -> Self {
        Self {
            parent: Some(parent),
            rotor_x,
            rotor_y: 0,
            branches: Vec::new(),
            atoms: Vec::new(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn num_heavy_atoms(&self) -> usize {
        self.atoms.iter().filter(|a| !a.is_hydrogen()).count()
    }

    /// Removes the atom at `index`, keeping `rotor_y` pointing at the same atom.
    ///
    /// Child frames whose `rotor_x` refers into this frame must be fixed by the caller.
    pub(crate) fn remove_atom(&mut self, index: usize) -> Atom {
        debug_assert!(self.is_root() || index != self.rotor_y);
        if index < self.rotor_y {
            self.rotor_y -= 1;
        }
        self.atoms.remove(index)
    }
}

/// Returns `start` followed by all frames below it, parents before children.
pub fn preorder(frames: &[Frame], start: usize) -> Vec<usize> {
    let mut order = Vec::new();
    let mut stack = vec![start];
    while let Some(f) = stack.pop() {
        order.push(f);
        stack.extend(frames[f].branches.iter().rev());
    }
    order
}

/// A growable site: a terminal hydrogen or halogen together with the heavy atom it is
/// bonded to. Both atom indices refer to `frame`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MutationPoint {
    pub frame: usize,
    pub point: usize,
    pub neighbor: usize,
}

impl MutationPoint {
    pub fn new(frame: usize, point: usize, neighbor: usize) -> Self {
        Self {
            frame,
            point,
            neighbor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::AtomType;
    use nalgebra::Point3;

    fn atom(atom_type: AtomType) -> Atom {
        Atom::synthesized(atom_type.label(), atom_type, Point3::origin())
    }

    #[test]
    fn root_and_branch_constructors_set_parent() {
        assert!(Frame::root().is_root());
        let branch = Frame::branch(3, 7);
        assert_eq!(branch.parent, Some(3));
        assert_eq!(branch.rotor_x, 7);
        assert_eq!(branch.rotor_y, 0);
        assert!(!branch.is_root());
    }

    #[test]
    fn num_heavy_atoms_skips_hydrogens() {
        let mut frame = Frame::root();
        frame.atoms = vec![
            atom(AtomType::C),
            atom(AtomType::H),
            atom(AtomType::OA),
            atom(AtomType::HD),
            atom(AtomType::Cl),
        ];
        assert_eq!(frame.num_heavy_atoms(), 3);
    }

    #[test]
    fn remove_atom_before_rotor_y_shifts_it() {
        let mut frame = Frame::branch(0, 0);
        frame.atoms = vec![atom(AtomType::H), atom(AtomType::C), atom(AtomType::OA)];
        frame.rotor_y = 1;
        let removed = frame.remove_atom(0);
        assert_eq!(removed.atom_type(), AtomType::H);
        assert_eq!(frame.rotor_y, 0);
        assert_eq!(frame.atoms[frame.rotor_y].atom_type(), AtomType::C);
    }

    #[test]
    fn remove_atom_after_rotor_y_keeps_it() {
        let mut frame = Frame::branch(0, 0);
        frame.atoms = vec![atom(AtomType::C), atom(AtomType::OA), atom(AtomType::HD)];
        frame.remove_atom(2);
        assert_eq!(frame.rotor_y, 0);
        assert_eq!(frame.atoms.len(), 2);
    }
}
