use super::OperatorError;
use super::graft::{attach, extract_subtree, prune_subtree, resolve_dihedral, superpose};
use crate::core::models::ligand::Ligand;
use std::path::PathBuf;
use tracing::instrument;

/// Replaces the subtree of `l1` below rotatable bond `site1` with the subtree of `l2`
/// below rotatable bond `site2`.
///
/// The donated subtree is attached to `l1`'s rotor-X atom, realigned so the new rotor bond
/// follows `l1`'s old bond direction, and appended after `l1`'s remaining frames. Crossing
/// the child back at its last subtree root therefore restores the original frame and
/// atom counts.
///
/// # Errors
///
/// * [`OperatorError::StructuralInfeasible`] unless both sites lie in `[1, num_rotatable_bonds]`.
/// * [`OperatorError::Incompatible`] when the two rotor-Y atoms differ in valence.
/// * [`OperatorError::Clash`] if no dihedral of the new bond avoids a clash.
#[instrument(level = "trace", skip(id, l1, l2), fields(l1 = %l1.id().display(), l2 = %l2.id().display()))]
pub fn crossover(
    id: impl Into<PathBuf>,
    l1: &Ligand,
    l2: &Ligand,
    site1: usize,
    site2: usize,
) -> Result<Ligand, OperatorError> {
    let (parent1, x1, y1) = rotor_bond(l1, site1)?;
    let (parent2, x2, y2) = rotor_bond(l2, site2)?;

    let x1_atom = &l1.frames()[parent1].atoms[x1];
    let y1_atom = &l1.frames()[site1].atoms[y1];
    let x2_atom = &l2.frames()[parent2].atoms[x2];
    let y2_atom = &l2.frames()[site2].atoms[y2];

    if y1_atom.atom_type().valence() != y2_atom.atom_type().valence() {
        return Err(OperatorError::Incompatible {
            left: y1_atom.atom_type(),
            right: y2_atom.atom_type(),
        });
    }

    let bond_length = x1_atom.covalent_radius() + y2_atom.covalent_radius();
    let bond_dir = (y1_atom.position() - x1_atom.position()).normalize();

    let mut trunk = prune_subtree(l1.frames(), site1);
    let mut graft = extract_subtree(l2.frames(), site2);
    superpose(
        &mut graft,
        y2_atom.position(),
        x2_atom.position(),
        x1_atom.position(),
        &bond_dir,
        bond_length,
    );
    resolve_dihedral(&trunk, (parent1, x1), &mut graft, y2)?;
    attach(&mut trunk, graft, parent1, x1, y2);

    let parents = vec![l1.id().to_path_buf(), l2.id().to_path_buf()];
    Ok(Ligand::from_frames(id, parents, trunk)?)
}

/// Returns `(parent frame, rotor X, rotor Y)` of rotatable bond `site`.
fn rotor_bond(ligand: &Ligand, site: usize) -> Result<(usize, usize, usize), OperatorError> {
    let infeasible = || OperatorError::StructuralInfeasible {
        operation: "crossover",
        site,
        available: ligand.num_rotatable_bonds(),
    };
    if site == 0 || site > ligand.num_rotatable_bonds() {
        return Err(infeasible());
    }
    let frame = &ligand.frames()[site];
    let parent = frame.parent.ok_or_else(infeasible)?;
    Ok((parent, frame.rotor_x, frame.rotor_y))
}
