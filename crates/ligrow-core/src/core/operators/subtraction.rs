use super::OperatorError;
use super::graft::prune_subtree;
use crate::core::models::atom::AtomType;
use crate::core::models::ligand::Ligand;
use crate::core::utils::geometry::point_along;
use std::path::PathBuf;
use tracing::instrument;

/// Shrinks `l1` by cutting the rotatable bond `site` and dropping everything below it.
///
/// The rotor-Y atom of the removed frame becomes a capping hydrogen in the parent frame,
/// placed along the old bond at the covalent radius sum. The cap is polar (`HD`) when
/// the rotor-X atom is a nitrogen, oxygen or sulfur, and `H` otherwise. A subtree made of
/// the rotor-Y atom alone is dropped without a cap, so the child always has strictly
/// fewer frames and atoms than `l1`.
///
/// # Errors
///
/// Returns [`OperatorError::StructuralInfeasible`] unless `1 <= site <= l1.num_rotatable_bonds()`.
/// In particular every site of a root-only ligand is infeasible.
#[instrument(level = "trace", skip(id, l1), fields(l1 = %l1.id().display()))]
pub fn subtraction(id: impl Into<PathBuf>, l1: &Ligand, site: usize) -> Result<Ligand, OperatorError> {
    let infeasible = OperatorError::StructuralInfeasible {
        operation: "subtraction",
        site,
        available: l1.num_rotatable_bonds(),
    };
    if site == 0 || site > l1.num_rotatable_bonds() {
        return Err(infeasible);
    }
    let removed = &l1.frames()[site];
    let Some(parent) = removed.parent else {
        return Err(infeasible);
    };

    let removed_atoms: usize = l1
        .subtree(site)
        .into_iter()
        .map(|k| l1.frames()[k].atoms.len())
        .sum();
    // Every frame of the pruned subtree comes after `parent`, so its index is stable.
    let mut frames = prune_subtree(l1.frames(), site);
    if removed_atoms <= 1 {
        return Ok(Ligand::from_frames(id, vec![l1.id().to_path_buf()], frames)?);
    }

    let x = &l1.frames()[parent].atoms[removed.rotor_x];
    let y = &removed.atoms[removed.rotor_y];
    let cap_type = if x.atom_type().is_hetero() {
        AtomType::HD
    } else {
        AtomType::H
    };
    let position = point_along(
        x.position(),
        y.position(),
        x.covalent_radius() + cap_type.covalent_radius(),
    );
    let cap = y.derive(cap_type.label(), cap_type, position);
    frames[parent].atoms.push(cap);

    Ok(Ligand::from_frames(id, vec![l1.id().to_path_buf()], frames)?)
}
