use super::OperatorError;
use super::graft::{attach, remove_atom, reroot, resolve_dihedral, shifted, superpose};
use crate::core::models::ligand::Ligand;
use std::path::PathBuf;
use tracing::instrument;

/// Grows `l1` by grafting the fragment `l2` onto one of its mutation points.
///
/// The terminal atom of `l1`'s mutation point `site1` and that of `l2`'s mutation point
/// `site2` are both removed. `l2` is re-rooted at the frame holding `site2` and attached as
/// a new branch whose rotor bond joins the two neighbor heavy atoms. The fragment is
/// placed so its vacated bond points back along `l1`'s vacated bond, at the covalent
/// radius sum, then turned about the new bond until it no longer clashes with `l1`.
///
/// The child has `l1.num_frames() + l2.num_frames()` frames.
///
/// # Errors
///
/// * [`OperatorError::StructuralInfeasible`] if either site is out of range.
/// * [`OperatorError::Clash`] if no dihedral of the new bond avoids a clash.
#[instrument(level = "trace", skip(id, l1, l2), fields(l1 = %l1.id().display(), l2 = %l2.id().display()))]
pub fn addition(
    id: impl Into<PathBuf>,
    l1: &Ligand,
    l2: &Ligand,
    site1: usize,
    site2: usize,
) -> Result<Ligand, OperatorError> {
    let mp1 = *l1
        .mutation_points()
        .get(site1)
        .ok_or(OperatorError::StructuralInfeasible {
            operation: "addition",
            site: site1,
            available: l1.mutation_points().len(),
        })?;
    let mp2 = *l2
        .mutation_points()
        .get(site2)
        .ok_or(OperatorError::StructuralInfeasible {
            operation: "addition",
            site: site2,
            available: l2.mutation_points().len(),
        })?;

    let frame1 = &l1.frames()[mp1.frame];
    let n1 = &frame1.atoms[mp1.neighbor];
    let p1 = &frame1.atoms[mp1.point];
    let frame2 = &l2.frames()[mp2.frame];
    let n2 = &frame2.atoms[mp2.neighbor];
    let p2 = &frame2.atoms[mp2.point];

    let bond_length = n1.covalent_radius() + n2.covalent_radius();
    let bond_dir = (p1.position() - n1.position()).normalize();

    let mut trunk = l1.frames().to_vec();
    remove_atom(&mut trunk, mp1.frame, mp1.point);
    let rotor_x = shifted(mp1.neighbor, mp1.point);

    let mut graft = reroot(l2.frames(), mp2.frame);
    remove_atom(&mut graft, 0, mp2.point);
    let rotor_y = shifted(mp2.neighbor, mp2.point);

    superpose(
        &mut graft,
        n2.position(),
        p2.position(),
        n1.position(),
        &bond_dir,
        bond_length,
    );
    resolve_dihedral(&trunk, (mp1.frame, rotor_x), &mut graft, rotor_y)?;
    attach(&mut trunk, graft, mp1.frame, rotor_x, rotor_y);

    let parents = vec![l1.id().to_path_buf(), l2.id().to_path_buf()];
    Ok(Ligand::from_frames(id, parents, trunk)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::AtomType;
    use crate::core::models::ligand::fixtures;
    use std::path::Path;

    fn site_of(ligand: &Ligand, atom_type: AtomType) -> usize {
        ligand
            .mutation_points()
            .iter()
            .position(|mp| ligand.frames()[mp.frame].atoms[mp.point].atom_type() == atom_type)
            .unwrap()
    }

    #[test]
    fn single_site_ligand_and_fragment_merge_into_two_frames() {
        let l1 = fixtures::rigid();
        let l2 = fixtures::single_site_fragment();
        assert_eq!(l1.mutation_points().len(), 1);
        assert_eq!(l2.mutation_points().len(), 1);

        let child = addition("child.pdbqt", &l1, &l2, 0, 0).unwrap();

        assert_eq!(child.num_frames(), 2);
        // The chlorine of l1 is replaced, the hydrogen of l2 is dropped.
        assert_eq!(child.num_heavy_atoms(), l1.num_heavy_atoms() + l2.num_heavy_atoms() - 1);
        assert_eq!(child.num_atoms(), l1.num_atoms() + l2.num_atoms() - 2);
        assert!(child.mutation_points().is_empty());
        assert!(!child.addition_feasible());
        assert_eq!(child.id(), Path::new("child.pdbqt"));
        assert_eq!(
            child.parents(),
            &[PathBuf::from("rigid.pdbqt"), PathBuf::from("fragment.pdbqt")]
        );
    }

    #[test]
    fn new_rotor_bond_has_covalent_length_along_vacated_bond() {
        let l1 = fixtures::rigid();
        let l2 = fixtures::single_site_fragment();
        let child = addition("child.pdbqt", &l1, &l2, 0, 0).unwrap();

        let branch = &child.frames()[1];
        let x = &child.frames()[0].atoms[branch.rotor_x];
        let y = &branch.atoms[branch.rotor_y];
        assert_eq!(x.name(), "C1");
        assert_eq!(y.atom_type(), AtomType::C);

        let bond = y.position() - x.position();
        assert!((bond.norm() - 2.0 * AtomType::C.covalent_radius()).abs() < 1e-9);
        // The removed chlorine sat on the +x axis.
        assert!((bond.normalize() - nalgebra::Vector3::x()).norm() < 1e-9);
        assert!(x.is_neighbor(y));
    }

    #[test]
    fn growing_on_a_halogen_site_loses_one_heavy_atom() {
        let l1 = fixtures::seed();
        let l2 = fixtures::single_site_fragment();
        let site = site_of(&l1, AtomType::Cl);

        let child = addition("child.pdbqt", &l1, &l2, site, 0).unwrap();

        assert_eq!(child.num_frames(), l1.num_frames() + l2.num_frames());
        assert_eq!(child.num_heavy_atoms(), l1.num_heavy_atoms() + l2.num_heavy_atoms() - 1);
        // Mutation points are derived again: one used on each side, none gained.
        assert_eq!(
            child.mutation_points().len(),
            l1.mutation_points().len() + l2.mutation_points().len() - 2
        );
    }

    #[test]
    fn hydrogen_sites_consume_no_heavy_atom() {
        let l1 = fixtures::seed();
        let l2 = fixtures::single_site_fragment();
        let site = site_of(&l1, AtomType::H);

        let child = addition("child.pdbqt", &l1, &l2, site, 0).unwrap();

        // Both terminal atoms are hydrogens, so every heavy atom of both parents survives.
        assert_eq!(child.num_heavy_atoms(), l1.num_heavy_atoms() + l2.num_heavy_atoms());
        assert_eq!(child.num_rotatable_bonds(), 2);
    }

    #[test]
    fn heavy_atoms_drop_by_one_per_consumed_halogen() {
        let pairs = [
            (fixtures::seed(), fixtures::single_site_fragment()),
            (fixtures::rigid(), fixtures::seed()),
            (fixtures::seed(), fixtures::rigid()),
            (fixtures::chain(), fixtures::seed()),
        ];
        let mut grown = 0;
        for (l1, l2) in &pairs {
            for (site1, mp1) in l1.mutation_points().iter().enumerate() {
                for (site2, mp2) in l2.mutation_points().iter().enumerate() {
                    let Ok(child) = addition("child.pdbqt", l1, l2, site1, site2) else {
                        continue;
                    };
                    let consumed = [
                        &l1.frames()[mp1.frame].atoms[mp1.point],
                        &l2.frames()[mp2.frame].atoms[mp2.point],
                    ]
                    .iter()
                    .filter(|a| a.is_halogen())
                    .count();
                    assert_eq!(
                        child.num_heavy_atoms(),
                        l1.num_heavy_atoms() + l2.num_heavy_atoms() - consumed
                    );
                    grown += 1;
                }
            }
        }
        assert!(grown > 0);
    }

    #[test]
    fn multi_frame_fragment_is_rerooted_at_its_site() {
        let l1 = fixtures::rigid();
        let l2 = fixtures::seed();
        // The hydroxyl hydrogen lives in the seed's branch frame.
        let site2 = site_of(&l2, AtomType::HD);
        assert_eq!(l2.mutation_points()[site2].frame, 1);

        let child = addition("child.pdbqt", &l1, &l2, 0, site2).unwrap();

        assert_eq!(child.num_frames(), 3);
        let grafted = &child.frames()[1];
        assert_eq!(grafted.parent, Some(0));
        assert_eq!(grafted.atoms[grafted.rotor_y].atom_type(), AtomType::OA);
        // The old root of the fragment now hangs below the grafted frame.
        assert_eq!(child.frames()[2].parent, Some(1));
        assert_eq!(child.num_heavy_atoms(), l1.num_heavy_atoms() + l2.num_heavy_atoms() - 1);
    }

    #[test]
    fn inputs_are_left_untouched() {
        let l1 = fixtures::seed();
        let l2 = fixtures::single_site_fragment();
        let before = (l1.clone(), l2.clone());
        let _ = addition("child.pdbqt", &l1, &l2, 0, 0);
        assert_eq!((l1, l2), before);
    }

    #[test]
    fn out_of_range_sites_are_infeasible() {
        let l1 = fixtures::rigid();
        let l2 = fixtures::single_site_fragment();
        assert!(matches!(
            addition("c", &l1, &l2, 1, 0),
            Err(OperatorError::StructuralInfeasible { site: 1, available: 1, .. })
        ));
        assert!(matches!(
            addition("c", &l1, &l2, 0, 5),
            Err(OperatorError::StructuralInfeasible { site: 5, .. })
        ));
    }
}
