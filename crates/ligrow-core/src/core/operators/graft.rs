use super::OperatorError;
use crate::core::models::frame::{Frame, preorder};
use crate::core::utils::geometry::{rotate_about, rotation_from_axis_angle, rotation_to_align};
use itertools::iproduct;
use nalgebra::{Point3, Vector3};

/// Grafted atoms closer than this multiple of the covalent-radius sum to a trunk atom clash.
pub const CLASH_FACTOR: f64 = 0.75;
/// Increment of the dihedral scan about a newly formed rotor bond.
pub const DIHEDRAL_STEP_DEGREES: f64 = 30.0;

const DIHEDRAL_STEPS: usize = (360.0 / DIHEDRAL_STEP_DEGREES) as usize;

/// Removes an atom from a frame of an arena, keeping every rotor reference pointing at
/// the same atom. The removed atom must not be a rotor atom.
pub(super) fn remove_atom(frames: &mut [Frame], frame: usize, index: usize) {
    frames[frame].remove_atom(index);
    for child in frames[frame].branches.clone() {
        if frames[child].rotor_x > index {
            frames[child].rotor_x -= 1;
        }
    }
}

/// Index an atom moves to after the atom at `removed` is taken out of its frame.
pub(super) fn shifted(index: usize, removed: usize) -> usize {
    if index > removed { index - 1 } else { index }
}

/// Copies the subtree rooted at `root` into a standalone arena whose frame 0 is `root`.
///
/// The new root keeps its old `rotor_x`/`rotor_y`; callers overwrite them on attachment.
pub(super) fn extract_subtree(frames: &[Frame], root: usize) -> Vec<Frame> {
    let order = preorder(frames, root);
    let mut new_index = vec![usize::MAX; frames.len()];
    for (k, &old) in order.iter().enumerate() {
        new_index[old] = k;
    }
    order
        .iter()
        .map(|&old| {
            let mut frame = frames[old].clone();
            frame.parent = if old == root {
                None
            } else {
                frame.parent.map(|p| new_index[p])
            };
            frame.branches = frame.branches.iter().map(|&c| new_index[c]).collect();
            frame
        })
        .collect()
}

/// Returns the arena without the subtree rooted at `root`. Frames before `root` keep their
/// indices.
pub(super) fn prune_subtree(frames: &[Frame], root: usize) -> Vec<Frame> {
    let mut removed = vec![false; frames.len()];
    for k in preorder(frames, root) {
        removed[k] = true;
    }
    let mut new_index = vec![usize::MAX; frames.len()];
    let mut next = 0;
    for (k, gone) in removed.iter().enumerate() {
        if !gone {
            new_index[k] = next;
            next += 1;
        }
    }
    frames
        .iter()
        .enumerate()
        .filter(|&(k, _)| !removed[k])
        .map(|(_, frame)| {
            let mut frame = frame.clone();
            frame.parent = frame.parent.map(|p| new_index[p]);
            frame.branches = frame
                .branches
                .iter()
                .filter(|&&c| !removed[c])
                .map(|&c| new_index[c])
                .collect();
            frame
        })
        .collect()
}

/// Re-roots a whole arena at `new_root`, reversing the rotor bonds on the path from the
/// old root. Frame 0 of the result is `new_root`; atom order within frames is unchanged.
pub(super) fn reroot(frames: &[Frame], new_root: usize) -> Vec<Frame> {
    let mut out: Vec<Frame> = Vec::with_capacity(frames.len());
    // (old frame, Some((new parent index, old parent frame)))
    let mut stack: Vec<(usize, Option<(usize, usize)>)> = vec![(new_root, None)];

    while let Some((old, link)) = stack.pop() {
        let index = out.len();
        let mut frame = Frame::root();
        frame.atoms = frames[old].atoms.clone();

        let came_from = link.map(|(new_parent, old_parent)| {
            if frames[old].parent == Some(old_parent) {
                frame.rotor_x = frames[old].rotor_x;
                frame.rotor_y = frames[old].rotor_y;
            } else {
                // Walking up the original tree: the bond belongs to `old_parent`.
                frame.rotor_x = frames[old_parent].rotor_y;
                frame.rotor_y = frames[old_parent].rotor_x;
            }
            frame.parent = Some(new_parent);
            out[new_parent].branches.push(index);
            old_parent
        });
        out.push(frame);

        let neighbors = frames[old]
            .branches
            .iter()
            .copied()
            .chain(frames[old].parent)
            .filter(|&n| Some(n) != came_from);
        let pending: Vec<usize> = neighbors.collect();
        stack.extend(pending.into_iter().rev().map(|n| (n, Some((index, old)))));
    }
    out
}

/// Rigidly moves `graft` so its anchor atom sits `bond_length` from `trunk_atom` along
/// `bond_dir`, with the anchor's old bond (towards `partner`) pointing back at `trunk_atom`.
pub(super) fn superpose(
    graft: &mut [Frame],
    anchor: &Point3<f64>,
    partner: &Point3<f64>,
    trunk_atom: &Point3<f64>,
    bond_dir: &Vector3<f64>,
    bond_length: f64,
) {
    let target = trunk_atom + bond_dir * bond_length;
    let rotation = rotation_to_align(&(partner - anchor), &-bond_dir);
    for frame in graft.iter_mut() {
        for atom in frame.atoms.iter_mut() {
            let moved = target + rotation * (atom.position() - anchor);
            *atom = atom.moved_to(moved);
        }
    }
}

/// Scans dihedrals about the bond from trunk atom `(frame, atom)` to the graft's root atom
/// `graft_anchor`, keeping the first orientation without a clash.
///
/// The rotor pair itself is exempt from the clash test.
pub(super) fn resolve_dihedral(
    trunk: &[Frame],
    trunk_anchor: (usize, usize),
    graft: &mut [Frame],
    graft_anchor: usize,
) -> Result<(), OperatorError> {
    let pivot = *graft[0].atoms[graft_anchor].position();
    let axis = pivot - trunk[trunk_anchor.0].atoms[trunk_anchor.1].position();

    let trunk_atoms: Vec<(Point3<f64>, f64, bool)> = trunk
        .iter()
        .enumerate()
        .flat_map(|(f, frame)| {
            frame.atoms.iter().enumerate().map(move |(i, a)| {
                (*a.position(), a.covalent_radius(), (f, i) == trunk_anchor)
            })
        })
        .collect();

    for step in 0..DIHEDRAL_STEPS {
        let rotation = rotation_from_axis_angle(&axis, step as f64 * DIHEDRAL_STEP_DEGREES);
        let candidate: Vec<(Point3<f64>, f64, bool)> = graft
            .iter()
            .enumerate()
            .flat_map(|(f, frame)| {
                frame.atoms.iter().enumerate().map(move |(i, a)| {
                    (
                        rotate_about(a.position(), &pivot, &rotation),
                        a.covalent_radius(),
                        f == 0 && i == graft_anchor,
                    )
                })
            })
            .collect();

        if !has_clash(&trunk_atoms, &candidate) {
            let mut positions = candidate.into_iter().map(|(p, _, _)| p);
            for frame in graft.iter_mut() {
                for atom in frame.atoms.iter_mut() {
                    if let Some(p) = positions.next() {
                        *atom = atom.moved_to(p);
                    }
                }
            }
            tracing::trace!(dihedral = step as f64 * DIHEDRAL_STEP_DEGREES, "Graft placed.");
            return Ok(());
        }
    }
    Err(OperatorError::Clash)
}

fn has_clash(trunk: &[(Point3<f64>, f64, bool)], graft: &[(Point3<f64>, f64, bool)]) -> bool {
    iproduct!(trunk, graft).any(|((pa, ra, rotor_a), (pb, rb, rotor_b))| {
        if *rotor_a && *rotor_b {
            return false;
        }
        let cutoff = CLASH_FACTOR * (ra + rb);
        (pa - pb).norm_squared() < cutoff * cutoff
    })
}

/// Appends `graft` to `trunk` as a new branch of frame `parent`.
pub(super) fn attach(
    trunk: &mut Vec<Frame>,
    graft: Vec<Frame>,
    parent: usize,
    rotor_x: usize,
    rotor_y: usize,
) {
    let offset = trunk.len();
    for (k, mut frame) in graft.into_iter().enumerate() {
        if k == 0 {
            frame.parent = Some(parent);
            frame.rotor_x = rotor_x;
            frame.rotor_y = rotor_y;
        } else {
            frame.parent = frame.parent.map(|p| p + offset);
        }
        frame.branches = frame.branches.iter().map(|&c| c + offset).collect();
        trunk.push(frame);
    }
    trunk[parent].branches.push(offset);
}
