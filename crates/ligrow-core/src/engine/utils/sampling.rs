use crate::core::models::ligand::Ligand;
use rand::prelude::*;
use rand::rngs::StdRng;

/// Mixes the run seed with a slot's coordinates into the seed of that slot's random stream.
///
/// Streams of different slots are independent of each other and of scheduling, so a run
/// is reproducible for a fixed run seed whatever the number of worker threads.
pub fn derive_seed(run_seed: u64, generation: usize, slot: usize) -> u64 {
    let mut z = run_seed;
    for word in [generation as u64, slot as u64] {
        z = splitmix64(z ^ splitmix64(word));
    }
    z
}

fn splitmix64(x: u64) -> u64 {
    let mut z = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

pub fn slot_rng(run_seed: u64, generation: usize, slot: usize) -> StdRng {
    StdRng::seed_from_u64(derive_seed(run_seed, generation, slot))
}

/// Uniform index in `[0, len)`, or `None` when there is nothing to draw from.
pub fn draw_index(rng: &mut impl Rng, len: usize) -> Option<usize> {
    (len > 0).then(|| rng.gen_range(0..len))
}

/// Uniform rotatable-bond index in `[1, num_rotatable_bonds]`.
pub fn draw_rotatable_bond(rng: &mut impl Rng, ligand: &Ligand) -> Option<usize> {
    let n = ligand.num_rotatable_bonds();
    (n > 0).then(|| rng.gen_range(1..=n))
}
