//! Genetic operators that derive new ligands from existing ones.
//!
//! Every operator takes its inputs by shared reference and returns a freshly built
//! [`Ligand`](crate::core::models::ligand::Ligand); mutation points and summary
//! properties of the result are always derived anew.

use crate::core::models::atom::AtomType;
use crate::core::models::ligand::LigandError;
use thiserror::Error;

pub mod addition;
pub mod crossover;
mod graft;
pub mod subtraction;

pub use addition::addition;
pub use crossover::crossover;
pub use graft::{CLASH_FACTOR, DIHEDRAL_STEP_DEGREES};
pub use subtraction::subtraction;

#[derive(Debug, Error)]
pub enum OperatorError {
    #[error("Site {site} is not a valid {operation} site (ligand has {available})")]
    StructuralInfeasible {
        operation: &'static str,
        site: usize,
        available: usize,
    },
    #[error("No clash-free placement found for the grafted fragment")]
    Clash,
    #[error("Rotor atoms {left} and {right} have different valences")]
    Incompatible { left: AtomType, right: AtomType },
    #[error("Operator produced an invalid ligand: {0}")]
    Ligand(#[from] LigandError),
}
