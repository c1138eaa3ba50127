use super::{Evaluation, Oracle, OracleError};
use crate::core::models::ligand::Ligand;
use serde::{Deserialize, Serialize};

/// Rejects ligands whose summary properties leave drug-like bounds.
///
/// The filter never scores; an accepted ligand keeps the free energy it already has, so
/// the filter is normally placed in front of a docking oracle in an
/// [`OracleChain`](super::OracleChain).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyFilter {
    pub max_heavy_atoms: usize,
    pub max_molecular_weight: f64,
    pub max_hb_donors: usize,
    pub max_hb_acceptors: usize,
    pub min_logp: f64,
    pub max_logp: f64,
}

impl Default for PropertyFilter {
    fn default() -> Self {
        Self {
            max_heavy_atoms: 38,
            max_molecular_weight: 500.0,
            max_hb_donors: 5,
            max_hb_acceptors: 10,
            min_logp: -5.0,
            max_logp: 5.0,
        }
    }
}

impl PropertyFilter {
    pub fn accepts(&self, ligand: &Ligand) -> bool {
        ligand.num_heavy_atoms() <= self.max_heavy_atoms
            && ligand.molecular_weight() <= self.max_molecular_weight
            && ligand.num_hb_donors() <= self.max_hb_donors
            && ligand.num_hb_acceptors() <= self.max_hb_acceptors
            && (self.min_logp..=self.max_logp).contains(&ligand.logp())
    }
}

impl Oracle for PropertyFilter {
    fn evaluate(&self, ligand: &Ligand) -> Result<Evaluation, OracleError> {
        if self.accepts(ligand) {
            Ok(Evaluation::accepted(ligand.free_energy()))
        } else {
            tracing::trace!(id = %ligand.id().display(), "Ligand rejected by property filter.");
            Ok(Evaluation::rejected())
        }
    }
}
