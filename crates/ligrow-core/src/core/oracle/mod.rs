//! Scoring oracles that accept or reject candidate ligands.
//!
//! An [`Oracle`] decides whether a ligand is acceptable and, if so, reports its binding
//! free energy and optionally a predicted logP. Rejections are ordinary outcomes; only
//! [`OracleError`] signals that the oracle itself could not run.

use crate::core::models::ligand::Ligand;
use std::borrow::Cow;
use thiserror::Error;

pub mod command;
pub mod filter;

pub use command::{CommandOracle, Reported};
pub use filter::PropertyFilter;

/// The verdict of an oracle on one ligand.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub valid: bool,
    /// Predicted binding free energy in kcal/mol; meaningful only when `valid`.
    pub free_energy: f64,
    /// Predicted octanol/water partition coefficient, if this oracle computes one.
    pub logp: Option<f64>,
}

impl Evaluation {
    pub fn accepted(free_energy: f64) -> Self {
        Self {
            valid: true,
            free_energy,
            logp: None,
        }
    }

    pub fn rejected() -> Self {
        Self {
            valid: false,
            free_energy: 0.0,
            logp: None,
        }
    }

    pub fn with_logp(mut self, logp: f64) -> Self {
        self.logp = Some(logp);
        self
    }

    /// Copies the reported properties onto `ligand`.
    pub fn apply_to(&self, ligand: Ligand) -> Ligand {
        let ligand = match self.logp {
            Some(logp) => ligand.with_logp(logp),
            None => ligand,
        };
        ligand.with_free_energy(self.free_energy)
    }
}

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("Oracle unavailable: {0}")]
    Unavailable(String),
}

/// Evaluates candidate ligands. Shared by every worker thread.
pub trait Oracle: Send + Sync {
    /// Scores `ligand`.
    ///
    /// # Errors
    ///
    /// Returns [`OracleError::Unavailable`] if the oracle cannot be reached at all. An
    /// unacceptable ligand is reported as an invalid [`Evaluation`], not an error.
    fn evaluate(&self, ligand: &Ligand) -> Result<Evaluation, OracleError>;
}

impl<F> Oracle for F
where
    F: Fn(&Ligand) -> Result<Evaluation, OracleError> + Send + Sync,
{
    fn evaluate(&self, ligand: &Ligand) -> Result<Evaluation, OracleError> {
        self(ligand)
    }
}

/// Runs oracles in order, stopping at the first rejection.
///
/// The free energy of an accepted ligand is the one reported by the last oracle. A logP
/// reported by one oracle is set on the ligand that later oracles see, so a predictor
/// placed in front of a [`PropertyFilter`] feeds the filter's logP bounds.
#[derive(Default)]
pub struct OracleChain {
    oracles: Vec<Box<dyn Oracle>>,
}

impl OracleChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, oracle: impl Oracle + 'static) -> Self {
        self.oracles.push(Box::new(oracle));
        self
    }

    pub fn len(&self) -> usize {
        self.oracles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.oracles.is_empty()
    }
}

impl Oracle for OracleChain {
    fn evaluate(&self, ligand: &Ligand) -> Result<Evaluation, OracleError> {
        let mut current = Cow::Borrowed(ligand);
        let mut logp = None;
        let mut last = Evaluation::accepted(ligand.free_energy());
        for oracle in &self.oracles {
            last = oracle.evaluate(&current)?;
            if !last.valid {
                return Ok(last);
            }
            if let Some(predicted) = last.logp {
                logp = Some(predicted);
                current = Cow::Owned(current.into_owned().with_logp(predicted));
            }
        }
        last.logp = logp;
        Ok(last)
    }
}
