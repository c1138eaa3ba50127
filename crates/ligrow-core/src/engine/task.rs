use super::cache::FragmentCache;
use super::config::OperatorKind;
use super::error::EngineError;
use super::state::{Elites, Population};
use super::utils::sampling::{draw_index, draw_rotatable_bond, slot_rng};
use crate::core::models::ligand::Ligand;
use crate::core::operators::{OperatorError, addition, crossover, subtraction};
use crate::core::oracle::Oracle;
use rand::Rng;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{instrument, trace, warn};

/// Everything the tasks of one generation share.
pub struct TaskContext {
    pub generation: usize,
    pub run_seed: u64,
    pub max_failures: usize,
    pub elites: Elites,
    pub fragments: Arc<[PathBuf]>,
    pub cache: Arc<FragmentCache>,
    pub oracle: Arc<dyn Oracle>,
    pub population: Population,
    /// Directory under which children are named `<generation>/<slot>.pdbqt`.
    pub output_dir: PathBuf,
    /// Attempts made by all tasks of the generation, for reporting.
    pub attempts: AtomicUsize,
}

impl TaskContext {
    pub fn child_id(&self, slot: usize) -> PathBuf {
        self.output_dir
            .join(self.generation.to_string())
            .join(format!("{}.pdbqt", slot))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    /// The slot holds an accepted child.
    Filled { attempts: usize },
    /// The retry budget ran out; the slot stays empty for this generation.
    Exhausted { attempts: usize },
}

impl TaskOutcome {
    pub fn is_filled(&self) -> bool {
        matches!(self, Self::Filled { .. })
    }

    pub fn attempts(&self) -> usize {
        match *self {
            Self::Filled { attempts } | Self::Exhausted { attempts } => attempts,
        }
    }
}

/// Why a single attempt produced no child.
#[derive(Debug)]
enum Miss {
    NoCandidates,
    Infeasible(&'static str),
    BadFragment(String),
    Operator(OperatorError),
    Rejected,
}

/// Fills one slot of a generation with one operator.
pub struct GenerationTask {
    slot: usize,
    kind: OperatorKind,
    context: Arc<TaskContext>,
}

impl GenerationTask {
    pub fn new(slot: usize, kind: OperatorKind, context: Arc<TaskContext>) -> Self {
        Self {
            slot,
            kind,
            context,
        }
    }

    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn kind(&self) -> OperatorKind {
        self.kind
    }

    /// Draws, builds and evaluates candidates until one is accepted or `max_failures`
    /// attempts have failed. At least one attempt is always made.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::OracleUnavailable`] as soon as the oracle cannot be reached.
    #[instrument(level = "debug", skip(self), fields(generation = self.context.generation, slot = self.slot, kind = %self.kind))]
    pub fn run(&self) -> Result<TaskOutcome, EngineError> {
        let ctx = &*self.context;
        let mut rng = slot_rng(ctx.run_seed, ctx.generation, self.slot);
        let mut failures = 0;

        loop {
            ctx.attempts.fetch_add(1, Ordering::Relaxed);
            match self.attempt(&mut rng)? {
                Ok(child) => {
                    let attempts = failures + 1;
                    if ctx.population.fill(self.slot, child).is_err() {
                        return Err(EngineError::Internal(format!(
                            "slot {} of generation {} was filled twice",
                            self.slot, ctx.generation
                        )));
                    }
                    trace!(attempts, "Slot filled.");
                    return Ok(TaskOutcome::Filled { attempts });
                }
                Err(miss) => {
                    trace!(?miss, "Attempt failed.");
                    failures += 1;
                    if failures >= ctx.max_failures {
                        warn!(
                            generation = ctx.generation,
                            slot = self.slot,
                            operator = %self.kind,
                            attempts = failures,
                            "Retry budget exhausted; slot left empty."
                        );
                        return Ok(TaskOutcome::Exhausted { attempts: failures });
                    }
                }
            }
        }
    }

    fn attempt(&self, rng: &mut impl Rng) -> Result<Result<Ligand, Miss>, EngineError> {
        let candidate = match self.kind {
            OperatorKind::Addition => self.try_addition(rng),
            OperatorKind::Subtraction => self.try_subtraction(rng),
            OperatorKind::Crossover => self.try_crossover(rng),
        };
        let candidate = match candidate {
            Ok(ligand) => ligand,
            Err(miss) => return Ok(Err(miss)),
        };

        let evaluation = self.context.oracle.evaluate(&candidate)?;
        if !evaluation.valid {
            return Ok(Err(Miss::Rejected));
        }
        Ok(Ok(evaluation.apply_to(candidate)))
    }

    fn draw_elite(&self, rng: &mut impl Rng) -> Result<&Arc<Ligand>, Miss> {
        let elites = &self.context.elites;
        draw_index(rng, elites.len())
            .map(|i| &elites[i])
            .ok_or(Miss::NoCandidates)
    }

    fn try_addition(&self, rng: &mut impl Rng) -> Result<Ligand, Miss> {
        let ctx = &*self.context;
        let l1 = self.draw_elite(rng)?;
        let fragment = draw_index(rng, ctx.fragments.len())
            .map(|i| &ctx.fragments[i])
            .ok_or(Miss::NoCandidates)?;
        if !l1.addition_feasible() {
            return Err(Miss::Infeasible("parent has no mutation point"));
        }
        let l2 = ctx.cache.get(fragment).map_err(|e| {
            warn!(error = %e, "Skipping unreadable fragment.");
            Miss::BadFragment(e.to_string())
        })?;
        if !l2.addition_feasible() {
            return Err(Miss::Infeasible("fragment has no mutation point"));
        }
        let site1 = rng.gen_range(0..l1.mutation_points().len());
        let site2 = rng.gen_range(0..l2.mutation_points().len());
        addition(ctx.child_id(self.slot), l1, &l2, site1, site2).map_err(Miss::Operator)
    }

    fn try_subtraction(&self, rng: &mut impl Rng) -> Result<Ligand, Miss> {
        let l1 = self.draw_elite(rng)?;
        if !l1.subtraction_feasible() {
            return Err(Miss::Infeasible("parent has no rotatable bond"));
        }
        let site = draw_rotatable_bond(rng, l1).ok_or(Miss::Infeasible("no rotatable bond"))?;
        subtraction(self.context.child_id(self.slot), l1, site).map_err(Miss::Operator)
    }

    fn try_crossover(&self, rng: &mut impl Rng) -> Result<Ligand, Miss> {
        let l1 = self.draw_elite(rng)?;
        let l2 = self.draw_elite(rng)?;
        if !l1.crossover_feasible() || !l2.crossover_feasible() {
            return Err(Miss::Infeasible("parent has no rotatable bond"));
        }
        let site1 = draw_rotatable_bond(rng, l1).ok_or(Miss::Infeasible("no rotatable bond"))?;
        let site2 = draw_rotatable_bond(rng, l2).ok_or(Miss::Infeasible("no rotatable bond"))?;
        crossover(self.context.child_id(self.slot), l1, l2, site1, site2).map_err(Miss::Operator)
    }
}
