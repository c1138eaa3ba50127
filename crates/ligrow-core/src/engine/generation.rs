use super::cache::FragmentCache;
use super::config::{GrowthConfig, OperatorKind};
use super::error::EngineError;
use super::pool::TaskPool;
use super::progress::{Progress, ProgressReporter};
use super::state::{Elites, Population};
use super::task::{GenerationTask, TaskContext, TaskOutcome};
use crate::core::models::ligand::Ligand;
use crate::core::oracle::Oracle;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, mpsc};
use tracing::{info, instrument};

/// Summary of one generation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationReport {
    pub generation: usize,
    pub slots: usize,
    pub filled: usize,
    pub exhausted: usize,
    pub attempts: usize,
    pub best_efficacy: Option<f64>,
}

#[derive(Debug)]
pub struct GenerationOutput {
    /// Accepted children in slot order.
    pub children: Vec<Ligand>,
    pub report: GenerationReport,
}

/// Runs one task per slot of `config.population` on `pool` and waits for all of them.
///
/// Slots whose tasks exhaust their retry budget are missing from the output; each one is
/// announced with a [`Progress::Message`].
///
/// # Errors
///
/// Returns the first hard task error, such as [`EngineError::OracleUnavailable`], after
/// every task of the generation has finished.
#[instrument(level = "info", skip_all, fields(generation = generation))]
pub fn run_generation(
    pool: &TaskPool,
    generation: usize,
    config: &GrowthConfig,
    elites: Elites,
    cache: &Arc<FragmentCache>,
    oracle: &Arc<dyn Oracle>,
    reporter: &ProgressReporter,
) -> Result<GenerationOutput, EngineError> {
    let slots = config.population.total();
    let population = Population::new(slots);
    let context = Arc::new(TaskContext {
        generation,
        run_seed: config.seed,
        max_failures: config.max_failures,
        elites,
        fragments: config.fragments.iter().cloned().collect::<Arc<[PathBuf]>>(),
        cache: Arc::clone(cache),
        oracle: Arc::clone(oracle),
        population: population.clone(),
        output_dir: config.output_dir.clone(),
        attempts: AtomicUsize::new(0),
    });

    reporter.report(Progress::SlotsStart {
        total_slots: slots as u64,
    });

    let (sender, receiver) = mpsc::channel::<(usize, OperatorKind, TaskOutcome)>();
    for slot in 0..slots {
        let kind = config
            .population
            .kind_of(slot)
            .ok_or_else(|| EngineError::Internal(format!("slot {} has no operator", slot)))?;
        let task = GenerationTask::new(slot, kind, Arc::clone(&context));
        let sender = sender.clone();
        pool.submit(move || {
            let outcome = task.run()?;
            // The receiver only goes away once the generation is over.
            let _ = sender.send((slot, kind, outcome));
            Ok(())
        })?;
    }
    drop(sender);

    let mut exhausted = 0;
    for (slot, kind, outcome) in receiver {
        if !outcome.is_filled() {
            exhausted += 1;
            reporter.report(Progress::Message(format!(
                "Generation {}: {} slot {} left empty after {} attempt(s).",
                generation,
                kind,
                slot,
                outcome.attempts()
            )));
        }
        reporter.report(Progress::SlotFinished {
            filled: outcome.is_filled(),
        });
    }
    pool.join()?;
    let attempts = context.attempts.load(Ordering::Relaxed);

    let children: Vec<Ligand> = population.filled().map(|(_, l)| l.clone()).collect();
    let best_efficacy = children
        .iter()
        .min_by(|a, b| a.cmp_efficacy(b))
        .map(Ligand::efficacy);
    let report = GenerationReport {
        generation,
        slots,
        filled: children.len(),
        exhausted,
        attempts,
        best_efficacy,
    };
    info!(
        filled = report.filled,
        exhausted = report.exhausted,
        best_efficacy = ?report.best_efficacy,
        "Generation complete."
    );
    Ok(GenerationOutput { children, report })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::config::{GrowthConfigBuilder, PopulationConfig};
    use crate::engine::task::test_support::{FixtureSource, HeavyAtomOracle, UnavailableOracle};
    use crate::core::models::ligand::fixtures;
    use std::sync::Mutex;

    fn config(population: PopulationConfig, max_failures: usize) -> GrowthConfig {
        GrowthConfigBuilder::new()
            .seed(7)
            .num_generations(1)
            .num_elitists(2)
            .population(population)
            .max_failures(max_failures)
            .fragments(vec![PathBuf::from("fragment.pdbqt")])
            .output_dir(PathBuf::from("out"))
            .build()
            .unwrap()
    }

    fn elites(ligands: Vec<Ligand>) -> Elites {
        ligands.into_iter().map(Arc::new).collect()
    }

    fn cache() -> Arc<FragmentCache> {
        Arc::new(FragmentCache::new(FixtureSource))
    }

    #[test]
    fn fills_every_feasible_slot_and_reports_progress() {
        let pool = TaskPool::new(3).unwrap();
        let oracle: Arc<dyn Oracle> = Arc::new(HeavyAtomOracle::new(true));
        let events = Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            events.lock().unwrap().push(event);
        }));

        let output = run_generation(
            &pool,
            1,
            &config(PopulationConfig::new(2, 1, 1), 20),
            elites(vec![fixtures::seed(), fixtures::chain()]),
            &cache(),
            &oracle,
            &reporter,
        )
        .unwrap();
        drop(reporter);

        assert_eq!(output.report.slots, 4);
        assert_eq!(output.report.filled + output.report.exhausted, 4);
        assert_eq!(output.children.len(), output.report.filled);
        assert!(output.report.attempts >= 4);
        assert_eq!(output.report.best_efficacy, Some(-1.5));

        let events = events.into_inner().unwrap();
        assert!(matches!(events[0], Progress::SlotsStart { total_slots: 4 }));
        let finished = events
            .iter()
            .filter(|e| matches!(e, Progress::SlotFinished { .. }))
            .count();
        assert_eq!(finished, 4);
    }

    #[test]
    fn exhausted_slots_leave_the_generation_short() {
        let pool = TaskPool::new(2).unwrap();
        let oracle: Arc<dyn Oracle> = Arc::new(HeavyAtomOracle::new(true));
        let messages = Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            if let Progress::Message(text) = event {
                messages.lock().unwrap().push(text);
            }
        }));
        // A root-only parent can neither lose nor swap a branch.
        let output = run_generation(
            &pool,
            1,
            &config(PopulationConfig::new(0, 2, 1), 3),
            elites(vec![fixtures::rigid()]),
            &cache(),
            &oracle,
            &reporter,
        )
        .unwrap();
        drop(reporter);

        assert!(output.children.is_empty());
        assert_eq!(output.report.exhausted, 3);
        assert_eq!(output.report.attempts, 9);
        assert_eq!(output.report.best_efficacy, None);

        let mut messages = messages.into_inner().unwrap();
        messages.sort();
        assert_eq!(
            messages,
            vec![
                "Generation 1: crossover slot 2 left empty after 3 attempt(s).",
                "Generation 1: subtraction slot 0 left empty after 3 attempt(s).",
                "Generation 1: subtraction slot 1 left empty after 3 attempt(s).",
            ]
        );
    }

    #[test]
    fn unavailable_oracle_fails_the_generation() {
        let pool = TaskPool::new(2).unwrap();
        let oracle: Arc<dyn Oracle> = Arc::new(UnavailableOracle);
        let result = run_generation(
            &pool,
            1,
            &config(PopulationConfig::new(2, 0, 0), 5),
            elites(vec![fixtures::seed()]),
            &cache(),
            &oracle,
            &ProgressReporter::new(),
        );
        assert!(matches!(result, Err(EngineError::OracleUnavailable(_))));
        // The pool stays usable for the caller.
        pool.join().unwrap();
    }

    #[test]
    fn results_do_not_depend_on_thread_count() {
        let run = |threads| {
            let pool = TaskPool::new(threads).unwrap();
            let oracle: Arc<dyn Oracle> = Arc::new(HeavyAtomOracle::new(true));
            run_generation(
                &pool,
                2,
                &config(PopulationConfig::new(3, 1, 2), 10),
                elites(vec![fixtures::seed(), fixtures::chain()]),
                &cache(),
                &oracle,
                &ProgressReporter::new(),
            )
            .unwrap()
            .children
        };
        assert_eq!(run(1), run(4));
    }
}
