use crate::core::io::pdbqt::{PdbqtFile, PdbqtSource};
use crate::core::io::traits::LigandFile;
use crate::core::models::ligand::Ligand;
use crate::core::oracle::Oracle;
use crate::engine::cache::FragmentCache;
use crate::engine::config::GrowthConfig;
use crate::engine::error::EngineError;
use crate::engine::generation::{GenerationReport, run_generation};
use crate::engine::pool::TaskPool;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::state::{Elites, select_elites};
use serde::Serialize;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, instrument};

pub const LOG_FILE_NAME: &str = "log.csv";

#[derive(Debug, Clone)]
pub struct GrowthResult {
    /// The seed ligand with its oracle score.
    pub initial: Arc<Ligand>,
    /// The final elite population, best efficacy first.
    pub elites: Vec<Arc<Ligand>>,
    pub generations: Vec<GenerationReport>,
}

impl GrowthResult {
    pub fn best(&self) -> Option<&Arc<Ligand>> {
        self.elites.first()
    }
}

#[derive(Debug, Serialize)]
struct LogRecord {
    generation: usize,
    id: String,
    parent1: String,
    parent2: String,
    heavy_atoms: usize,
    hb_donors: usize,
    hb_acceptors: usize,
    molecular_weight: f64,
    logp: f64,
    free_energy: f64,
    efficacy: f64,
}

impl LogRecord {
    fn new(generation: usize, ligand: &Ligand) -> Self {
        let parent = |i: usize| {
            ligand
                .parents()
                .get(i)
                .map(|p| p.display().to_string())
                .unwrap_or_default()
        };
        Self {
            generation,
            id: ligand.id().display().to_string(),
            parent1: parent(0),
            parent2: parent(1),
            heavy_atoms: ligand.num_heavy_atoms(),
            hb_donors: ligand.num_hb_donors(),
            hb_acceptors: ligand.num_hb_acceptors(),
            molecular_weight: ligand.molecular_weight(),
            logp: ligand.logp(),
            free_energy: ligand.free_energy(),
            efficacy: ligand.efficacy(),
        }
    }
}

/// Appends one row per scored ligand to `<output>/log.csv`.
struct GrowthLog {
    path: PathBuf,
    writer: csv::Writer<File>,
}

impl GrowthLog {
    fn create(output_dir: &Path) -> Result<Self, EngineError> {
        let path = output_dir.join(LOG_FILE_NAME);
        let writer = csv::Writer::from_path(&path).map_err(|e| output_error(&path, e))?;
        Ok(Self { path, writer })
    }

    fn record<'a>(
        &mut self,
        generation: usize,
        ligands: impl IntoIterator<Item = &'a Ligand>,
    ) -> Result<(), EngineError> {
        for ligand in ligands {
            self.writer
                .serialize(LogRecord::new(generation, ligand))
                .map_err(|e| output_error(&self.path, e))?;
        }
        self.writer.flush().map_err(|e| output_error(&self.path, e))
    }
}

fn output_error(path: &Path, error: impl ToString) -> EngineError {
    EngineError::Output {
        path: path.to_path_buf(),
        message: error.to_string(),
    }
}

/// Grows `initial` for `config.num_generations` generations.
///
/// Children are written to `<output>/<generation>/<slot>.pdbqt` and every scored ligand,
/// the seed included as generation 0, is appended to `<output>/log.csv`. Fragments are
/// read lazily from their PDBQT files; an unreadable fragment only costs the attempt that
/// drew it.
///
/// # Errors
///
/// Returns [`EngineError::Initialization`] if the oracle rejects the seed,
/// [`EngineError::OracleUnavailable`] if the oracle cannot be reached, and
/// [`EngineError::Output`] if results cannot be written.
#[instrument(skip_all, name = "growth_workflow")]
pub fn run(
    initial: Ligand,
    config: &GrowthConfig,
    oracle: Arc<dyn Oracle>,
    reporter: &ProgressReporter,
) -> Result<GrowthResult, EngineError> {
    // === Phase 0: Preparation ===
    reporter.report(Progress::PhaseStart {
        name: "Preparation",
    });
    fs::create_dir_all(&config.output_dir).map_err(|e| output_error(&config.output_dir, e))?;
    let pool = TaskPool::new(config.num_threads)?;
    let cache = Arc::new(FragmentCache::new(PdbqtSource));
    let mut log = GrowthLog::create(&config.output_dir)?;
    info!(
        threads = pool.num_threads(),
        fragments = config.fragments.len(),
        "Growth run prepared."
    );
    reporter.report(Progress::PhaseFinish);

    // === Phase 1: Score the seed ===
    reporter.report(Progress::PhaseStart {
        name: "Scoring Seed",
    });
    let initial = Arc::new(score_seed(initial, oracle.as_ref())?);
    log.record(0, [initial.as_ref()])?;
    info!(
        free_energy = initial.free_energy(),
        efficacy = initial.efficacy(),
        "Seed ligand scored."
    );
    reporter.report(Progress::PhaseFinish);

    // === Phase 2: Generations ===
    let mut elites: Elites = Arc::from([Arc::clone(&initial)]);
    let mut generations = Vec::with_capacity(config.num_generations);
    for generation in 1..=config.num_generations {
        reporter.report(Progress::GenerationStart {
            generation,
            total: config.num_generations,
        });

        let output = run_generation(
            &pool,
            generation,
            config,
            Arc::clone(&elites),
            &cache,
            &oracle,
            reporter,
        )?;
        write_children(&config.output_dir, generation, &output.children)?;
        log.record(generation, &output.children)?;

        elites = select_elites(&elites, output.children, config.num_elitists).into();
        info!(
            generation,
            filled = output.report.filled,
            best_elite = elites.first().map(|l| l.efficacy()),
            "Elites updated."
        );
        reporter.report(Progress::GenerationFinish {
            generation,
            filled: output.report.filled,
            best_efficacy: output.report.best_efficacy,
        });
        generations.push(output.report);
    }
    pool.shutdown();

    info!(
        "Growth complete. {} elite(s) after {} generation(s).",
        elites.len(),
        generations.len()
    );
    Ok(GrowthResult {
        initial,
        elites: elites.to_vec(),
        generations,
    })
}

fn score_seed(initial: Ligand, oracle: &dyn Oracle) -> Result<Ligand, EngineError> {
    let evaluation = oracle.evaluate(&initial)?;
    if !evaluation.valid {
        return Err(EngineError::Initialization(format!(
            "seed ligand '{}' was rejected by the oracle",
            initial.id().display()
        )));
    }
    Ok(evaluation.apply_to(initial))
}

fn write_children(output_dir: &Path, generation: usize, children: &[Ligand]) -> Result<(), EngineError> {
    let dir = output_dir.join(generation.to_string());
    fs::create_dir_all(&dir).map_err(|e| output_error(&dir, e))?;
    for child in children {
        PdbqtFile::write_to_path(child, child.id()).map_err(|e| output_error(child.id(), e))?;
    }
    Ok(())
}
