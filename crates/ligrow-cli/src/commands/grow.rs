use crate::cli::GrowArgs;
use crate::config::{AppConfig, build_config};
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use ligrow::{
    core::io::{pdbqt::PdbqtFile, traits::LigandFile},
    core::oracle::{CommandOracle, Oracle, OracleChain, Reported},
    engine::progress::ProgressReporter,
    workflows,
};
use std::sync::Arc;
use tracing::{info, warn};

pub fn run(args: GrowArgs, threads: Option<usize>) -> Result<()> {
    info!("Merging configuration from file and CLI arguments...");
    let config = build_config(&args, threads)?;

    info!("Loading seed ligand from {:?}", &config.ligand_path);
    let seed = PdbqtFile::read_from_path(&config.ligand_path).map_err(|e| {
        CliError::FileParsing {
            path: config.ligand_path.clone(),
            source: e.into(),
        }
    })?;

    let oracle: Arc<dyn Oracle> = Arc::new(build_oracle(&config)?);

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!("Starting ligand growth...");
    info!("Invoking the core growth workflow...");

    let result = workflows::grow::run(seed, &config.core_config, oracle, &reporter)?;

    let filled: usize = result.generations.iter().map(|g| g.filled).sum();
    info!(
        "Workflow finished: {} child(ren) accepted over {} generation(s).",
        filled,
        result.generations.len()
    );

    match result.best() {
        Some(best) if !Arc::ptr_eq(best, &result.initial) => {
            println!(
                "✓ Best ligand (efficacy {:.4}, free energy {:.4} kcal/mol): {}",
                best.efficacy(),
                best.free_energy(),
                best.id().display()
            );
        }
        _ => {
            warn!("No child improved on the seed ligand.");
            println!(
                "Warning: no child improved on the seed ligand (efficacy {:.4}).",
                result.initial.efficacy()
            );
        }
    }
    println!(
        "Results written to: {}",
        config.core_config.output_dir.display()
    );

    Ok(())
}

/// An optional logP predictor runs first so the property filter sees predicted logP values,
/// then the filter keeps non-drug-like candidates away from the docking program.
fn build_oracle(config: &AppConfig) -> Result<OracleChain> {
    let docking = CommandOracle::from_command_line(&config.docking_command).ok_or_else(|| {
        CliError::Argument(format!(
            "Invalid docking command: '{}'",
            config.docking_command
        ))
    })?;
    info!(program = docking.program(), "Using external docking oracle.");

    let mut chain = OracleChain::new();
    if let Some(command) = &config.logp_command {
        let predictor = CommandOracle::from_command_line(command)
            .ok_or_else(|| CliError::Argument(format!("Invalid logP command: '{}'", command)))?
            .reporting(Reported::Logp);
        info!(program = predictor.program(), "Using external logP predictor.");
        chain = chain.with(predictor);
    }
    Ok(chain.with(config.filter.clone()).with(docking))
}
