use super::defaults::DefaultsConfig;
use super::file::FileConfig;
use super::models::AppConfig;
use crate::cli::GrowArgs;
use crate::error::{CliError, Result};
use ligrow::core::oracle::filter::PropertyFilter;
use ligrow::engine::config as core_config;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

const FRAGMENT_EXTENSION: &str = "pdbqt";

pub fn build_config(args: &GrowArgs, threads: Option<usize>) -> Result<AppConfig> {
    let defaults = DefaultsConfig::default();

    let file_config = if let Some(config_path) = &args.config {
        FileConfig::from_file(config_path)?
    } else {
        FileConfig::default()
    };

    let mut file_config = apply_set_values(file_config, &args.set_values)?;

    let evolution = file_config.evolution.take().unwrap_or_default();
    let seed = args.seed.or(evolution.seed).unwrap_or(defaults.seed);
    let num_generations = args
        .generations
        .or(evolution.num_generations)
        .unwrap_or(defaults.num_generations);
    let num_elitists = args
        .elitists
        .or(evolution.num_elitists)
        .unwrap_or(defaults.num_elitists);
    let max_failures = args
        .max_failures
        .or(evolution.max_failures)
        .unwrap_or(defaults.max_failures);

    let population_file = file_config.population.take().unwrap_or_default();
    let population = core_config::PopulationConfig::new(
        args.additions
            .or(population_file.additions)
            .unwrap_or(defaults.num_additions),
        args.subtractions
            .or(population_file.subtractions)
            .unwrap_or(defaults.num_subtractions),
        args.crossovers
            .or(population_file.crossovers)
            .unwrap_or(defaults.num_crossovers),
    );

    let fragment_sources = if args.fragments.is_empty() {
        file_config.fragments.take().unwrap_or_default()
    } else {
        args.fragments.clone()
    };
    let fragments = resolve_fragments(&fragment_sources)?;
    debug!("Resolved {} fragment file(s).", fragments.len());

    let oracle_file = file_config.oracle.take().unwrap_or_default();
    let docking_command = args
        .docking_command
        .clone()
        .or(oracle_file.docking_command)
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| {
            CliError::Config(
                "A docking command is required either in the config file ([oracle] docking-command) or via --docking-command.".to_string(),
            )
        })?;

    let filter = file_config
        .filter
        .take()
        .unwrap_or_default()
        .resolve(PropertyFilter::default());
    if filter.min_logp > filter.max_logp {
        return Err(CliError::Config(format!(
            "filter.min-logp ({}) is greater than filter.max-logp ({})",
            filter.min_logp, filter.max_logp
        )));
    }

    let logp_command = args
        .logp_command
        .clone()
        .or(oracle_file.logp_command)
        .filter(|c| !c.trim().is_empty());
    // Without a predictor every ligand keeps a logP of 0.
    if logp_command.is_none() && !(filter.min_logp..=filter.max_logp).contains(&0.0) {
        return Err(CliError::Config(format!(
            "filter logP bounds [{}, {}] exclude 0 but no logP predictor is configured ([oracle] logp-command or --logp-command); every ligand would be rejected",
            filter.min_logp, filter.max_logp
        )));
    }

    let core_config = core_config::GrowthConfigBuilder::new()
        .seed(seed)
        .num_generations(num_generations)
        .num_elitists(num_elitists)
        .population(population)
        .max_failures(max_failures)
        .num_threads(threads.unwrap_or(0))
        .fragments(fragments)
        .output_dir(args.output.clone())
        .build()
        .map_err(|e| CliError::Config(e.to_string()))?;

    Ok(AppConfig {
        ligand_path: args.ligand.clone(),
        docking_command,
        logp_command,
        filter,
        core_config,
    })
}

/// Expands directories to the PDBQT files they contain, sorted by name; files are kept
/// as given.
fn resolve_fragments(sources: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut fragments = Vec::new();
    for source in sources {
        if source.is_dir() {
            let mut found: Vec<PathBuf> = std::fs::read_dir(source)?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|path| is_fragment_file(path))
                .collect();
            found.sort();
            if found.is_empty() {
                return Err(CliError::Argument(format!(
                    "Fragment directory contains no .{} files: {}",
                    FRAGMENT_EXTENSION,
                    source.display()
                )));
            }
            fragments.extend(found);
        } else if source.is_file() {
            fragments.push(source.clone());
        } else {
            return Err(CliError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("Provided path does not exist: {}", source.display()),
            )));
        }
    }
    Ok(fragments)
}

fn is_fragment_file(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(FRAGMENT_EXTENSION))
}

fn parse_value<T: FromStr>(key: &str, value: &str, kind: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| CliError::Config(format!("Invalid {} value for {}: {}", kind, key, value)))
}

fn apply_set_values(mut config: FileConfig, set_values: &[String]) -> Result<FileConfig> {
    for kv_pair in set_values {
        let Some((key, value_str)) = kv_pair.split_once('=') else {
            return Err(CliError::Config(format!(
                "Invalid --set format: '{}'. Expected KEY=VALUE.",
                kv_pair
            )));
        };
        let key = key.trim();

        match key {
            "evolution.seed" => {
                config.evolution.get_or_insert_with(Default::default).seed =
                    Some(parse_value(key, value_str, "integer")?);
            }
            "evolution.num-generations" => {
                config
                    .evolution
                    .get_or_insert_with(Default::default)
                    .num_generations = Some(parse_value(key, value_str, "integer")?);
            }
            "evolution.num-elitists" => {
                config
                    .evolution
                    .get_or_insert_with(Default::default)
                    .num_elitists = Some(parse_value(key, value_str, "integer")?);
            }
            "evolution.max-failures" => {
                config
                    .evolution
                    .get_or_insert_with(Default::default)
                    .max_failures = Some(parse_value(key, value_str, "integer")?);
            }
            "population.additions" => {
                config
                    .population
                    .get_or_insert_with(Default::default)
                    .additions = Some(parse_value(key, value_str, "integer")?);
            }
            "population.subtractions" => {
                config
                    .population
                    .get_or_insert_with(Default::default)
                    .subtractions = Some(parse_value(key, value_str, "integer")?);
            }
            "population.crossovers" => {
                config
                    .population
                    .get_or_insert_with(Default::default)
                    .crossovers = Some(parse_value(key, value_str, "integer")?);
            }
            "filter.max-heavy-atoms" => {
                config
                    .filter
                    .get_or_insert_with(Default::default)
                    .max_heavy_atoms = Some(parse_value(key, value_str, "integer")?);
            }
            "filter.max-molecular-weight" => {
                config
                    .filter
                    .get_or_insert_with(Default::default)
                    .max_molecular_weight = Some(parse_value(key, value_str, "float")?);
            }
            "filter.max-hb-donors" => {
                config
                    .filter
                    .get_or_insert_with(Default::default)
                    .max_hb_donors = Some(parse_value(key, value_str, "integer")?);
            }
            "filter.max-hb-acceptors" => {
                config
                    .filter
                    .get_or_insert_with(Default::default)
                    .max_hb_acceptors = Some(parse_value(key, value_str, "integer")?);
            }
            "filter.min-logp" => {
                config.filter.get_or_insert_with(Default::default).min_logp =
                    Some(parse_value(key, value_str, "float")?);
            }
            "filter.max-logp" => {
                config.filter.get_or_insert_with(Default::default).max_logp =
                    Some(parse_value(key, value_str, "float")?);
            }
            "oracle.docking-command" => {
                config
                    .oracle
                    .get_or_insert_with(Default::default)
                    .docking_command = Some(value_str.to_string());
            }
            "oracle.logp-command" => {
                config.oracle.get_or_insert_with(Default::default).logp_command =
                    Some(value_str.to_string());
            }
            _ => {
                return Err(CliError::Config(format!(
                    "Unsupported configuration key for --set: '{}'",
                    key
                )));
            }
        }
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::{TempDir, tempdir};

    fn setup_fragment_dir() -> TempDir {
        let dir = tempdir().unwrap();
        let frags = dir.path().join("fragments");
        fs::create_dir_all(&frags).unwrap();
        fs::write(frags.join("b.pdbqt"), b"").unwrap();
        fs::write(frags.join("a.pdbqt"), b"").unwrap();
        fs::write(frags.join("notes.txt"), b"").unwrap();
        dir
    }

    fn base_grow_args(base: &Path) -> GrowArgs {
        GrowArgs {
            ligand: PathBuf::from("seed.pdbqt"),
            fragments: vec![base.join("fragments")],
            output: base.join("out"),
            config: None,
            seed: None,
            generations: None,
            elitists: None,
            max_failures: None,
            additions: None,
            subtractions: None,
            crossovers: None,
            docking_command: Some("dock --ligand {ligand}".to_string()),
            logp_command: None,
            set_values: vec![],
        }
    }

    #[test]
    fn build_config_uses_defaults_for_unset_values() {
        let dir = setup_fragment_dir();
        let app = build_config(&base_grow_args(dir.path()), None).expect("build ok");
        let cfg = app.core_config;
        let defaults = DefaultsConfig::default();

        assert_eq!(cfg.seed, defaults.seed);
        assert_eq!(cfg.num_generations, defaults.num_generations);
        assert_eq!(cfg.num_elitists, defaults.num_elitists);
        assert_eq!(cfg.max_failures, defaults.max_failures);
        assert_eq!(cfg.num_threads, 0);
        assert_eq!(
            cfg.population,
            core_config::PopulationConfig::new(
                defaults.num_additions,
                defaults.num_subtractions,
                defaults.num_crossovers
            )
        );
        assert_eq!(
            cfg.fragments,
            vec![
                dir.path().join("fragments/a.pdbqt"),
                dir.path().join("fragments/b.pdbqt"),
            ]
        );
        assert_eq!(app.filter, PropertyFilter::default());
        assert_eq!(app.docking_command, "dock --ligand {ligand}");
    }

    #[test]
    fn build_config_reads_file_and_merges() {
        let dir = setup_fragment_dir();
        let cfg_path = dir.path().join("config.toml");
        let toml = r#"
            fragments = ["fragments/a.pdbqt"]

            [evolution]
            seed = 42
            num-generations = 3
            num-elitists = 4
            max-failures = 25

            [population]
            additions = 6
            subtractions = 2
            crossovers = 1

            [filter]
            max-heavy-atoms = 30
            max-logp = 4.0

            [oracle]
            docking-command = "vina-score {ligand}"
            "#;
        fs::write(&cfg_path, toml).unwrap();

        let mut args = base_grow_args(dir.path());
        args.config = Some(cfg_path);
        args.fragments = vec![];
        args.docking_command = None;

        let app = build_config(&args, Some(3)).expect("build ok");
        let cfg = app.core_config;

        assert_eq!(cfg.seed, 42);
        assert_eq!(cfg.num_generations, 3);
        assert_eq!(cfg.num_elitists, 4);
        assert_eq!(cfg.max_failures, 25);
        assert_eq!(cfg.num_threads, 3);
        assert_eq!(cfg.population, core_config::PopulationConfig::new(6, 2, 1));
        assert_eq!(cfg.fragments, vec![dir.path().join("fragments/a.pdbqt")]);
        assert_eq!(app.filter.max_heavy_atoms, 30);
        assert_eq!(app.filter.max_logp, 4.0);
        assert_eq!(app.filter.min_logp, PropertyFilter::default().min_logp);
        assert_eq!(app.docking_command, "vina-score {ligand}");
        assert_eq!(app.logp_command, None);
    }

    #[test]
    fn flags_take_precedence_over_set_values_for_the_same_key() {
        let dir = setup_fragment_dir();
        let cfg_path = dir.path().join("config.toml");
        fs::write(&cfg_path, "[evolution]\nnum-generations = 2\n").unwrap();

        let mut args = base_grow_args(dir.path());
        args.config = Some(cfg_path);
        args.set_values = vec!["evolution.num-generations=5".to_string()];

        // --set beats the file.
        let app = build_config(&args, None).expect("build ok");
        assert_eq!(app.core_config.num_generations, 5);

        // The dedicated flag beats --set.
        args.generations = Some(9);
        let app = build_config(&args, None).expect("build ok");
        assert_eq!(app.core_config.num_generations, 9);
    }

    #[test]
    fn logp_command_is_read_from_file_set_and_flag() {
        let dir = setup_fragment_dir();
        let cfg_path = dir.path().join("config.toml");
        fs::write(
            &cfg_path,
            "[filter]\nmin-logp = 1.0\n\n[oracle]\nlogp-command = \"xlogp3 {ligand}\"\n",
        )
        .unwrap();

        let mut args = base_grow_args(dir.path());
        args.config = Some(cfg_path);
        let app = build_config(&args, None).expect("build ok");
        assert_eq!(app.logp_command.as_deref(), Some("xlogp3 {ligand}"));
        assert_eq!(app.filter.min_logp, 1.0);

        args.set_values = vec!["oracle.logp-command=alogps {ligand}".to_string()];
        let app = build_config(&args, None).expect("build ok");
        assert_eq!(app.logp_command.as_deref(), Some("alogps {ligand}"));

        args.logp_command = Some("predict-logp {ligand}".to_string());
        let app = build_config(&args, None).expect("build ok");
        assert_eq!(app.logp_command.as_deref(), Some("predict-logp {ligand}"));
    }

    #[test]
    fn logp_bounds_excluding_zero_require_a_predictor() {
        let dir = setup_fragment_dir();
        let mut args = base_grow_args(dir.path());
        args.set_values = vec!["filter.min-logp=0.5".to_string()];
        let err = build_config(&args, None).err().expect("should fail");
        assert!(matches!(err, CliError::Config(msg) if msg.contains("logp-command")));

        args.logp_command = Some("xlogp3 {ligand}".to_string());
        assert!(build_config(&args, None).is_ok());
    }

    #[test]
    fn cli_overrides_file_values() {
        let dir = setup_fragment_dir();
        let cfg_path = dir.path().join("config.toml");
        fs::write(
            &cfg_path,
            "[evolution]\nnum-generations = 3\n[population]\nadditions = 6\n",
        )
        .unwrap();

        let mut args = base_grow_args(dir.path());
        args.config = Some(cfg_path);
        args.generations = Some(9);
        args.additions = Some(1);
        args.seed = Some(5);

        let cfg = build_config(&args, None).expect("build ok").core_config;
        assert_eq!(cfg.num_generations, 9);
        assert_eq!(cfg.population.num_additions, 1);
        assert_eq!(cfg.seed, 5);
    }

    #[test]
    fn set_values_override() {
        let dir = setup_fragment_dir();
        let mut args = base_grow_args(dir.path());
        args.set_values = vec![
            "evolution.num-elitists=3".to_string(),
            "population.crossovers=0".to_string(),
            "filter.min-logp=-2.5".to_string(),
            "filter.max-molecular-weight=450".to_string(),
        ];

        let app = build_config(&args, None).expect("build ok");
        assert_eq!(app.core_config.num_elitists, 3);
        assert_eq!(app.core_config.population.num_crossovers, 0);
        assert!((app.filter.min_logp + 2.5).abs() < 1e-12);
        assert!((app.filter.max_molecular_weight - 450.0).abs() < 1e-12);
    }

    #[test]
    fn invalid_set_values_are_rejected() {
        let dir = setup_fragment_dir();
        for bad in ["population.additions", "population.additions=many", "nope.key=1"] {
            let mut args = base_grow_args(dir.path());
            args.set_values = vec![bad.to_string()];
            assert!(
                matches!(build_config(&args, None), Err(CliError::Config(_))),
                "accepted {}",
                bad
            );
        }
    }

    #[test]
    fn unknown_file_keys_are_rejected() {
        let dir = setup_fragment_dir();
        let cfg_path = dir.path().join("config.toml");
        fs::write(&cfg_path, "[evolution]\ngenerations = 3\n").unwrap();
        let mut args = base_grow_args(dir.path());
        args.config = Some(cfg_path);
        assert!(matches!(
            build_config(&args, None),
            Err(CliError::FileParsing { .. })
        ));
    }

    #[test]
    fn missing_docking_command_is_an_error() {
        let dir = setup_fragment_dir();
        let mut args = base_grow_args(dir.path());
        args.docking_command = None;
        assert!(matches!(build_config(&args, None), Err(CliError::Config(_))));
    }

    #[test]
    fn missing_fragment_path_is_an_error() {
        let dir = setup_fragment_dir();
        let mut args = base_grow_args(dir.path());
        args.fragments = vec![dir.path().join("absent.pdbqt")];
        assert!(matches!(build_config(&args, None), Err(CliError::Io(_))));
    }

    #[test]
    fn additions_without_fragments_are_rejected_by_the_core_builder() {
        let dir = setup_fragment_dir();
        let mut args = base_grow_args(dir.path());
        args.fragments = vec![];
        assert!(matches!(build_config(&args, None), Err(CliError::Config(_))));

        args.additions = Some(0);
        assert!(build_config(&args, None).is_ok());
    }
}
