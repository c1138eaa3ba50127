use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "The ligrow developers",
    version,
    about = "ligrow - Grow drug-like ligands from a seed molecule with a fragment-based genetic algorithm.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of worker threads used to build each generation.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Grow a seed ligand over several generations and dock every offspring.
    Grow(GrowArgs),
}

/// Arguments for the `grow` subcommand.
#[derive(Args, Debug, Clone)]
pub struct GrowArgs {
    // --- Core Arguments ---
    /// Path to the seed ligand in PDBQT format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub ligand: PathBuf,

    /// Fragment PDBQT files, or directories whose .pdbqt files are all used.
    #[arg(short, long, value_name = "PATH", num_args(1..))]
    pub fragments: Vec<PathBuf>,

    /// Directory receiving one subdirectory per generation and the CSV log.
    #[arg(short, long, required = true, value_name = "DIR")]
    pub output: PathBuf,

    /// Path to a configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    // --- Evolution Overrides ---
    /// Seed of the random number generator.
    #[arg(long, value_name = "INT")]
    pub seed: Option<u64>,

    /// Number of generations to run.
    #[arg(short = 'g', long, value_name = "INT")]
    pub generations: Option<usize>,

    /// Number of elite ligands kept as parents.
    #[arg(short = 'e', long, value_name = "INT")]
    pub elitists: Option<usize>,

    /// Failed attempts after which a slot is left empty.
    #[arg(long, value_name = "INT")]
    pub max_failures: Option<usize>,

    // --- Population Overrides ---
    /// Children produced by addition per generation.
    #[arg(long, value_name = "INT")]
    pub additions: Option<usize>,

    /// Children produced by subtraction per generation.
    #[arg(long, value_name = "INT")]
    pub subtractions: Option<usize>,

    /// Children produced by crossover per generation.
    #[arg(long, value_name = "INT")]
    pub crossovers: Option<usize>,

    // --- Oracle ---
    /// Docking command; `{ligand}` is replaced by the path of the candidate PDBQT file
    /// and the last line printed must be the free energy in kcal/mol.
    #[arg(short = 'd', long, value_name = "CMD")]
    pub docking_command: Option<String>,

    /// LogP predictor command; `{ligand}` is replaced as for the docking command and the
    /// last line printed must be the predicted logP. Required when the logP bounds of the
    /// property filter exclude 0.
    #[arg(long, value_name = "CMD")]
    pub logp_command: Option<String>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S population.additions=40
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}
