use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid value for '{parameter}': {reason}")]
    InvalidValue {
        parameter: &'static str,
        reason: String,
    },
}

/// The genetic operator a generation slot is filled with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorKind {
    Addition,
    Subtraction,
    Crossover,
}

impl OperatorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Addition => "addition",
            Self::Subtraction => "subtraction",
            Self::Crossover => "crossover",
        }
    }
}

impl fmt::Display for OperatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How many children each operator contributes to a generation.
///
/// Slots are laid out as all additions, then all subtractions, then all crossovers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PopulationConfig {
    pub num_additions: usize,
    pub num_subtractions: usize,
    pub num_crossovers: usize,
}

impl PopulationConfig {
    pub fn new(num_additions: usize, num_subtractions: usize, num_crossovers: usize) -> Self {
        Self {
            num_additions,
            num_subtractions,
            num_crossovers,
        }
    }

    pub fn total(&self) -> usize {
        self.num_additions + self.num_subtractions + self.num_crossovers
    }

    /// The operator owning `slot`, or `None` past the last slot.
    pub fn kind_of(&self, slot: usize) -> Option<OperatorKind> {
        if slot < self.num_additions {
            Some(OperatorKind::Addition)
        } else if slot < self.num_additions + self.num_subtractions {
            Some(OperatorKind::Subtraction)
        } else if slot < self.total() {
            Some(OperatorKind::Crossover)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GrowthConfig {
    /// Run seed from which every task's random stream is derived.
    pub seed: u64,
    pub num_generations: usize,
    /// Number of ligands kept as parents for the next generation.
    pub num_elitists: usize,
    pub population: PopulationConfig,
    /// Failed attempts after which a task gives up on its slot.
    pub max_failures: usize,
    /// Worker threads; 0 lets the pool pick one per core.
    pub num_threads: usize,
    pub fragments: Vec<PathBuf>,
    pub output_dir: PathBuf,
}

#[derive(Default)]
pub struct GrowthConfigBuilder {
    seed: Option<u64>,
    num_generations: Option<usize>,
    num_elitists: Option<usize>,
    population: Option<PopulationConfig>,
    max_failures: Option<usize>,
    num_threads: Option<usize>,
    fragments: Option<Vec<PathBuf>>,
    output_dir: Option<PathBuf>,
}

impl GrowthConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
    pub fn num_generations(mut self, n: usize) -> Self {
        self.num_generations = Some(n);
        self
    }
    pub fn num_elitists(mut self, n: usize) -> Self {
        self.num_elitists = Some(n);
        self
    }
    pub fn population(mut self, population: PopulationConfig) -> Self {
        self.population = Some(population);
        self
    }
    pub fn max_failures(mut self, n: usize) -> Self {
        self.max_failures = Some(n);
        self
    }
    pub fn num_threads(mut self, n: usize) -> Self {
        self.num_threads = Some(n);
        self
    }
    pub fn fragments(mut self, fragments: Vec<PathBuf>) -> Self {
        self.fragments = Some(fragments);
        self
    }
    pub fn output_dir(mut self, path: PathBuf) -> Self {
        self.output_dir = Some(path);
        self
    }

    pub fn build(self) -> Result<GrowthConfig, ConfigError> {
        let config = GrowthConfig {
            seed: self.seed.unwrap_or(0),
            num_generations: self
                .num_generations
                .ok_or(ConfigError::MissingParameter("num_generations"))?,
            num_elitists: self
                .num_elitists
                .ok_or(ConfigError::MissingParameter("num_elitists"))?,
            population: self
                .population
                .ok_or(ConfigError::MissingParameter("population"))?,
            max_failures: self
                .max_failures
                .ok_or(ConfigError::MissingParameter("max_failures"))?,
            num_threads: self.num_threads.unwrap_or(0),
            fragments: self
                .fragments
                .ok_or(ConfigError::MissingParameter("fragments"))?,
            output_dir: self
                .output_dir
                .ok_or(ConfigError::MissingParameter("output_dir"))?,
        };

        if config.num_elitists == 0 {
            return Err(ConfigError::InvalidValue {
                parameter: "num_elitists",
                reason: "at least one elite is needed to breed from".to_string(),
            });
        }
        if config.population.num_additions > 0 && config.fragments.is_empty() {
            return Err(ConfigError::InvalidValue {
                parameter: "fragments",
                reason: "additions are requested but no fragment was given".to_string(),
            });
        }
        Ok(config)
    }
}
