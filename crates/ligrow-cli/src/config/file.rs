use crate::error::{CliError, Result};
use ligrow::core::oracle::filter::PropertyFilter;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileEvolutionConfig {
    pub seed: Option<u64>,
    pub num_generations: Option<usize>,
    pub num_elitists: Option<usize>,
    pub max_failures: Option<usize>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FilePopulationConfig {
    pub additions: Option<usize>,
    pub subtractions: Option<usize>,
    pub crossovers: Option<usize>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileFilterConfig {
    pub max_heavy_atoms: Option<usize>,
    pub max_molecular_weight: Option<f64>,
    pub max_hb_donors: Option<usize>,
    pub max_hb_acceptors: Option<usize>,
    pub min_logp: Option<f64>,
    pub max_logp: Option<f64>,
}

impl FileFilterConfig {
    /// Fills the bounds left unset from `defaults`.
    pub fn resolve(self, defaults: PropertyFilter) -> PropertyFilter {
        PropertyFilter {
            max_heavy_atoms: self.max_heavy_atoms.unwrap_or(defaults.max_heavy_atoms),
            max_molecular_weight: self
                .max_molecular_weight
                .unwrap_or(defaults.max_molecular_weight),
            max_hb_donors: self.max_hb_donors.unwrap_or(defaults.max_hb_donors),
            max_hb_acceptors: self.max_hb_acceptors.unwrap_or(defaults.max_hb_acceptors),
            min_logp: self.min_logp.unwrap_or(defaults.min_logp),
            max_logp: self.max_logp.unwrap_or(defaults.max_logp),
        }
    }
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileOracleConfig {
    pub docking_command: Option<String>,
    pub logp_command: Option<String>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileConfig {
    pub fragments: Option<Vec<PathBuf>>,
    pub evolution: Option<FileEvolutionConfig>,
    pub population: Option<FilePopulationConfig>,
    pub filter: Option<FileFilterConfig>,
    pub oracle: Option<FileOracleConfig>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })?;

        // Relative fragment paths are relative to the configuration file.
        if let (Some(fragments), Some(base)) = (config.fragments.as_mut(), path.parent()) {
            for fragment in fragments.iter_mut().filter(|f| f.is_relative()) {
                *fragment = base.join(&*fragment);
            }
        }
        Ok(config)
    }
}
