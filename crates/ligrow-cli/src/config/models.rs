use ligrow::core::oracle::filter::PropertyFilter;
use ligrow::engine::config as core_config;
use std::path::PathBuf;

pub struct AppConfig {
    pub ligand_path: PathBuf,
    pub docking_command: String,
    pub logp_command: Option<String>,
    pub filter: PropertyFilter,
    pub core_config: core_config::GrowthConfig,
}
