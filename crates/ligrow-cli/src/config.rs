//! Run configuration assembled from built-in defaults, an optional TOML file,
//! `--set KEY=VALUE` overrides and dedicated command-line flags, in increasing order of
//! precedence. A `--set` override rewrites the file layer, so a flag for the same key wins.

pub mod builder;
pub mod defaults;
pub mod file;
pub mod models;

pub use builder::build_config;
pub use models::AppConfig;
