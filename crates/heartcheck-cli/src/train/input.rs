use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::ArgMatches;

use heartcheck_classifiers::config::{load_train_config, Hyperparameters, TrainConfig};

/// Environment variable naming a JSON `TrainConfig` file.
pub const CONFIG_ENV: &str = "HEARTCHECK_CONFIG";

/// Fully resolved inputs for one training run.
#[derive(Debug, Clone)]
pub struct TrainInput {
    pub config: TrainConfig,
    pub hyperparameters: Hyperparameters,
}

impl TrainInput {
    /// Build the run inputs from the optional config file and the parsed
    /// command line. Command line values win over the file.
    pub fn from_arguments(config_path: Option<&Path>, matches: &ArgMatches) -> Result<Self> {
        let mut config = match config_path {
            Some(path) => {
                log::info!("Using config: {}", path.display());
                load_train_config(path)
                    .with_context(|| format!("Failed to load config file: {}", path.display()))?
            }
            None => {
                log::debug!("{} not set; using default configuration", CONFIG_ENV);
                TrainConfig::default()
            }
        };

        if let Some(seed) = matches.get_one::<u64>("seed") {
            config.seed = Some(*seed);
        }

        let c = *matches
            .get_one::<f64>("C")
            .context("Missing value for --C")?;
        let max_iter = *matches
            .get_one::<u64>("max_iter")
            .context("Missing value for --max_iter")?;
        let max_iter = usize::try_from(max_iter)
            .with_context(|| format!("--max_iter {} is too large", max_iter))?;
        let hyperparameters = Hyperparameters::new(c, max_iter)?;

        config.validate()?;
        Ok(Self {
            config,
            hyperparameters,
        })
    }
}

/// Config file path from `HEARTCHECK_CONFIG`, if set and non-empty.
pub fn config_path_from_env() -> Option<PathBuf> {
    env::var_os(CONFIG_ENV)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}
