use anyhow::Result;
use log::LevelFilter;

use heartcheck_cli::cli::build_cli;
use heartcheck_cli::train::input::{config_path_from_env, TrainInput};
use heartcheck_cli::train::runner::{outcome_summary, run_training};

fn main() -> Result<()> {
    env_logger::Builder::default()
        .filter_level(LevelFilter::Error)
        .parse_env(env_logger::Env::default().filter_or("HEARTCHECK_LOG", "error,heartcheck=info"))
        .init();

    let matches = build_cli().get_matches();

    let config_path = config_path_from_env();
    let input = match TrainInput::from_arguments(config_path.as_deref(), &matches) {
        Ok(input) => input,
        Err(e) => {
            log::error!("Invalid configuration: {:#}", e);
            std::process::exit(1)
        }
    };

    match run_training(&input) {
        Ok(outcome) => {
            println!("{}", serde_json::to_string_pretty(&outcome_summary(&outcome, &input))?);
            Ok(())
        }
        Err(e) => {
            log::error!("Training failed: {:#}", e);
            std::process::exit(1)
        }
    }
}
