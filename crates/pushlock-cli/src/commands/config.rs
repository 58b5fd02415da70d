use clap::{Subcommand, ValueEnum};
use pushlock_core::error::{CoreError, Result};
use pushlock_core::Config;

#[derive(Clone, Copy, ValueEnum)]
pub enum Step {
    Up,
    Down,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a config value
    Get {
        /// Config key (e.g. "challenge.target_reps", "visual.movement_threshold")
        key: String,
    },
    /// Set a config value
    Set {
        /// Config key
        key: String,
        /// New value
        value: String,
    },
    /// List all config values
    List,
    /// Reset config to defaults
    Reset,
    /// Print the config file location
    Path,
    /// Move the required pushups one stepper increment (5..=50 by 5)
    Reps {
        #[arg(value_enum)]
        step: Step,
    },
}

pub fn run(action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            match config.get(&key) {
                Some(value) => println!("{value}"),
                None => return Err(CoreError::Custom(format!("unknown key: {key}"))),
            }
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            config.save()?;
            println!("ok");
        }
        ConfigAction::List => {
            let config = Config::load()?;
            let json = serde_json::to_string_pretty(&config)?;
            println!("{json}");
        }
        ConfigAction::Reset => {
            let config = Config::default();
            config.save()?;
            println!("config reset to defaults");
        }
        ConfigAction::Path => {
            println!("{}", Config::path()?.display());
        }
        ConfigAction::Reps { step } => {
            let mut config = Config::load()?;
            let target = config.adjust_target_reps(matches!(step, Step::Up));
            config.save()?;
            println!("{target}");
        }
    }
    Ok(())
}
