use clap::Subcommand;
use pomotrack_core::Config;

use super::open_directory;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the owner's effective cadence configuration
    Show,
    /// Update the owner's cadence settings (unset fields keep their value)
    Set {
        /// Work interval duration in minutes (1-60)
        #[arg(long)]
        work: Option<u32>,
        /// Short break duration in minutes (1-30)
        #[arg(long)]
        short_break: Option<u32>,
        /// Long break duration in minutes (1-60)
        #[arg(long)]
        long_break: Option<u32>,
        /// Work intervals before a long break (1-10)
        #[arg(long)]
        until_long_break: Option<u32>,
        /// Start breaks automatically
        #[arg(long)]
        auto_start_breaks: Option<bool>,
        /// Start work intervals automatically after breaks
        #[arg(long)]
        auto_start_pomodoros: Option<bool>,
    },
    /// Record the owner used when a command does not name one
    DefaultOwner {
        /// Owner name to write to the config file
        name: String,
    },
    /// Reset the config file to built-in defaults
    Reset,
}

pub fn run(action: ConfigAction, owner: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Show => {
            let (dir, owner) = open_directory(owner)?;
            let config = dir.cadence_config(&owner)?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        ConfigAction::Set {
            work,
            short_break,
            long_break,
            until_long_break,
            auto_start_breaks,
            auto_start_pomodoros,
        } => {
            let (dir, owner) = open_directory(owner)?;
            let mut config = dir.cadence_config(&owner)?;
            if let Some(v) = work {
                config.work_minutes = v;
            }
            if let Some(v) = short_break {
                config.short_break_minutes = v;
            }
            if let Some(v) = long_break {
                config.long_break_minutes = v;
            }
            if let Some(v) = until_long_break {
                config.pomodoros_until_long_break = v;
            }
            if let Some(v) = auto_start_breaks {
                config.auto_start_breaks = v;
            }
            if let Some(v) = auto_start_pomodoros {
                config.auto_start_pomodoros = v;
            }
            dir.set_cadence_config(&owner, &config)?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        ConfigAction::DefaultOwner { name } => {
            let mut config = Config::load()?;
            config.default_owner = name;
            config.save()?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        ConfigAction::Reset => {
            let config = Config::default();
            config.save()?;
            println!("config reset to defaults");
        }
    }
    Ok(())
}
