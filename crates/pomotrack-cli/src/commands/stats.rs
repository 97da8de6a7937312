use clap::Subcommand;

use super::open_directory;

#[derive(Subcommand)]
pub enum StatsAction {
    /// Print today's session aggregates as JSON
    Today,
}

pub fn run(action: StatsAction, owner: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let (dir, owner) = open_directory(owner)?;

    match action {
        StatsAction::Today => {
            let stats = dir.day_stats(&owner)?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }
    Ok(())
}
