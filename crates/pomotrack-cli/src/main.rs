use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "pomotrack", version, about = "Pomotrack CLI")]
struct Cli {
    /// Owner to act as (defaults to the configured default owner)
    #[arg(short, long, global = true)]
    owner: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Session control
    Session {
        #[command(subcommand)]
        action: commands::session::SessionAction,
    },
    /// Task management
    Task {
        #[command(subcommand)]
        action: commands::task::TaskAction,
    },
    /// Cadence configuration
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Daily session statistics
    Stats {
        #[command(subcommand)]
        action: commands::stats::StatsAction,
    },
}

fn main() {
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Session { action } => commands::session::run(action, cli.owner),
        Commands::Task { action } => commands::task::run(action, cli.owner),
        Commands::Config { action } => commands::config::run(action, cli.owner),
        Commands::Stats { action } => commands::stats::run(action, cli.owner),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
