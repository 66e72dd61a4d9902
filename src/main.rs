use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(version, about = "Tracks PvP fight performance from a combat feed")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Tail the combat feed and record fights (default)
    Run,
    /// Merge fights from a JSON export into the history
    Import {
        #[arg(short, long)]
        path: PathBuf,
    },
    /// Write the fight history to a JSON file
    Export {
        #[arg(short, long)]
        path: PathBuf,
    },
    /// Print totals across the fight history
    Totals,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run             => pvp_tracker_lib::run(),
        Commands::Import { path } => pvp_tracker_lib::import(&path),
        Commands::Export { path } => pvp_tracker_lib::export(&path),
        Commands::Totals          => pvp_tracker_lib::totals(),
    }
}
