mod commands;
mod summary;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "irdash", about = "DASH/IR multi-read exposure reduction")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show multi-read exposure metadata
    Info(commands::info::InfoArgs),
    /// Extract difference frames and the association table
    Split(commands::split::SplitArgs),
    /// Run the full reduction pipeline
    Reduce(commands::reduce::ReduceArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match &cli.command {
        Commands::Info(args) => commands::info::run(args),
        Commands::Split(args) => commands::split::run(args),
        Commands::Reduce(args) => commands::reduce::run(args),
    }
}
