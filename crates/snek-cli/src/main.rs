use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::filter::EnvFilter;

mod commands;
mod config;

use commands::{scenarios::ScenariosCommand, stress::StressCommand};

#[derive(Parser)]
#[command(name = "snek", version, about = "snek VM memory manager driver")]
struct Cli {
    /// Path to snek.toml (searched upwards from the current directory by default)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Cap on live objects
    #[arg(long, global = true)]
    max_objects: Option<usize>,

    /// Live object count at which a collection is due
    #[arg(long, global = true)]
    threshold: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay the reference GC scenarios
    Scenarios(ScenariosCommand),
    /// Allocation churn with a rooted subset
    Stress(StressCommand),
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = config::load_config(cli.config.as_deref())?;
    let gc_config = config.gc.to_gc_config(cli.max_objects, cli.threshold);

    match cli.command {
        Commands::Scenarios(cmd) => cmd.run(&gc_config)?,
        Commands::Stress(cmd) => cmd.run(&gc_config)?,
    }

    Ok(())
}
