//! Cadena CLI - command-line front end for the cadena pipeline engine.

mod commands;
mod preset;
mod stages;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cadena")]
#[command(author, version, about = "Cadena audio pipeline CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run analyzers over an audio file
    Analyze(commands::analyze::AnalyzeArgs),

    /// Process an audio file through a stage chain into a new file
    Process(commands::process::ProcessArgs),

    /// Render a waveform image of an audio file
    Graph(commands::graph::GraphArgs),

    /// Display media information about an audio file
    Info(commands::info::InfoArgs),

    /// List registered processors
    Processors(commands::processors::ProcessorsArgs),
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let cli = Cli::parse();

    register_processors()?;

    match cli.command {
        Commands::Analyze(args) => commands::analyze::run(args),
        Commands::Process(args) => commands::process::run(args),
        Commands::Graph(args) => commands::graph::run(args),
        Commands::Info(args) => commands::info::run(args),
        Commands::Processors(args) => commands::processors::run(args),
    }
}

fn register_processors() -> anyhow::Result<()> {
    cadena_core::register_builtins()?;
    cadena_decoders::register()?;
    cadena_effects::register()?;
    cadena_analyzers::register()?;
    cadena_encoders::register()?;
    cadena_graphers::register()?;
    Ok(())
}
