mod commands;
mod config;
mod loader;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{edit, inspect, roundtrip, EditArgs, InspectArgs, RoundtripArgs};
use config::Config;
use tracing_subscriber::EnvFilter;

/// Xedit CLI - structural XML editing against a docSpec
#[derive(Parser, Debug)]
#[command(name = "xedit")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log editor internals (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the canonical serialization of a document
    Roundtrip(RoundtripArgs),

    /// Print the focus traversal order and validation warnings
    Inspect(InspectArgs),

    /// Apply a JSON edit script
    Edit(EditArgs),
}

fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli) {
        eprintln!();
        eprintln!("{} {:#}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?.display().to_string();
    let config = Config::load(&cwd)?;

    let default_level = if cli.verbose {
        "debug".to_string()
    } else {
        config.log_level.unwrap_or_else(|| "warn".to_string())
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    match cli.command {
        Command::Roundtrip(args) => roundtrip(args, &cwd),
        Command::Inspect(args) => inspect(args, &cwd),
        Command::Edit(args) => edit(args, &cwd),
    }
}
