//! featprep - Main Entry Point
//!
//! Feature preparation for the bonus model: clean, transform, split.

use clap::Parser;
use colored::*;
use featprep::cli::{cmd_clean, cmd_info, cmd_run, cmd_split, cmd_transform, load_config, Cli, Commands};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "featprep=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let outcome = load_config(&cli).and_then(|config| match cli.command {
        Commands::Clean { input, output } => cmd_clean(config, input, output),
        Commands::Transform { input, output } => cmd_transform(config, input, output),
        Commands::Split { input, out_dir } => cmd_split(config, input, out_dir),
        Commands::Run { input, out_dir } => cmd_run(config, input, out_dir),
        Commands::Info { data } => cmd_info(&data),
    });

    if let Err(e) = &outcome {
        eprintln!("  {} {}", "✗".red(), e.to_string().red());
    }
    outcome
}
