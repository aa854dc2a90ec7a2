//! pixfall - adaptive image delivery for static sites.

mod cli;
mod config;
mod core;
mod image;
mod logger;
mod offline;
mod page;
mod preload;
mod utils;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use config::PixConfig;

fn main() -> Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    core::setup_shutdown_handler()?;

    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    let config = PixConfig::load(&cli)?;

    match &cli.command {
        Commands::Variants { paths, force } => cli::variants::encode_variants(paths, *force, &config),
        Commands::Check { args } => cli::check::check_site(args, &config),
        Commands::Rewrite { args } => cli::rewrite::rewrite_pages(args, &config),
        Commands::Serve { .. } => cli::serve::serve(&config),
        Commands::Cache { action } => cli::cache::run_cache(*action, &config),
    }
}
