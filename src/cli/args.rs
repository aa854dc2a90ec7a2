//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Adaptive image delivery for static sites
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: pixfall.toml, searched upward)
    #[arg(short = 'C', long, global = true, default_value = "pixfall.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Enable verbose output for debugging
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Encode AVIF/WebP siblings for every original image
    #[command(visible_alias = "v")]
    Variants {
        /// Files or directories to encode. If omitted, encodes `[images] dir`.
        #[arg(value_name = "PATH", value_hint = clap::ValueHint::AnyPath)]
        paths: Vec<PathBuf>,

        /// Re-encode siblings even when they are newer than their source
        #[arg(short, long)]
        force: bool,
    },

    /// Run the format fallback against the built site and report broken images
    #[command(visible_alias = "c")]
    Check {
        #[command(flatten)]
        args: CheckArgs,
    },

    /// Rewrite built pages: `<picture>` fallbacks, placeholders and resource hints
    #[command(visible_alias = "r")]
    Rewrite {
        #[command(flatten)]
        args: RewriteArgs,
    },

    /// Serve the site through the offline cache
    #[command(visible_alias = "s")]
    Serve {
        /// Network interface to bind (e.g., 127.0.0.1, 0.0.0.0)
        #[arg(short, long)]
        interface: Option<std::net::IpAddr>,

        /// Port number to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Inspect or clean the offline cache stores
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheAction {
    /// List stores and their entries
    List,
    /// Delete every store that is not current
    Prune,
    /// Delete every store
    Clear,
}

/// Decoder used to emulate the client during `check`.
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ClientArg {
    /// AVIF and WebP
    #[default]
    Modern,
    /// WebP only
    Webp,
    /// Neither AVIF nor WebP
    Legacy,
    /// Whatever this build of the `image` crate can really decode
    Native,
}

/// Check command arguments.
#[derive(clap::Args, Debug, Clone)]
pub struct CheckArgs {
    /// Pages, images or directories to check. If omitted, checks every page.
    #[arg(value_name = "PATH", value_hint = clap::ValueHint::AnyPath)]
    pub paths: Vec<PathBuf>,

    /// Client codec support to emulate
    #[arg(long, value_enum, default_value_t)]
    pub client: ClientArg,

    /// Treat exhausted images as warnings instead of errors
    #[arg(long, short = 'w')]
    pub warn_only: bool,
}

/// Rewrite command arguments.
#[derive(clap::Args, Debug, Clone)]
pub struct RewriteArgs {
    /// HTML pages or directories to rewrite. If omitted, rewrites every page.
    #[arg(value_name = "PAGE", value_hint = clap::ValueHint::AnyPath)]
    pub pages: Vec<PathBuf>,

    /// Wrap `<img>` elements in `<picture>` with modern-format sources
    #[arg(long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
    pub picture: Option<bool>,

    /// Report what would change without writing
    #[arg(short, long)]
    pub dry: bool,
}
