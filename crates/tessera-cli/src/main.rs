//! Tessera CLI.
//!
//! Evaluates attribute-based access decisions against TOML fixtures.
//!
//! # Quick Start
//!
//! ```bash
//! # Ask the same question three times; answers two and three come from cache
//! tessera check fixture.toml --user alice --resource design-docs --repeat 3
//!
//! # Show the effective configuration
//! tessera config show --format toml
//! ```

mod commands;
mod style;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tessera_config::TesseraConfig;
use tessera_types::NegativeCacheMode;

use commands::check::CheckArgs;
use commands::config::OutputFormat;

/// Tessera - attribute-based access control with cached decisions.
#[derive(Parser)]
#[command(name = "tessera")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Project directory containing tessera.toml.
    #[arg(short, long, global = true, default_value = ".")]
    project: PathBuf,

    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version information.
    Version,

    /// Check whether a user may access a resource defined in a fixture.
    Check {
        /// Path to the TOML fixture.
        fixture: PathBuf,

        /// User to authorize.
        #[arg(short, long)]
        user: String,

        /// Resource to access.
        #[arg(short, long)]
        resource: String,

        /// Number of times to ask (later answers exercise the cache).
        #[arg(short = 'n', long, default_value_t = 1)]
        repeat: u32,

        /// Override the configured negative cache mode.
        #[arg(long, value_enum)]
        negative_cache: Option<NegativeCacheArg>,

        /// Print one JSON decision per line.
        #[arg(long)]
        json: bool,
    },

    /// Configuration commands.
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the effective configuration.
    Show {
        /// Output format.
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum NegativeCacheArg {
    TrustResource,
    VerifyPolicies,
}

impl From<NegativeCacheArg> for NegativeCacheMode {
    fn from(arg: NegativeCacheArg) -> Self {
        match arg {
            NegativeCacheArg::TrustResource => NegativeCacheMode::TrustResource,
            NegativeCacheArg::VerifyPolicies => NegativeCacheMode::VerifyPolicies,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let no_color = cli.no_color || std::env::var_os("NO_COLOR").is_some();
    style::set_no_color(no_color);

    let config = TesseraConfig::load_from_dir(&cli.project)?;

    // Initialize logging; RUST_LOG wins over the configured level
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.logging.level.as_str()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(config.logging.ansi && !no_color)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Version => {
            commands::version::run();
            Ok(())
        }
        Commands::Check {
            fixture,
            user,
            resource,
            repeat,
            negative_cache,
            json,
        } => commands::check::run(
            &config,
            &CheckArgs {
                fixture: &fixture,
                user: &user,
                resource: &resource,
                repeat,
                negative_cache: negative_cache.map(Into::into),
                json,
            },
        ),
        Commands::Config(ConfigCommands::Show { format }) => {
            commands::config::show(&config, &cli.project, format)
        }
    }
}
