//! Configuration management commands.

use anyhow::Result;
use clap::ValueEnum;
use std::path::Path;
use tessera_config::{Paths, TesseraConfig};

use crate::style::{print_labeled, print_section, print_spacer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Toml,
    Json,
}

/// Show the effective configuration. The text format also lists the files
/// it was merged from.
pub fn show(config: &TesseraConfig, project_dir: &Path, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(config)?);
        }
        OutputFormat::Toml => {
            println!("{}", toml::to_string_pretty(config)?);
        }
        OutputFormat::Text => {
            print_section("Tessera Configuration");
            print_spacer();

            println!("Engine:");
            print_labeled("Negative cache", config.engine.negative_cache.as_str());
            print_labeled("Audit", &config.engine.audit.to_string());
            print_spacer();

            println!("Store:");
            print_labeled("Clock", &format!("{:?}", config.store.clock).to_lowercase());
            print_spacer();

            println!("Logging:");
            print_labeled("Level", config.logging.level.as_str());
            print_labeled("ANSI", &config.logging.ansi.to_string());
            print_spacer();

            println!("Files:");
            let files = Paths::new(project_dir).existing();
            if files.is_empty() {
                print_labeled("none", "built-in defaults and environment only");
            }
            for (layer, path) in files {
                print_labeled(&layer.to_string(), &path.display().to_string());
            }
        }
    }

    Ok(())
}
