//! Configuration management for Tessera
//!
//! Provides hierarchical configuration loading from multiple sources:
//! 1. CLI arguments (highest precedence)
//! 2. Environment variables (TESSERA_* prefix, `__` between section and key)
//! 3. tessera.local.toml (gitignored, local overrides)
//! 4. tessera.toml (git-tracked, project config)
//! 5. ~/.config/tessera/config.toml (user defaults)
//! 6. Built-in defaults (lowest precedence)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tessera_types::NegativeCacheMode;

mod error;
mod loader;
mod paths;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use paths::{ConfigLayer, Paths};

/// Main Tessera configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TesseraConfig {
    pub engine: EngineConfig,
    pub store: StoreConfig,
    pub logging: LoggingConfig,
}

/// Decision engine behaviour
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// How far a cached denial is trusted before recomputing
    pub negative_cache: NegativeCacheMode,
    /// Log every grant at info and every denial at warn
    pub audit: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            negative_cache: NegativeCacheMode::TrustResource,
            audit: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub clock: ClockKind,
}

/// Which clock stamps `updated_at` and `computed_at` in the in-memory store
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ClockKind {
    /// Strictly increasing counter
    #[default]
    Logical,
    /// Nanoseconds since the Unix epoch, forced monotonic
    Wall,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            ansi: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Off => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TesseraConfig {
    /// Load configuration for a project directory from every source
    pub fn load_from_dir(project_dir: impl AsRef<Path>) -> Result<Self> {
        ConfigLoader::new().with_project_dir(project_dir).load()
    }

    /// Create a development configuration
    pub fn development() -> Self {
        Self {
            engine: EngineConfig {
                negative_cache: NegativeCacheMode::VerifyPolicies,
                audit: true,
            },
            logging: LoggingConfig {
                level: LogLevel::Debug,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Create a production configuration
    pub fn production() -> Self {
        Self {
            engine: EngineConfig {
                negative_cache: NegativeCacheMode::TrustResource,
                audit: true,
            },
            store: StoreConfig {
                clock: ClockKind::Wall,
            },
            logging: LoggingConfig {
                level: LogLevel::Info,
                ansi: false,
            },
        }
    }
}
