//! Configuration file locations.
//!
//! File-backed layers, lowest precedence first: the user file in the XDG
//! config directory, then `tessera.toml` and `tessera.local.toml` in the
//! project directory.

use crate::ConfigError;
use directories::ProjectDirs;
use std::fmt;
use std::path::{Path, PathBuf};

/// A file-backed configuration layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLayer {
    /// Per-user defaults (`~/.config/tessera/config.toml` on Linux).
    User,
    /// Shared project settings, meant to be committed.
    Project,
    /// Machine-local overrides, meant to be gitignored.
    Local,
}

impl ConfigLayer {
    /// Every layer, lowest precedence first.
    pub const ALL: [ConfigLayer; 3] = [ConfigLayer::User, ConfigLayer::Project, ConfigLayer::Local];

    pub fn file_name(self) -> &'static str {
        match self {
            ConfigLayer::User => "config.toml",
            ConfigLayer::Project => "tessera.toml",
            ConfigLayer::Local => "tessera.local.toml",
        }
    }
}

impl fmt::Display for ConfigLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConfigLayer::User => "user",
            ConfigLayer::Project => "project",
            ConfigLayer::Local => "local",
        };
        f.write_str(s)
    }
}

/// Resolves configuration files for one project directory.
#[derive(Debug, Clone)]
pub struct Paths {
    project_dir: PathBuf,
    user_config_dir: Option<PathBuf>,
}

impl Paths {
    pub fn new(project_dir: impl AsRef<Path>) -> Self {
        // No reverse-domain qualifier: the directory is plain `tessera`
        // on every platform.
        let user_config_dir =
            ProjectDirs::from("", "", "tessera").map(|dirs| dirs.config_dir().to_path_buf());
        Self {
            project_dir: project_dir.as_ref().to_path_buf(),
            user_config_dir,
        }
    }

    /// Ignores the user layer entirely.
    pub fn without_user_config(mut self) -> Self {
        self.user_config_dir = None;
        self
    }

    pub fn user_config_dir(&self) -> Result<&Path, ConfigError> {
        self.user_config_dir
            .as_deref()
            .ok_or(ConfigError::NoUserConfigDir)
    }

    /// Path of the file backing `layer`, whether or not it exists.
    pub fn file(&self, layer: ConfigLayer) -> Result<PathBuf, ConfigError> {
        let dir = match layer {
            ConfigLayer::User => self.user_config_dir()?,
            ConfigLayer::Project | ConfigLayer::Local => &self.project_dir,
        };
        Ok(dir.join(layer.file_name()))
    }

    /// Layers whose file exists, lowest precedence first.
    pub fn existing(&self) -> Vec<(ConfigLayer, PathBuf)> {
        ConfigLayer::ALL
            .into_iter()
            .filter_map(|layer| {
                self.file(layer)
                    .ok()
                    .filter(|path| path.is_file())
                    .map(|path| (layer, path))
            })
            .collect()
    }
}
