//! Configuration error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no user configuration directory could be determined")]
    NoUserConfigDir,
}
