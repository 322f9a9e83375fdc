//! Error types for the csvpp command line

use std::path::PathBuf;

use thiserror::Error;

/// Errors loading configuration or turning flags into compile options.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Refusing to read {}: file too large ({size} bytes, max {max})", .path.display())]
    TooLarge { path: PathBuf, size: u64, max: u64 },

    #[error("Failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error(transparent)]
    Options(#[from] csvpp_core::CompileError),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
