//! Config file loading and merging with command-line flags.
//!
//! The config file is TOML:
//!
//! ```toml
//! offset_rows = 1
//! offset_columns = 0
//! verbose = false
//! backup = true
//! create = false
//!
//! [key_values]
//! rate = "0.2"
//! ```
//!
//! It is read from `--config <path>` or, if that is not given, from
//! `config.toml` in the user config directory. A missing default file is
//! not an error. Command-line flags override file values.

use directories::ProjectDirs;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::cli::Cli;
use crate::error::{ConfigError, Result};
use csvpp_core::{Options, parse_key_values};

const MAX_CONFIG_FILE_BYTES: u64 = 1_048_576; // 1 MiB

#[derive(Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub key_values: Option<BTreeMap<String, String>>,
    pub offset_rows: Option<usize>,
    pub offset_columns: Option<usize>,
    pub verbose: Option<bool>,
    pub backup: Option<bool>,
    pub create: Option<bool>,
}

/// Load the config file named on the command line, else the user default.
pub fn load_config(explicit: Option<&Path>) -> Result<ConfigFile> {
    match explicit {
        Some(path) if !path.exists() => Err(ConfigError::NotFound(path.to_path_buf())),
        Some(path) => read_config(path),
        None => match user_config_path() {
            Some(path) if path.exists() => read_config(&path),
            _ => Ok(ConfigFile::default()),
        },
    }
}

fn read_config(path: &Path) -> Result<ConfigFile> {
    let io_error = |source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    };
    let size = std::fs::metadata(path).map_err(io_error)?.len();
    if size > MAX_CONFIG_FILE_BYTES {
        return Err(ConfigError::TooLarge {
            path: path.to_path_buf(),
            size,
            max: MAX_CONFIG_FILE_BYTES,
        });
    }
    let content = std::fs::read_to_string(path).map_err(io_error)?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn user_config_path() -> Option<PathBuf> {
    let proj = ProjectDirs::from("", "", "csvpp")?;
    let mut path = proj.config_dir().to_path_buf();
    path.push("config.toml");
    Some(path)
}

/// Build compile options from the config file, then apply flags on top.
/// Key values from both are merged, the command line winning per key.
pub fn build_options(cli: &Cli, config: ConfigFile) -> Result<Options> {
    let mut key_values = config.key_values.unwrap_or_default();
    if let Some(raw) = &cli.key_values {
        key_values.extend(parse_key_values(raw)?);
    }

    Ok(Options {
        key_values,
        offset: (
            cli.offset_rows.or(config.offset_rows).unwrap_or(0),
            cli.offset_columns.or(config.offset_columns).unwrap_or(0),
        ),
        backup: cli.backup || config.backup.unwrap_or(false),
        verbose: cli.verbose || config.verbose.unwrap_or(false),
        create_if_not_exists: cli.create || config.create.unwrap_or(false),
        output: cli.output.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn temp_config(name: &str, content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("csvpp_config_{}_{}.toml", name, std::process::id()));
        std::fs::write(&path, content).expect("write temp config");
        path
    }

    #[test]
    fn load_config_reads_all_fields() {
        let path = temp_config(
            "full",
            "offset_rows = 2\nverbose = true\n\n[key_values]\nrate = \"0.5\"\n",
        );
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.offset_rows, Some(2));
        assert_eq!(config.verbose, Some(true));
        assert_eq!(
            config.key_values.unwrap().get("rate").map(String::as_str),
            Some("0.5")
        );
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn load_config_rejects_unknown_fields() {
        let path = temp_config("unknown", "sheet_colour = \"red\"\n");
        assert!(matches!(load_config(Some(&path)), Err(ConfigError::Parse { .. })));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn load_config_rejects_oversized_file() {
        let path = temp_config("large", &"#".repeat(MAX_CONFIG_FILE_BYTES as usize + 1));
        assert!(matches!(load_config(Some(&path)), Err(ConfigError::TooLarge { .. })));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn load_config_requires_explicit_file_to_exist() {
        let path = Path::new("/nonexistent/csvpp/config.toml");
        assert!(matches!(load_config(Some(path)), Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn flags_override_config() {
        let cli = Cli::try_parse_from(["csvpp", "in.csvpp", "-y", "3", "-k", "a=flag,c=3"]).unwrap();
        let config = ConfigFile {
            key_values: Some(BTreeMap::from([
                ("a".to_string(), "file".to_string()),
                ("b".to_string(), "file".to_string()),
            ])),
            offset_rows: Some(1),
            offset_columns: Some(4),
            backup: Some(true),
            ..ConfigFile::default()
        };
        let options = build_options(&cli, config).unwrap();
        assert_eq!(options.offset, (3, 4));
        assert!(options.backup);
        assert!(!options.verbose);
        assert_eq!(options.key_values.get("a").map(String::as_str), Some("flag"));
        assert_eq!(options.key_values.get("b").map(String::as_str), Some("file"));
        assert_eq!(options.key_values.get("c").map(String::as_str), Some("3"));
    }

    #[test]
    fn bad_key_values_are_an_error() {
        let cli = Cli::try_parse_from(["csvpp", "in.csvpp", "-k", "novalue"]).unwrap();
        assert!(matches!(
            build_options(&cli, ConfigFile::default()),
            Err(ConfigError::Options(_))
        ));
    }
}
