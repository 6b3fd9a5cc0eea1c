use std::{
    fs,
    path::{Path, PathBuf},
};

use color_eyre::eyre::{WrapErr, eyre};
use cross_table::{csv::Delimiter, emit::OutputFormat, rows::Direction};
use log::debug;
use serde::Deserialize;

/// Read when `--config` is not given, if it exists.
pub const DEFAULT_CONFIG: &str = "cross_table.toml";

/// Optional settings file. Every field can be overridden from the command
/// line.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Sequences in the CSV run solved->scrambled and must be inverted.
    pub invert: Option<bool>,
    pub delimiter: Option<String>,
    pub format: Option<String>,
}

/// Everything a run needs after the file and the flags are merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    pub direction: Direction,
    /// `None` means detect it from the input.
    pub delimiter: Option<Delimiter>,
    pub format: OutputFormat,
}

impl Config {
    /// Loads `path`, or [`DEFAULT_CONFIG`] if it exists when no path is
    /// given.
    pub fn load(path: Option<&Path>) -> color_eyre::Result<Config> {
        let path = match path {
            Some(path) => path.to_owned(),
            None if Path::new(DEFAULT_CONFIG).is_file() => PathBuf::from(DEFAULT_CONFIG),
            None => return Ok(Config::default()),
        };

        let text = fs::read_to_string(&path)
            .wrap_err_with(|| format!("Failed to read configuration file {}", path.display()))?;
        let config = Config::from_toml(&text)
            .wrap_err_with(|| format!("Failed to parse configuration file {}", path.display()))?;
        debug!("Loaded {config:?} from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(text: &str) -> color_eyre::Result<Config> {
        Ok(toml::from_str::<Config>(text)?)
    }

    /// Merges the file with command-line flags, flags winning. The format
    /// falls back to the output extension, then to C++.
    pub fn resolve(
        &self,
        invert: bool,
        delimiter: Option<Delimiter>,
        format: Option<OutputFormat>,
        output: &Path,
    ) -> color_eyre::Result<Settings> {
        let direction = if invert || self.invert.unwrap_or(false) {
            Direction::Inverted
        } else {
            Direction::AsRecorded
        };

        let delimiter = match (delimiter, &self.delimiter) {
            (Some(delimiter), _) => Some(delimiter),
            (None, Some(text)) => Some(text.parse::<Delimiter>()?),
            (None, None) => None,
        };

        let format = match (format, &self.format) {
            (Some(format), _) => format,
            (None, Some(text)) => text.parse::<OutputFormat>().map_err(|e| eyre!(e))?,
            (None, None) => OutputFormat::from_path(output).unwrap_or_default(),
        };

        Ok(Settings {
            direction,
            delimiter,
            format,
        })
    }
}
