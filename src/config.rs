// src/config.rs

use crate::constants::{DEFAULT_SLICE_DELIMITER, HELP_FLAG_FULL, HELP_FLAG_SHORT, SLICE_DELIMITER_ENV};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{env, fs, path::Path};

/// Settings shared by every dispatch call of a [`crate::Dispatcher`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Splits one argument into the elements of a slice.
    pub slice_delimiter: String,
    /// chrono format for time values. RFC3339 when unset.
    pub time_format: Option<String>,
    /// Reserved help keys, added to every router that does not use them.
    pub help_flags: Vec<String>,
    /// Drop the first token of `argv` before dispatching.
    pub strip_program_name: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            slice_delimiter: DEFAULT_SLICE_DELIMITER.to_string(),
            time_format: None,
            help_flags: vec![HELP_FLAG_FULL.to_string(), HELP_FLAG_SHORT.to_string()],
            strip_program_name: true,
        }
    }
}

impl DispatchConfig {
    /// Parses TOML text. Missing keys keep their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse dispatch configuration")
    }

    /// Reads a TOML file. Missing keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Invalid config file '{}'", path.display()))
    }

    /// Applies `MAINLINE_SLICE_DELIMITER` when it is set and not empty.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(delimiter) = env::var(SLICE_DELIMITER_ENV) {
            if !delimiter.is_empty() {
                log::debug!("Slice delimiter overridden from environment: '{}'", delimiter);
                self.slice_delimiter = delimiter;
            }
        }
        self
    }
}
