// src/config.rs

use anyhow::{Context, Result};
use serde::Deserialize;
use std::{fs, path::Path, time::Duration};

use crate::fetch::DEFAULT_BASE_URL;
use crate::load::{columns::VinColumnMatcher, LoadOptions};
use crate::write::WriterOptions;

/// Runtime settings for one pipeline run. Every field has a default, so an
/// empty (or absent) YAML file yields the stock behaviour.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub decoder: DecoderConfig,
    pub input: InputConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Lookup endpoint; the VIN is appended as the final path segment.
    pub base_url: String,
    pub timeout_secs: u64,
    /// Skip TLS certificate verification. Needed behind intercepting proxies.
    pub accept_invalid_certs: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 30,
            accept_invalid_certs: false,
        }
    }
}

impl DecoderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Sheet used when the workbook has more than one.
    pub preferred_sheet: String,
    /// 0-based row holding the column headers.
    pub header_row: u32,
    /// Exact VIN header name, tried before the substring rule.
    pub vin_column: Option<String>,
    pub vin_substring: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            preferred_sheet: "Vehicle & Asset List".to_string(),
            header_row: 3,
            vin_column: None,
            vin_substring: "vin".to_string(),
        }
    }
}

impl InputConfig {
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            preferred_sheet: self.preferred_sheet.clone(),
            header_row: self.header_row,
        }
    }

    pub fn vin_matcher(&self) -> VinColumnMatcher {
        VinColumnMatcher::new(self.vin_column.clone(), &self.vin_substring)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub sheet_name: String,
    /// Appended to the input file stem to name the output.
    pub file_suffix: String,
    pub column_padding: f64,
    /// Fixed width for the `Error Test` column; `None` auto-sizes it.
    pub diagnostic_width: Option<f64>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            sheet_name: "Vehicle Data".to_string(),
            file_suffix: "_VIN_data.xlsx".to_string(),
            column_padding: 2.0,
            diagnostic_width: Some(12.0),
        }
    }
}

impl OutputConfig {
    pub fn writer_options(&self) -> WriterOptions {
        WriterOptions {
            sheet_name: self.sheet_name.clone(),
            column_padding: self.column_padding,
            diagnostic_width: self.diagnostic_width,
        }
    }
}

impl Config {
    /// Read settings from a YAML file, or fall back to defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::from_yaml(&text).with_context(|| format!("parsing config file {}", path.display()))
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }
}
