use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fs;
use std::path::{Path, PathBuf};

use crate::xml::xhtml::XHTML_URI;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and merging command line overrides.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    /// Language tag selecting the segmentation rules
    #[serde(default = "default_language")]
    pub language: String,

    /// SRX document replacing the embedded rules
    #[serde(default)]
    pub srx_file: Option<PathBuf>,

    /// Namespace whose metadata applies to elements without a namespace
    /// `null` uses the permissive default schema
    #[serde(default = "default_bare_namespace")]
    pub bare_namespace: Option<String>,

    /// File extensions collected when an input is a directory
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Files processed in parallel
    #[serde(default = "default_max_concurrent_files")]
    pub max_concurrent_files: usize,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    // @returns: Matching filter for the log facade
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            _ => Err(anyhow!("Invalid log level: {}", s)),
        }
    }
}

fn default_language() -> String {
    "en".to_string()
}

fn default_bare_namespace() -> Option<String> {
    Some(XHTML_URI.to_string())
}

fn default_extensions() -> Vec<String> {
    ["html", "xhtml", "htm", "xml"]
        .iter()
        .map(|ext| ext.to_string())
        .collect()
}

fn default_max_concurrent_files() -> usize {
    4
}

impl Config {
    /// Load the configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Load the configuration, falling back to defaults when the file is missing
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().is_file() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if self.language.trim().is_empty() {
            return Err(anyhow!("Language tag must not be empty"));
        }
        crate::language_utils::normalize_language_tag(&self.language)
            .with_context(|| format!("Invalid language tag: {}", self.language))?;

        if self.max_concurrent_files == 0 {
            return Err(anyhow!("max_concurrent_files must be at least 1"));
        }

        if self.extensions.is_empty() {
            return Err(anyhow!("At least one input extension is required"));
        }

        Ok(())
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            language: default_language(),
            srx_file: None,
            bare_namespace: default_bare_namespace(),
            extensions: default_extensions(),
            max_concurrent_files: default_max_concurrent_files(),
            log_level: LogLevel::default(),
        }
    }
}
