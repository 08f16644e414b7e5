//! Configuration management

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use shardline_shamir::{Prime, DEFAULT_CHUNK_SIZE, MAX_CHUNK_SIZE};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::CliError;
use crate::formats::OutputFormat;

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub defaults: Defaults,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Defaults {
    #[serde(default = "default_pieces")]
    pub pieces: u32,

    #[serde(default = "default_threshold")]
    pub threshold: u32,

    #[serde(default = "default_prime")]
    pub prime: u32,

    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(default = "default_format")]
    pub format: OutputFormat,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            pieces: default_pieces(),
            threshold: default_threshold(),
            prime: default_prime(),
            chunk_size: default_chunk_size(),
            format: default_format(),
        }
    }
}

fn default_pieces() -> u32 {
    5
}
fn default_threshold() -> u32 {
    3
}
fn default_prime() -> u32 {
    Prime::DEFAULT.value()
}
fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}
fn default_format() -> OutputFormat {
    OutputFormat::Text
}

impl Config {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(config_path) = path {
            Self::load_from_file(config_path)
        } else {
            Self::load_default()
        }
    }

    fn load_default() -> Result<Self> {
        let config_paths = [
            dirs::config_dir().map(|d| d.join("shardline").join("config.toml")),
            Some(PathBuf::from("shardline.toml")),
            Some(PathBuf::from(".shardline.toml")),
        ];

        for config_path in config_paths.into_iter().flatten() {
            if config_path.exists() {
                log::debug!("Loading config from {}", config_path.display());
                return Self::load_from_file(&config_path);
            }
        }

        Ok(Self::default())
    }

    fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Resolves a prime flag against the configured default.
    pub fn prime(&self, flag: Option<u32>) -> Result<Prime, CliError> {
        let value = flag.unwrap_or(self.defaults.prime);
        Prime::new(value).map_err(|e| CliError::Config(e.to_string()))
    }

    /// Chunk size from a flag or the configured default, never zero.
    pub fn chunk_size(&self, flag: Option<usize>) -> Result<usize, CliError> {
        match flag.unwrap_or(self.defaults.chunk_size) {
            0 => Err(CliError::Config("chunk_size must be positive".to_string())),
            size if size > MAX_CHUNK_SIZE => Err(CliError::Config(format!(
                "chunk_size {} exceeds the maximum of {}",
                size, MAX_CHUNK_SIZE
            ))),
            size => Ok(size),
        }
    }
}
