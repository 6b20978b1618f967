// Copyright (c) 2026 cansleuth contributors
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/cansleuth/cansleuth

//! Configuration module

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::detection::ScanParameters;
use crate::export::ExportFormat;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application name
    pub app_name: String,

    /// Application version
    pub version: String,

    /// Data directory (export output lands here by default)
    pub data_dir: PathBuf,

    /// Log level
    pub log_level: String,

    /// Scan configuration
    pub scan: ScanConfig,

    /// Export configuration
    pub export: ExportConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: "cansleuth".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            data_dir: PathBuf::from("./data"),
            log_level: "info".to_string(),
            scan: ScanConfig::default(),
            export: ExportConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Load or create default configuration
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            let config = Self::default();

            // Create parent directories
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            config.save(path)?;
            Ok(config)
        }
    }

    /// Get configuration directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("cansleuth"))
            .unwrap_or_else(|| PathBuf::from("./config"))
    }

    /// Get default configuration path
    pub fn default_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }
}

/// Scan configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Detection span scanned after the baseline window, in seconds
    pub detection_span_sec: f64,

    /// Minimum distinct payloads per identifier (inclusive)
    pub min_unique_values: usize,

    /// Maximum distinct payloads per identifier (inclusive, 0 = unbounded)
    pub max_unique_values: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            detection_span_sec: 3.0,
            min_unique_values: 0,
            max_unique_values: 0,
        }
    }
}

impl ScanConfig {
    /// Scan parameters for a baseline window, taking defaults from this
    /// configuration.
    pub fn parameters(&self, start_sec: f64, end_sec: f64) -> ScanParameters {
        ScanParameters {
            baseline_start_sec: start_sec,
            baseline_end_sec: end_sec,
            detection_span_sec: self.detection_span_sec,
            min_unique_values: self.min_unique_values,
            max_unique_values: self.max_unique_values,
            ..ScanParameters::default()
        }
    }
}

/// Export configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Default export format (json, csv, bin, text)
    pub format: String,

    /// Default export directory
    pub dir: PathBuf,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            format: "csv".to_string(),
            dir: PathBuf::from("./data/exports"),
        }
    }
}

impl ExportConfig {
    /// The configured default export format.
    pub fn default_format(&self) -> Result<ExportFormat> {
        self.format.parse().map_err(anyhow::Error::msg)
    }
}
