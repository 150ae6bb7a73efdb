//! Configuration management for test-server.
//!
//! This module handles loading, merging, and validating configuration from files
//! and CLI arguments. It supports YAML, JSON, and TOML formats.

use crate::cli::{Args, ConfigFormat, LogLevel};
use crate::sampler::{DEFAULT_CPU_WINDOW_SECS, DEFAULT_SAMPLE_INTERVAL_SECS};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use tracing::info;

// Default configuration constants
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Effective server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    // Server configuration
    pub port: Option<u16>,
    pub bind: Option<String>,

    // Sampling
    #[serde(alias = "sample-interval-secs")]
    pub sample_interval_secs: Option<u64>,
    #[serde(alias = "cpu-sample-window-secs")]
    pub cpu_sample_window_secs: Option<u64>,

    // Logging
    #[serde(alias = "log-level")]
    pub log_level: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: Some(DEFAULT_PORT),
            bind: Some(DEFAULT_BIND_ADDR.to_string()),
            sample_interval_secs: Some(DEFAULT_SAMPLE_INTERVAL_SECS),
            cpu_sample_window_secs: Some(DEFAULT_CPU_WINDOW_SECS),
            log_level: Some(DEFAULT_LOG_LEVEL.into()),
        }
    }
}

impl Config {
    /// Socket address string the HTTP server binds to.
    pub fn listen_addr(&self) -> String {
        format!(
            "{}:{}",
            self.bind.as_deref().unwrap_or(DEFAULT_BIND_ADDR),
            self.port.unwrap_or(DEFAULT_PORT)
        )
    }

    /// Parsed log level, `None` if the configured value is unknown.
    pub fn log_level(&self) -> Option<LogLevel> {
        LogLevel::from_str(
            self.log_level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL),
            true,
        )
        .ok()
    }
}

/// Validate effective config (used by --check-config and at startup)
pub fn validate_effective_config(cfg: &Config) -> Result<(), Box<dyn std::error::Error>> {
    if cfg.port == Some(0) {
        return Err("port must be between 1 and 65535".into());
    }

    if let Some(bind) = cfg.bind.as_deref() {
        if bind.parse::<IpAddr>().is_err() {
            return Err(format!("Invalid bind address '{}', expected an IP address", bind).into());
        }
    }

    let interval = cfg
        .sample_interval_secs
        .unwrap_or(DEFAULT_SAMPLE_INTERVAL_SECS);
    let window = cfg.cpu_sample_window_secs.unwrap_or(DEFAULT_CPU_WINDOW_SECS);

    if interval == 0 {
        return Err("sample_interval_secs must be greater than 0".into());
    }
    if window == 0 {
        return Err("cpu_sample_window_secs must be greater than 0".into());
    }
    if window >= interval {
        return Err(format!(
            "cpu_sample_window_secs ({}) must be shorter than sample_interval_secs ({})",
            window, interval
        )
        .into());
    }

    if cfg.log_level().is_none() {
        return Err(format!(
            "Invalid log_level '{}', expected off, error, warn, info, debug or trace",
            cfg.log_level.as_deref().unwrap_or_default()
        )
        .into());
    }

    Ok(())
}

/// Resolves configuration from CLI args, config file, and defaults.
/// This enforces precedence: CLI (if provided) > config file > default.
pub fn resolve_config(args: &Args) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = if args.no_config {
        Config::default()
    } else {
        load_config(args.config.as_deref())?
    };

    // Override with CLI args
    if let Some(bind_ip) = args.bind {
        config.bind = Some(bind_ip.to_string());
    }
    if let Some(cli_port) = args.port {
        config.port = Some(cli_port);
    }
    if let Some(interval) = args.sample_interval {
        config.sample_interval_secs = Some(interval);
    }
    if let Some(window) = args.cpu_window {
        config.cpu_sample_window_secs = Some(window);
    }
    if let Some(level) = args.log_level {
        if let Some(value) = level.to_possible_value() {
            config.log_level = Some(value.get_name().to_string());
        }
    }

    Ok(config)
}

/// Configuration loading with multiple format support.
///
/// An explicit path must exist. Without one the default locations are tried
/// and the built-in defaults are used when none is present.
pub fn load_config(path: Option<&Path>) -> Result<Config, Box<dyn std::error::Error>> {
    let path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(format!("Config file not found: {}", p.display()).into());
            }
            p.to_path_buf()
        }
        None => {
            let defaults = [
                "/etc/test-server/test-server.yaml",
                "/etc/test-server/test-server.yml",
                "/etc/test-server/test-server.json",
                "./test-server.yaml",
                "./test-server.yml",
                "./test-server.json",
            ];

            match defaults.iter().find(|p| Path::new(p).exists()) {
                Some(found) => PathBuf::from(found),
                None => return Ok(Config::default()),
            }
        }
    };

    let content = fs::read_to_string(&path)?;

    // Missing keys fall back to the built-in defaults
    let loaded: Config = match path.extension().and_then(|s| s.to_str()) {
        Some("json") => serde_json::from_str(&content)?,
        Some("toml") => toml::from_str(&content)?,
        _ => serde_yaml::from_str(&content)?,
    };
    info!("Loaded configuration from: {}", path.display());

    Ok(merge_defaults(loaded))
}

fn merge_defaults(loaded: Config) -> Config {
    let defaults = Config::default();
    Config {
        port: loaded.port.or(defaults.port),
        bind: loaded.bind.or(defaults.bind),
        sample_interval_secs: loaded
            .sample_interval_secs
            .or(defaults.sample_interval_secs),
        cpu_sample_window_secs: loaded
            .cpu_sample_window_secs
            .or(defaults.cpu_sample_window_secs),
        log_level: loaded.log_level.or(defaults.log_level),
    }
}

/// Shows configuration in requested format
pub fn show_config(config: &Config, format: ConfigFormat) -> Result<(), Box<dyn std::error::Error>> {
    let output = match format {
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
        ConfigFormat::Toml => toml::to_string_pretty(config)?,
        ConfigFormat::Yaml => serde_yaml::to_string(config)?,
    };

    println!("{output}");
    Ok(())
}
