// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Configuration management for the weekly analysis service

pub mod analysis_config;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::constants::{endpoints, env_config, limits};

pub use analysis_config::{AnalysisConfig, AnalysisThresholds};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub strava: StravaConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StravaConfig {
    pub api_base: String,
    /// Used when a request does not carry its own token
    pub access_token: Option<String>,
    pub per_page: u32,
    pub request_timeout_secs: u64,
}

impl Default for StravaConfig {
    fn default() -> Self {
        Self {
            api_base: endpoints::STRAVA_API_BASE.to_string(),
            access_token: None,
            per_page: limits::ACTIVITIES_PER_PAGE,
            request_timeout_secs: limits::REQUEST_TIMEOUT_SECS,
        }
    }
}

impl Config {
    /// Load from an explicit path, the user config directory, or the environment
    pub fn load(path: Option<String>) -> Result<Self> {
        let config_path = path.unwrap_or_else(|| {
            dirs::config_dir()
                .map(|p| p.join("coach-triathlon/config.toml"))
                .unwrap_or_else(|| "config.toml".into())
                .to_string_lossy()
                .to_string()
        });

        if Path::new(&config_path).exists() {
            let content = fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config file: {}", config_path))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", config_path))?;
            config
                .analysis
                .validate()
                .with_context(|| format!("Invalid analysis section in config file: {}", config_path))?;
            return Ok(config);
        }

        dotenv::dotenv().ok();
        Ok(Self::from_env())
    }

    /// Defaults overridden by `HTTP_PORT`, `STRAVA_API_BASE` and `ACCESS_TOKEN`
    pub fn from_env() -> Self {
        Config {
            server: ServerConfig {
                port: env_config::http_port(),
                ..ServerConfig::default()
            },
            strava: StravaConfig {
                api_base: env_config::strava_api_base(),
                access_token: env_config::access_token(),
                ..StravaConfig::default()
            },
            analysis: AnalysisConfig::default(),
        }
    }
}
