// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Analysis parameters passed explicitly into the engine

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::constants::{physiology, thresholds};
use crate::intelligence::zones::{build_zones, ZoneModel};
use crate::intelligence::AnalysisError;
use crate::models::SportType;

/// Everything the engine needs to know about the athlete and the heuristics
///
/// Built once per request (from query parameters, a file, or defaults) and
/// handed to [`crate::intelligence::WeeklyAnalyzer`]. The engine never falls
/// back to the environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub zone_model: ZoneModel,
    /// Explicit max HR; estimated from the week's activities when absent
    pub hr_max: Option<u32>,
    /// Resting HR for Karvonen zones
    pub hr_rest: Option<u32>,
    /// Applied when no max HR is configured or observed
    pub fallback_hr_max: u32,
    /// Estimate max HR from the activities' observed maxima
    pub estimate_hr_max: bool,
    pub compute_decoupling: bool,
    /// Steady-effort sports eligible for decoupling
    pub decoupling_sports: Vec<SportType>,
    pub thresholds: AnalysisThresholds,
}

/// Empirical switches between estimation strategies
///
/// Tunable, not load-bearing: defaults reproduce the historical behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisThresholds {
    pub stream_min_samples: usize,
    pub stream_duration_divisor: u64,
    pub sampling_step_s: u64,
    pub decoupling_min_samples: usize,
}

impl AnalysisConfig {
    /// Load analysis configuration from file or use defaults
    pub fn load(path: Option<String>) -> Result<Self> {
        if let Some(config_path) = path {
            return Self::load_from_file(&config_path);
        }

        if Path::new("analysis_config.toml").exists() {
            return Self::load_from_file("analysis_config.toml");
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read analysis config file: {}", path))?;

        let config: AnalysisConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse analysis config file: {}", path))?;

        config.validate()?;
        Ok(config)
    }

    pub fn with_zone_model(mut self, zone_model: ZoneModel) -> Self {
        self.zone_model = zone_model;
        self
    }

    /// Override max HR; `None` or zero keeps the configured value
    pub fn with_hr_max(mut self, hr_max: Option<u32>) -> Self {
        if let Some(hr_max) = hr_max.filter(|hr| *hr > 0) {
            self.hr_max = Some(hr_max);
        }
        self
    }

    /// Configured max HR, with zero read as "not set"
    pub fn explicit_hr_max(&self) -> Option<u32> {
        self.hr_max.filter(|hr| *hr > 0)
    }

    /// Override resting HR; `None` keeps the configured value
    pub fn with_hr_rest(mut self, hr_rest: Option<u32>) -> Self {
        if hr_rest.is_some() {
            self.hr_rest = hr_rest;
        }
        self
    }

    pub fn with_decoupling(mut self, enabled: bool) -> Self {
        self.compute_decoupling = enabled;
        self
    }

    pub fn hr_rest_or_default(&self) -> u32 {
        self.hr_rest.unwrap_or(physiology::DEFAULT_HR_REST)
    }

    pub fn applies_decoupling(&self, sport: SportType) -> bool {
        self.compute_decoupling && self.decoupling_sports.contains(&sport)
    }

    /// Reject configurations the engine could not honor
    ///
    /// Explicit and fallback max HR must both yield a valid zone model.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.thresholds.stream_duration_divisor == 0 {
            return Err(AnalysisError::InvalidConfig(
                "stream_duration_divisor must be greater than zero".to_string(),
            ));
        }
        if self.thresholds.sampling_step_s == 0 {
            return Err(AnalysisError::InvalidConfig(
                "sampling_step_s must be greater than zero".to_string(),
            ));
        }

        let hr_rest = self.hr_rest_or_default();
        build_zones(self.zone_model, self.fallback_hr_max, hr_rest)?;
        if let Some(hr_max) = self.explicit_hr_max() {
            build_zones(self.zone_model, hr_max, hr_rest)?;
        }
        Ok(())
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            zone_model: ZoneModel::PercentMax,
            hr_max: None,
            hr_rest: None,
            fallback_hr_max: physiology::FALLBACK_HR_MAX,
            estimate_hr_max: true,
            compute_decoupling: true,
            decoupling_sports: vec![
                SportType::Run,
                SportType::VirtualRun,
                SportType::Ride,
                SportType::VirtualRide,
                SportType::GravelRide,
            ],
            thresholds: AnalysisThresholds::default(),
        }
    }
}

impl Default for AnalysisThresholds {
    fn default() -> Self {
        Self {
            stream_min_samples: thresholds::STREAM_MIN_SAMPLES,
            stream_duration_divisor: thresholds::STREAM_DURATION_DIVISOR,
            sampling_step_s: thresholds::SAMPLING_STEP_S,
            decoupling_min_samples: thresholds::DECOUPLING_MIN_SAMPLES,
        }
    }
}
