// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Constants Module
//!
//! Physiological model constants, default thresholds and environment-based
//! configuration values. Nothing in `physiology` or `thresholds` reads the
//! environment; only `env_config` does.

/// Heart-rate and load model constants
pub mod physiology {
    /// Zone boundaries as fractions of max HR (or of HR reserve for Karvonen)
    pub const ZONE_FRACTIONS: [f64; 4] = [0.60, 0.70, 0.80, 0.90];

    /// Max HR applied when neither an explicit nor an observed value exists
    pub const FALLBACK_HR_MAX: u32 = 190;

    /// Resting HR assumed for Karvonen zones when none is supplied
    pub const DEFAULT_HR_REST: u32 = 60;

    /// Banister weighting factor
    pub const TRIMP_WEIGHTING: f64 = 0.64;

    /// Banister exponent (unisex form)
    pub const TRIMP_EXPONENT: f64 = 1.92;

    /// Upper clamp for the avg/max heart-rate ratio
    pub const TRIMP_RATIO_CEILING: f64 = 1.2;
}

/// Empirical thresholds; defaults for `AnalysisThresholds`
pub mod thresholds {
    /// A heart-rate stream shorter than this is never trusted
    pub const STREAM_MIN_SAMPLES: usize = 10;

    /// Stream must hold at least `duration_s / STREAM_DURATION_DIVISOR` samples
    pub const STREAM_DURATION_DIVISOR: u64 = 6;

    /// Seconds credited per stream sample
    pub const SAMPLING_STEP_S: u64 = 1;

    /// Minimum paired samples for a decoupling estimate
    pub const DECOUPLING_MIN_SAMPLES: usize = 60;
}

/// Request parameter limits
pub mod limits {
    /// Activities requested per provider page
    pub const ACTIVITIES_PER_PAGE: u32 = 100;

    pub const DEFAULT_MAX_POINTS: usize = 1500;
    pub const MIN_MAX_POINTS: usize = 100;
    pub const MAX_MAX_POINTS: usize = 10_000;

    pub const DEFAULT_HISTORY_WEEKS: u32 = 8;
    pub const MAX_HISTORY_WEEKS: u32 = 26;

    pub const REQUEST_TIMEOUT_SECS: u64 = 30;
}

/// API endpoints
pub mod endpoints {
    pub const STRAVA_API_BASE: &str = "https://www.strava.com/api/v3";
}

/// Environment-based configuration
pub mod env_config {
    use std::env;

    /// Get HTTP server port from environment or default
    pub fn http_port() -> u16 {
        env::var("HTTP_PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse()
            .unwrap_or(8000)
    }

    /// Get Strava API base URL from environment or default
    pub fn strava_api_base() -> String {
        env::var("STRAVA_API_BASE").unwrap_or_else(|_| super::endpoints::STRAVA_API_BASE.to_string())
    }

    /// Server-side access token used when a request carries none
    pub fn access_token() -> Option<String> {
        env::var("ACCESS_TOKEN").ok().filter(|t| !t.is_empty())
    }

    /// Get log level from environment or default
    pub fn log_level() -> String {
        env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string())
    }
}
