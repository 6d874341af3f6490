// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Coach Triathlon
//!
//! Weekly training-load analysis for endurance athletes. Activities for one
//! week are pulled from Strava and turned into heart-rate zone occupancy,
//! Banister TRIMP, Foster monotony and strain, and aerobic decoupling.
//!
//! ## Features
//!
//! - **Zone models**: percent of max HR or Karvonen (HR reserve)
//! - **Time in zone**: per-sample from heart-rate streams, or from the average
//! - **Load**: TRIMP per session, daily and per sport, monotony and strain
//! - **Decoupling**: pace-to-heart-rate drift on steady efforts
//! - **Week selection**: current week, a date, or an ISO week, plus history
//!
//! ## Architecture
//!
//! - **Intelligence**: the pure analysis engine, no I/O
//! - **Providers**: async activity sources with injected credentials
//! - **Service**: fetches a week and runs the engine
//! - **Routes**: warp HTTP endpoints
//! - **Config**: TOML configuration and explicit analysis parameters
//!
//! ## Example Usage
//!
//! ```rust
//! use coach_triathlon::config::AnalysisConfig;
//! use coach_triathlon::intelligence::WeeklyAnalyzer;
//! use coach_triathlon::models::{ActivityBrief, RawActivity, SessionInput};
//!
//! # fn main() -> anyhow::Result<()> {
//! let raw: RawActivity = serde_json::from_str(r#"{
//!     "id": 1, "type": "Run", "start_date_local": "2025-03-10T07:00:00Z",
//!     "distance": 12000, "moving_time": 3600, "average_heartrate": 144
//! }"#)?;
//!
//! let analyzer = WeeklyAnalyzer::new(AnalysisConfig::default().with_hr_max(Some(180)))?;
//! let week = analyzer.analyze(&[SessionInput::new(ActivityBrief::from_raw(&raw))])?;
//!
//! assert_eq!(week.weekly_summary.sessions, 1);
//! assert_eq!(week.weekly_summary.hrmax_used, 180);
//! # Ok(())
//! # }
//! ```

/// Week selection and windows
pub mod calendar;

/// Configuration management
pub mod config;

/// Physiological constants and environment-based values
pub mod constants;

/// Training-load analysis engine
pub mod intelligence;

/// Structured logging
pub mod logging;

/// Activity records and streams
pub mod models;

/// Activity source implementations
pub mod providers;

/// HTTP endpoints
pub mod routes;

/// Request orchestration
pub mod service;
