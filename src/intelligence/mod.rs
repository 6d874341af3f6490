// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Intelligence Module
//!
//! The training-load analysis engine. Pure, synchronous computation over
//! activities already fetched by a provider.
//!
//! This module includes:
//! - Heart-rate zone models (percent of max, Karvonen)
//! - Time-in-zone attribution from streams or averages
//! - Banister TRIMP
//! - Aerobic decoupling
//! - Weekly aggregation with monotony and strain
//! - Volume overviews and stream previews

pub mod analyzer;
pub mod decoupling;
pub mod overview;
mod rounding;
pub mod time_in_zones;
pub mod trimp;
pub mod weekly;
pub mod zones;

pub use analyzer::{estimate_hr_max, AnalysisError, WeeklyAnalysis, WeeklyAnalyzer};
pub use overview::{
    downsample, summarize_week, DetailedActivity, SportBreakdown, StreamPreview, StreamStats, StreamsMode,
    WeekHistoryEntry, WeeklyDetails, WeeklyStats,
};
pub use time_in_zones::{TimeInZones, ZoneAttribution};
pub use weekly::{aggregate, monotony, RecoveryStats, SessionAnalysis, TypeTotals, WeeklySummary};
pub use zones::{build_zones, HrMaxSource, ResolvedZones, Zone, ZoneDefinition, ZoneError, ZoneModel};
