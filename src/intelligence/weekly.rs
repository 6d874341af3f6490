// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Weekly aggregation of analyzed sessions
//!
//! Sessions are folded into a private accumulator in input order, then
//! projected into the immutable summary types below.

use serde::Serialize;
use std::collections::BTreeMap;

use super::rounding;
use super::time_in_zones::{TimeInZones, ZoneAttribution};
use super::zones::{HrMaxSource, ResolvedZones, ZoneModel};
use crate::models::{ActivityBrief, SportType};

/// Daily bucket for sessions without a start timestamp
pub const UNKNOWN_DAY: &str = "unknown";

/// One analyzed activity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionAnalysis {
    #[serde(flatten)]
    pub brief: ActivityBrief,
    pub time_in_zones_s: TimeInZones,
    pub time_in_zones_source: ZoneAttribution,
    #[serde(serialize_with = "rounding::one_decimal")]
    pub trimp: f64,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "rounding::opt_two_decimals"
    )]
    pub hr_decoupling_percent: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklySummary {
    pub sessions: usize,
    #[serde(serialize_with = "rounding::two_decimals")]
    pub total_km: f64,
    #[serde(serialize_with = "rounding::two_decimals")]
    pub total_time_h: f64,
    #[serde(serialize_with = "rounding::one_decimal")]
    pub trimp_total: f64,
    pub time_in_zones_s: TimeInZones,
    pub zone_model: ZoneModel,
    pub hrmax_used: u32,
    pub hrmax_source: HrMaxSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hrrest_used: Option<u32>,
}

/// Load distribution and the Foster monotony/strain pair
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecoveryStats {
    /// Calendar date (or `"unknown"`) to summed TRIMP
    #[serde(serialize_with = "rounding::map_one_decimal")]
    pub daily_trimp: BTreeMap<String, f64>,
    #[serde(serialize_with = "rounding::map_one_decimal")]
    pub trimp_by_type: BTreeMap<SportType, f64>,
    /// `None` when the week has no sessions
    #[serde(serialize_with = "rounding::opt_two_decimals")]
    pub monotony: Option<f64>,
    #[serde(serialize_with = "rounding::opt_one_decimal")]
    pub strain: Option<f64>,
}

/// Totals for one sport type
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeTotals {
    pub count: usize,
    #[serde(serialize_with = "rounding::two_decimals")]
    pub total_km: f64,
    #[serde(serialize_with = "rounding::two_decimals")]
    pub total_time_h: f64,
    #[serde(serialize_with = "rounding::one_decimal")]
    pub trimp: f64,
    pub time_in_zones_s: TimeInZones,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeeklyAggregate {
    pub summary: WeeklySummary,
    pub recovery: RecoveryStats,
    pub by_type: BTreeMap<SportType, TypeTotals>,
}

#[derive(Default)]
struct TypeAccumulator {
    count: usize,
    km: f64,
    moving_s: u64,
    trimp: f64,
    zones: TimeInZones,
}

impl TypeAccumulator {
    fn finish(self) -> TypeTotals {
        TypeTotals {
            count: self.count,
            total_km: self.km,
            total_time_h: hours(self.moving_s),
            trimp: self.trimp,
            time_in_zones_s: self.zones,
        }
    }
}

#[derive(Default)]
struct WeekAccumulator {
    sessions: usize,
    km: f64,
    moving_s: u64,
    trimp: f64,
    zones: TimeInZones,
    /// Daily buckets in first-seen order
    daily: Vec<(String, f64)>,
    by_type: BTreeMap<SportType, TypeAccumulator>,
}

impl WeekAccumulator {
    fn push(&mut self, session: &SessionAnalysis) {
        let brief = &session.brief;

        self.sessions += 1;
        self.km += brief.distance_km;
        self.moving_s = self.moving_s.saturating_add(brief.moving_time_s);
        self.trimp += session.trimp;
        self.zones += &session.time_in_zones_s;

        let day = brief.start_day().unwrap_or(UNKNOWN_DAY);
        match self.daily.iter_mut().find(|(bucket, _)| bucket == day) {
            Some((_, load)) => *load += session.trimp,
            None => self.daily.push((day.to_string(), session.trimp)),
        }

        let per_type = self.by_type.entry(brief.sport_type).or_default();
        per_type.count += 1;
        per_type.km += brief.distance_km;
        per_type.moving_s = per_type.moving_s.saturating_add(brief.moving_time_s);
        per_type.trimp += session.trimp;
        per_type.zones += &session.time_in_zones_s;
    }

    fn finish(self, zones: &ResolvedZones) -> WeeklyAggregate {
        let daily_values: Vec<f64> = self.daily.iter().map(|(_, load)| *load).collect();
        let monotony = monotony(&daily_values);
        let strain = monotony.map(|m| self.trimp * m);

        let trimp_by_type = self.by_type.iter().map(|(sport, acc)| (*sport, acc.trimp)).collect();

        WeeklyAggregate {
            summary: WeeklySummary {
                sessions: self.sessions,
                total_km: self.km,
                total_time_h: hours(self.moving_s),
                trimp_total: self.trimp,
                time_in_zones_s: self.zones,
                zone_model: zones.model,
                hrmax_used: zones.hr_max,
                hrmax_source: zones.hr_max_source,
                hrrest_used: zones.hr_rest,
            },
            recovery: RecoveryStats {
                daily_trimp: self.daily.into_iter().collect(),
                trimp_by_type,
                monotony,
                strain,
            },
            by_type: self
                .by_type
                .into_iter()
                .map(|(sport, acc)| (sport, acc.finish()))
                .collect(),
        }
    }
}

fn hours(seconds: u64) -> f64 {
    seconds as f64 / 3600.0
}

/// Fold analyzed sessions into weekly totals
pub fn aggregate(sessions: &[SessionAnalysis], zones: &ResolvedZones) -> WeeklyAggregate {
    let mut acc = WeekAccumulator::default();
    for session in sessions {
        acc.push(session);
    }
    acc.finish(zones)
}

/// Mean daily load over its sample standard deviation
///
/// The deviation is taken as 0 for a single day, and a deviation of 0 is
/// replaced by 1.0. `None` when there are no days. Loads are summed in the
/// order given; [`aggregate`] passes days in the order their first session
/// appears.
pub fn monotony(daily_loads: &[f64]) -> Option<f64> {
    if daily_loads.is_empty() {
        return None;
    }

    let n = daily_loads.len() as f64;
    let mean = daily_loads.iter().sum::<f64>() / n;
    let sd = if daily_loads.len() > 1 {
        let variance = daily_loads.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
        variance.sqrt()
    } else {
        0.0
    };

    let divisor = if sd == 0.0 { 1.0 } else { sd };
    Some(mean / divisor)
}
