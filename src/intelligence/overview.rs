// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Volume summaries and stream previews
//!
//! Lighter views than [`super::WeeklyAnalysis`]: weekly totals, per-sport
//! breakdowns, downsampled streams and compact history entries.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::analyzer::WeeklyAnalysis;
use super::rounding;
use super::time_in_zones::TimeInZones;
use super::weekly::SessionAnalysis;
use super::zones::{HrMaxSource, ZoneDefinition};
use crate::models::{ActivityBrief, ActivityStreams, SessionInput, SportType};

const MPS_TO_KMH: f64 = 3.6;

/// Weekly volume totals
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyStats {
    #[serde(serialize_with = "rounding::two_decimals")]
    pub total_km: f64,
    #[serde(serialize_with = "rounding::two_decimals")]
    pub total_time_h: f64,
    pub sessions: usize,
    pub counts_by_type: BTreeMap<SportType, usize>,
}

/// Sum distance, moving time and per-type counts
pub fn summarize_week(briefs: &[ActivityBrief]) -> WeeklyStats {
    let mut total_km = 0.0;
    let mut moving_s = 0u64;
    let mut counts_by_type = BTreeMap::new();

    for brief in briefs {
        total_km += brief.distance_km;
        moving_s = moving_s.saturating_add(brief.moving_time_s);
        *counts_by_type.entry(brief.sport_type).or_insert(0) += 1;
    }

    WeeklyStats {
        total_km,
        total_time_h: moving_s as f64 / 3600.0,
        sessions: briefs.len(),
        counts_by_type,
    }
}

/// Volume and heart-rate overview for one sport
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SportBreakdown {
    pub count: usize,
    #[serde(serialize_with = "rounding::two_decimals")]
    pub total_km: f64,
    #[serde(serialize_with = "rounding::one_decimal")]
    pub elev_gain_m: f64,
    #[serde(serialize_with = "rounding::two_decimals")]
    pub total_time_h: f64,
    /// Mean of the known session averages
    #[serde(serialize_with = "rounding::opt_one_decimal")]
    pub avg_hr: Option<f64>,
    pub max_hr: Option<f64>,
}

impl SportBreakdown {
    pub fn from_briefs(briefs: &[ActivityBrief]) -> BTreeMap<SportType, SportBreakdown> {
        #[derive(Default)]
        struct Acc {
            count: usize,
            km: f64,
            elev: f64,
            moving_s: u64,
            hr_sum: f64,
            hr_n: usize,
            max_hr: Option<f64>,
        }

        let mut groups: BTreeMap<SportType, Acc> = BTreeMap::new();
        for brief in briefs {
            let acc = groups.entry(brief.sport_type).or_default();
            acc.count += 1;
            acc.km += brief.distance_km;
            acc.elev += brief.elev_gain_m;
            acc.moving_s = acc.moving_s.saturating_add(brief.moving_time_s);
            if let Some(avg) = brief.avg_heartrate {
                acc.hr_sum += avg;
                acc.hr_n += 1;
            }
            if let Some(max) = brief.max_heartrate {
                acc.max_hr = Some(acc.max_hr.map_or(max, |m| m.max(max)));
            }
        }

        groups
            .into_iter()
            .map(|(sport, acc)| {
                let breakdown = SportBreakdown {
                    count: acc.count,
                    total_km: acc.km,
                    elev_gain_m: acc.elev,
                    total_time_h: acc.moving_s as f64 / 3600.0,
                    avg_hr: (acc.hr_n > 0).then(|| acc.hr_sum / acc.hr_n as f64),
                    max_hr: acc.max_hr,
                };
                (sport, breakdown)
            })
            .collect()
    }
}

/// How much stream data a details response carries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StreamsMode {
    /// No streams fetched
    #[default]
    None,
    /// Streams fetched for analysis, only their stats returned
    Summary,
    /// Downsampled series returned alongside their stats
    Full,
}

impl StreamsMode {
    pub fn fetches_streams(&self) -> bool {
        !matches!(self, StreamsMode::None)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StreamsMode::None => "none",
            StreamsMode::Summary => "summary",
            StreamsMode::Full => "full",
        }
    }
}

impl fmt::Display for StreamsMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown streams mode '{0}', expected 'none', 'summary' or 'full'")]
pub struct UnknownStreamsMode(pub String);

impl FromStr for StreamsMode {
    type Err = UnknownStreamsMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(StreamsMode::None),
            "summary" => Ok(StreamsMode::Summary),
            "full" => Ok(StreamsMode::Full),
            _ => Err(UnknownStreamsMode(s.to_string())),
        }
    }
}

/// Keep at most `max_points` samples by fixed stride
pub fn downsample<T: Clone>(series: &[T], max_points: usize) -> Vec<T> {
    if max_points == 0 {
        return Vec::new();
    }
    if series.len() <= max_points {
        return series.to_vec();
    }
    let stride = series.len().div_ceil(max_points);
    series.iter().step_by(stride).cloned().collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamStats {
    pub samples: usize,
    #[serde(serialize_with = "rounding::opt_one_decimal")]
    pub hr_avg: Option<f64>,
    pub hr_max: Option<f64>,
    #[serde(serialize_with = "rounding::opt_one_decimal")]
    pub speed_avg_kmh: Option<f64>,
}

impl StreamStats {
    pub fn from_streams(streams: &ActivityStreams) -> Self {
        let hr = streams.heartrate.as_deref().unwrap_or_default();
        let speed = streams.velocity_smooth.as_deref().unwrap_or_default();

        let hr_values: Vec<f64> = finite(hr).collect();
        let speed_values: Vec<f64> = finite(speed).collect();

        Self {
            samples: hr.len().max(speed.len()),
            hr_avg: mean(&hr_values),
            hr_max: hr_values.iter().copied().reduce(f64::max),
            speed_avg_kmh: mean(&speed_values).map(|v| v * MPS_TO_KMH),
        }
    }
}

fn finite(series: &[Option<f64>]) -> impl Iterator<Item = f64> + '_ {
    series.iter().flatten().copied().filter(|v| v.is_finite())
}

fn mean(values: &[f64]) -> Option<f64> {
    (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64)
}

/// Downsampled series for the `full` streams mode
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamPreview {
    pub heartrate: Option<Vec<Option<f64>>>,
    pub velocity_smooth_mps: Option<Vec<Option<f64>>>,
    pub velocity_smooth_kmh: Option<Vec<Option<f64>>>,
}

impl StreamPreview {
    pub fn from_streams(streams: &ActivityStreams, max_points: usize) -> Self {
        let speed = streams
            .velocity_smooth
            .as_deref()
            .map(|series| downsample(series, max_points));

        Self {
            heartrate: streams.heartrate.as_deref().map(|series| downsample(series, max_points)),
            velocity_smooth_kmh: speed.as_ref().map(|series| {
                series
                    .iter()
                    .map(|v| v.map(|mps| crate::models::round_to(mps * MPS_TO_KMH, 2)))
                    .collect()
            }),
            velocity_smooth_mps: speed,
        }
    }
}

/// One activity in a details response
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailedActivity {
    #[serde(flatten)]
    pub analysis: SessionAnalysis,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_stats: Option<StreamStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub streams: Option<StreamPreview>,
}

/// Per-activity listing with volume breakdowns
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyDetails {
    pub summary: WeeklyStats,
    pub by_sport: BTreeMap<SportType, SportBreakdown>,
    pub activities: Vec<DetailedActivity>,
    pub hrmax_used: u32,
    pub hrmax_source: HrMaxSource,
    pub zones_definition: ZoneDefinition,
}

impl WeeklyDetails {
    /// Attach stream previews to an analysis of the same inputs
    ///
    /// `inputs` and `analysis.sessions` must be in the same order.
    pub fn build(analysis: WeeklyAnalysis, inputs: &[SessionInput], mode: StreamsMode, max_points: usize) -> Self {
        let briefs: Vec<ActivityBrief> = inputs.iter().map(|input| input.brief.clone()).collect();

        let activities = analysis
            .sessions
            .into_iter()
            .zip(inputs)
            .map(|(session, input)| {
                let streams = input.streams.as_ref().filter(|s| !s.is_empty());
                let (stream_stats, preview) = match (mode, streams) {
                    (StreamsMode::None, _) | (_, None) => (None, None),
                    (StreamsMode::Summary, Some(s)) => (Some(StreamStats::from_streams(s)), None),
                    (StreamsMode::Full, Some(s)) => (
                        Some(StreamStats::from_streams(s)),
                        Some(StreamPreview::from_streams(s, max_points)),
                    ),
                };
                DetailedActivity {
                    analysis: session,
                    stream_stats,
                    streams: preview,
                }
            })
            .collect();

        Self {
            summary: summarize_week(&briefs),
            by_sport: SportBreakdown::from_briefs(&briefs),
            activities,
            hrmax_used: analysis.weekly_summary.hrmax_used,
            hrmax_source: analysis.weekly_summary.hrmax_source,
            zones_definition: analysis.zones_definition,
        }
    }
}

/// Compact record for one week of history
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekHistoryEntry {
    pub sessions: usize,
    #[serde(serialize_with = "rounding::two_decimals")]
    pub total_km: f64,
    #[serde(serialize_with = "rounding::two_decimals")]
    pub total_time_h: f64,
    #[serde(serialize_with = "rounding::one_decimal")]
    pub trimp_total: f64,
    pub time_in_zones_s: TimeInZones,
    #[serde(serialize_with = "rounding::opt_two_decimals")]
    pub monotony: Option<f64>,
    #[serde(serialize_with = "rounding::opt_one_decimal")]
    pub strain: Option<f64>,
    pub hrmax_used: u32,
    pub counts_by_type: BTreeMap<SportType, usize>,
}

impl WeekHistoryEntry {
    pub fn from_analysis(analysis: &WeeklyAnalysis) -> Self {
        let summary = &analysis.weekly_summary;
        Self {
            sessions: summary.sessions,
            total_km: summary.total_km,
            total_time_h: summary.total_time_h,
            trimp_total: summary.trimp_total,
            time_in_zones_s: summary.time_in_zones_s,
            monotony: analysis.recovery.monotony,
            strain: analysis.recovery.strain,
            hrmax_used: summary.hrmax_used,
            counts_by_type: analysis
                .by_type
                .iter()
                .map(|(sport, totals)| (*sport, totals.count))
                .collect(),
        }
    }
}
