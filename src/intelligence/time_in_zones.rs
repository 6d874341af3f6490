// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Time spent in each heart-rate zone

use serde::ser::{Serialize, SerializeMap, Serializer};
use std::ops::AddAssign;

use super::zones::{ZoneDefinition, ZONE_COUNT, ZONE_LABELS};
use crate::config::AnalysisThresholds;

/// Seconds per zone, always carrying all five labels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeInZones {
    seconds: [u64; ZONE_COUNT],
}

impl TimeInZones {
    pub fn from_seconds(seconds: [u64; ZONE_COUNT]) -> Self {
        Self { seconds }
    }

    pub fn seconds(&self) -> &[u64; ZONE_COUNT] {
        &self.seconds
    }

    pub fn get(&self, label: &str) -> Option<u64> {
        ZONE_LABELS
            .iter()
            .position(|l| *l == label)
            .map(|i| self.seconds[i])
    }

    pub fn total(&self) -> u64 {
        self.seconds.iter().fold(0u64, |acc, s| acc.saturating_add(*s))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, u64)> + '_ {
        ZONE_LABELS.iter().copied().zip(self.seconds.iter().copied())
    }
}

impl AddAssign<&TimeInZones> for TimeInZones {
    fn add_assign(&mut self, other: &TimeInZones) {
        for (mine, theirs) in self.seconds.iter_mut().zip(other.seconds.iter()) {
            *mine = mine.saturating_add(*theirs);
        }
    }
}

impl Serialize for TimeInZones {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(ZONE_COUNT))?;
        for (label, seconds) in self.iter() {
            map.serialize_entry(label, &seconds)?;
        }
        map.end()
    }
}

/// Which data the zone attribution was based on
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneAttribution {
    /// Every heart-rate sample classified individually
    Stream,
    /// Whole duration credited to the zone of the average heart rate
    Average,
    /// Nothing to attribute
    Unavailable,
}

/// A stream is trusted when it is long enough relative to the session
pub fn is_credible_stream(samples: usize, duration_s: u64, thresholds: &AnalysisThresholds) -> bool {
    let by_duration = duration_s / thresholds.stream_duration_divisor.max(1);
    let required = (thresholds.stream_min_samples as u64).max(by_duration);
    samples as u64 >= required
}

fn usable_average(avg_hr: Option<f64>) -> Option<f64> {
    avg_hr.filter(|hr| hr.is_finite() && *hr > 0.0)
}

/// Pick the attribution strategy for one session
pub fn attribution(
    duration_s: u64,
    avg_hr: Option<f64>,
    hr_stream: Option<&[Option<f64>]>,
    thresholds: &AnalysisThresholds,
) -> ZoneAttribution {
    match hr_stream {
        Some(stream) if !stream.is_empty() && is_credible_stream(stream.len(), duration_s, thresholds) => {
            ZoneAttribution::Stream
        }
        _ if usable_average(avg_hr).is_some() && duration_s > 0 => ZoneAttribution::Average,
        _ => ZoneAttribution::Unavailable,
    }
}

/// Attribute a session's duration to heart-rate zones
///
/// A credible stream credits `sampling_step_s` per non-null sample, so the
/// total may differ from `duration_s`. Otherwise the whole duration goes to
/// the zone of the average heart rate, or nothing is attributed at all.
pub fn time_in_zones(
    duration_s: u64,
    avg_hr: Option<f64>,
    hr_stream: Option<&[Option<f64>]>,
    zones: &ZoneDefinition,
    thresholds: &AnalysisThresholds,
) -> TimeInZones {
    match attribution(duration_s, avg_hr, hr_stream, thresholds) {
        ZoneAttribution::Stream => {
            from_stream(hr_stream.unwrap_or_default(), zones, thresholds.sampling_step_s)
        }
        ZoneAttribution::Average => from_average(avg_hr, duration_s, zones),
        ZoneAttribution::Unavailable => TimeInZones::default(),
    }
}

/// Classify every sample; gaps and non-finite values earn no credit
pub fn from_stream(hr_stream: &[Option<f64>], zones: &ZoneDefinition, step_s: u64) -> TimeInZones {
    let mut seconds = [0u64; ZONE_COUNT];
    for bpm in hr_stream.iter().flatten().filter(|bpm| bpm.is_finite()) {
        let slot = &mut seconds[zones.zone_index(*bpm)];
        *slot = slot.saturating_add(step_s);
    }
    TimeInZones::from_seconds(seconds)
}

/// Credit the whole duration to the zone of the (rounded) average
pub fn from_average(avg_hr: Option<f64>, duration_s: u64, zones: &ZoneDefinition) -> TimeInZones {
    let mut seconds = [0u64; ZONE_COUNT];
    if let Some(avg) = usable_average(avg_hr) {
        if duration_s > 0 {
            seconds[zones.zone_index(avg.round_ties_even())] = duration_s;
        }
    }
    TimeInZones::from_seconds(seconds)
}
