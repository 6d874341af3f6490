// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Data Models
//!
//! Activity records as delivered by the provider, their normalized form, and the
//! optional per-second streams that go with them.
//!
//! ## Core Models
//!
//! - [`RawActivity`]: a provider record, deserialized leniently (nulls and
//!   non-numeric values become absent instead of failing the whole payload)
//! - [`ActivityBrief`]: the canonical, unit-converted view of one activity
//! - [`ActivityStreams`]: heart-rate and smoothed-speed series for one activity
//! - [`SportType`]: the fixed set of sport tags plus `Other`
//! - [`TypeFilter`]: the `types` request parameter

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;

/// Raw activity record as returned by `/athlete/activities`
///
/// Every field is optional. Numeric fields accept numbers or numeric strings;
/// anything else reads as absent.
///
/// # Examples
///
/// ```rust
/// use coach_triathlon::models::RawActivity;
///
/// let raw: RawActivity = serde_json::from_str(r#"{
///     "id": 42,
///     "type": "Run",
///     "distance": "10000",
///     "moving_time": 3000,
///     "average_heartrate": null,
///     "trainer": false
/// }"#).unwrap();
///
/// assert_eq!(raw.distance, Some(10000.0));
/// assert_eq!(raw.average_heartrate, None);
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawActivity {
    #[serde(default, deserialize_with = "lenient::id")]
    pub id: Option<u64>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub name: Option<String>,
    #[serde(rename = "type", default, deserialize_with = "lenient::text")]
    pub activity_type: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub start_date_local: Option<String>,
    /// Meters
    #[serde(default, deserialize_with = "lenient::number")]
    pub distance: Option<f64>,
    /// Seconds
    #[serde(default, deserialize_with = "lenient::number")]
    pub moving_time: Option<f64>,
    /// Seconds
    #[serde(default, deserialize_with = "lenient::number")]
    pub elapsed_time: Option<f64>,
    /// Meters
    #[serde(default, deserialize_with = "lenient::number")]
    pub total_elevation_gain: Option<f64>,
    /// Meters per second
    #[serde(default, deserialize_with = "lenient::number")]
    pub average_speed: Option<f64>,
    /// Meters per second
    #[serde(default, deserialize_with = "lenient::number")]
    pub max_speed: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub average_heartrate: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub max_heartrate: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub suffer_score: Option<f64>,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub trainer: bool,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub commute: bool,
}

impl RawActivity {
    /// Provider sport tag, `"Other"` when missing
    pub fn type_tag(&self) -> &str {
        self.activity_type.as_deref().unwrap_or("Other")
    }
}

/// Canonical view of one activity
///
/// Distances are in kilometers (2 decimals), durations in whole seconds,
/// speeds in km/h (1 decimal) and elevation in meters (1 decimal).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityBrief {
    pub id: Option<u64>,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub sport_type: SportType,
    /// Local start timestamp, ISO 8601 as sent by the provider
    pub start_date_local: Option<String>,
    pub distance_km: f64,
    pub moving_time_s: u64,
    pub elapsed_time_s: u64,
    pub elev_gain_m: f64,
    pub avg_speed_kmh: Option<f64>,
    pub max_speed_kmh: Option<f64>,
    pub avg_heartrate: Option<f64>,
    pub max_heartrate: Option<f64>,
    pub suffer_score: Option<f64>,
    pub trainer: bool,
    pub commute: bool,
}

const METERS_PER_KM: f64 = 1000.0;
const MPS_TO_KMH: f64 = 3.6;

impl ActivityBrief {
    /// Normalize a raw provider record
    ///
    /// Missing elapsed time defaults to the moving time. Negative numbers are
    /// treated as zero.
    pub fn from_raw(raw: &RawActivity) -> Self {
        let moving_time_s = whole_seconds(raw.moving_time);
        let elapsed_time_s = raw
            .elapsed_time
            .map(|s| whole_seconds(Some(s)))
            .unwrap_or(moving_time_s);

        Self {
            id: raw.id,
            name: raw.name.clone(),
            sport_type: SportType::from_tag(raw.type_tag()),
            start_date_local: raw.start_date_local.clone(),
            distance_km: round_to(raw.distance.unwrap_or(0.0).max(0.0) / METERS_PER_KM, 2),
            moving_time_s,
            elapsed_time_s,
            elev_gain_m: round_to(raw.total_elevation_gain.unwrap_or(0.0), 1),
            avg_speed_kmh: raw.average_speed.map(|v| round_to(v * MPS_TO_KMH, 1)),
            max_speed_kmh: raw.max_speed.map(|v| round_to(v * MPS_TO_KMH, 1)),
            avg_heartrate: raw.average_heartrate,
            max_heartrate: raw.max_heartrate,
            suffer_score: raw.suffer_score,
            trainer: raw.trainer,
            commute: raw.commute,
        }
    }

    /// Calendar date part of the local start timestamp
    pub fn start_day(&self) -> Option<&str> {
        self.start_date_local
            .as_deref()
            .map(|ts| ts.get(..10).unwrap_or(ts))
            .filter(|day| !day.is_empty())
    }
}

fn whole_seconds(value: Option<f64>) -> u64 {
    // truncation toward zero, like the provider's integer fields
    value.filter(|v| *v > 0.0).map(|v| v as u64).unwrap_or(0)
}

/// Round to a fixed number of decimals
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Per-sample activity streams
///
/// One sample per implicit time step. Heart rate may contain gaps (`null`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityStreams {
    #[serde(default)]
    pub heartrate: Option<Vec<Option<f64>>>,
    /// Meters per second
    #[serde(default)]
    pub velocity_smooth: Option<Vec<Option<f64>>>,
}

impl ActivityStreams {
    pub fn is_empty(&self) -> bool {
        self.heartrate.as_ref().map_or(true, Vec::is_empty)
            && self.velocity_smooth.as_ref().map_or(true, Vec::is_empty)
    }
}

/// One activity handed to the analysis engine
#[derive(Debug, Clone)]
pub struct SessionInput {
    pub brief: ActivityBrief,
    pub streams: Option<ActivityStreams>,
}

impl SessionInput {
    pub fn new(brief: ActivityBrief) -> Self {
        Self { brief, streams: None }
    }

    pub fn with_streams(mut self, streams: ActivityStreams) -> Self {
        self.streams = Some(streams);
        self
    }

    pub fn heart_rate(&self) -> Option<&[Option<f64>]> {
        self.streams.as_ref()?.heartrate.as_deref()
    }

    pub fn speed(&self) -> Option<&[Option<f64>]> {
        self.streams.as_ref()?.velocity_smooth.as_deref()
    }
}

/// Sport types recognized by the analysis
///
/// Serialized with the provider's tag (`"Run"`, `"VirtualRide"`, ...).
/// Tags outside the set collapse into [`SportType::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SportType {
    Ride,
    Run,
    Swim,
    VirtualRide,
    VirtualRun,
    Hike,
    Walk,
    WeightTraining,
    Workout,
    Rowing,
    Canoeing,
    EBikeRide,
    GravelRide,
    Crossfit,
    Yoga,
    Elliptical,
    AlpineSki,
    NordicSki,
    Snowboard,
    InlineSkate,
    Other,
}

impl SportType {
    /// Every named type, in the order the provider documents them
    pub const KNOWN: [SportType; 20] = [
        SportType::Ride,
        SportType::Run,
        SportType::Swim,
        SportType::VirtualRide,
        SportType::VirtualRun,
        SportType::Hike,
        SportType::Walk,
        SportType::WeightTraining,
        SportType::Workout,
        SportType::Rowing,
        SportType::Canoeing,
        SportType::EBikeRide,
        SportType::GravelRide,
        SportType::Crossfit,
        SportType::Yoga,
        SportType::Elliptical,
        SportType::AlpineSki,
        SportType::NordicSki,
        SportType::Snowboard,
        SportType::InlineSkate,
    ];

    pub fn from_tag(tag: &str) -> Self {
        Self::KNOWN
            .iter()
            .copied()
            .find(|sport| sport.as_str() == tag)
            .unwrap_or(SportType::Other)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SportType::Ride => "Ride",
            SportType::Run => "Run",
            SportType::Swim => "Swim",
            SportType::VirtualRide => "VirtualRide",
            SportType::VirtualRun => "VirtualRun",
            SportType::Hike => "Hike",
            SportType::Walk => "Walk",
            SportType::WeightTraining => "WeightTraining",
            SportType::Workout => "Workout",
            SportType::Rowing => "Rowing",
            SportType::Canoeing => "Canoeing",
            SportType::EBikeRide => "EBikeRide",
            SportType::GravelRide => "GravelRide",
            SportType::Crossfit => "Crossfit",
            SportType::Yoga => "Yoga",
            SportType::Elliptical => "Elliptical",
            SportType::AlpineSki => "AlpineSki",
            SportType::NordicSki => "NordicSki",
            SportType::Snowboard => "Snowboard",
            SportType::InlineSkate => "InlineSkate",
            SportType::Other => "Other",
        }
    }
}

impl fmt::Display for SportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for SportType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for SportType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        Ok(SportType::from_tag(&tag))
    }
}

/// Sport-type filter from the `types` request parameter
///
/// Matches raw provider tags, so a CSV may name tags outside [`SportType::KNOWN`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeFilter {
    tags: BTreeSet<String>,
}

impl TypeFilter {
    /// `"all"` or a comma-separated list of provider tags
    pub fn parse(types: &str) -> Self {
        if types.trim().eq_ignore_ascii_case("all") {
            return Self::default();
        }
        let tags: BTreeSet<String> = types
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();
        if tags.is_empty() {
            Self::default()
        } else {
            Self { tags }
        }
    }

    pub fn accepts(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(String::as_str)
    }
}

impl Default for TypeFilter {
    fn default() -> Self {
        Self {
            tags: SportType::KNOWN.iter().map(|s| s.as_str().to_string()).collect(),
        }
    }
}

mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    fn as_number(value: &Value) -> Option<f64> {
        match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
        .filter(|v| v.is_finite())
    }

    pub fn number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        Ok(Option::<Value>::deserialize(d)?.as_ref().and_then(as_number))
    }

    pub fn id<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u64>, D::Error> {
        Ok(match Option::<Value>::deserialize(d)? {
            Some(Value::Number(n)) => n.as_u64(),
            Some(Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        })
    }

    pub fn text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(match Option::<Value>::deserialize(d)? {
            Some(Value::String(s)) => Some(s),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        })
    }

    pub fn flag<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
        Ok(match Option::<Value>::deserialize(d)? {
            Some(Value::Bool(b)) => b,
            Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
            Some(Value::String(s)) => matches!(s.trim(), "true" | "True" | "1"),
            _ => false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_raw() -> RawActivity {
        serde_json::from_value(json!({
            "id": 1001,
            "name": "Morning Run",
            "type": "Run",
            "start_date_local": "2025-03-10T07:15:00Z",
            "distance": 10234.0,
            "moving_time": 3120,
            "total_elevation_gain": 87.36,
            "average_speed": 3.28,
            "max_speed": 4.91,
            "average_heartrate": 148.3,
            "max_heartrate": 171.0,
            "suffer_score": 64,
            "trainer": false,
            "commute": true
        }))
        .unwrap()
    }

    #[test]
    fn test_brief_conversion() {
        let brief = ActivityBrief::from_raw(&sample_raw());

        assert_eq!(brief.id, Some(1001));
        assert_eq!(brief.sport_type, SportType::Run);
        assert_eq!(brief.distance_km, 10.23);
        assert_eq!(brief.moving_time_s, 3120);
        assert_eq!(brief.elapsed_time_s, 3120); // defaults to moving time
        assert_eq!(brief.elev_gain_m, 87.4);
        assert_eq!(brief.avg_speed_kmh, Some(11.8));
        assert_eq!(brief.max_speed_kmh, Some(17.7));
        assert_eq!(brief.avg_heartrate, Some(148.3));
        assert!(brief.commute);
        assert!(!brief.trainer);
        assert_eq!(brief.start_day(), Some("2025-03-10"));
    }

    #[test]
    fn test_malformed_fields_read_as_absent() {
        let raw: RawActivity = serde_json::from_value(json!({
            "type": null,
            "distance": "not a number",
            "moving_time": null,
            "elapsed_time": -5,
            "average_heartrate": {"bpm": 140},
            "max_heartrate": "182",
            "trainer": 1
        }))
        .unwrap();

        let brief = ActivityBrief::from_raw(&raw);
        assert_eq!(brief.sport_type, SportType::Other);
        assert_eq!(brief.distance_km, 0.0);
        assert_eq!(brief.moving_time_s, 0);
        assert_eq!(brief.elapsed_time_s, 0);
        assert_eq!(brief.avg_heartrate, None);
        assert_eq!(brief.max_heartrate, Some(182.0));
        assert!(brief.trainer);
        assert_eq!(brief.start_day(), None);
    }

    #[test]
    fn test_sport_type_tags() {
        assert_eq!(SportType::from_tag("VirtualRide"), SportType::VirtualRide);
        assert_eq!(SportType::from_tag("Kitesurf"), SportType::Other);
        for sport in SportType::KNOWN {
            assert_eq!(SportType::from_tag(sport.as_str()), sport);
        }
        assert_eq!(serde_json::to_value(SportType::EBikeRide).unwrap(), json!("EBikeRide"));
    }

    #[test]
    fn test_type_filter_parsing() {
        let all = TypeFilter::parse(" ALL ");
        assert!(all.accepts("Ride"));
        assert!(all.accepts("InlineSkate"));
        assert!(!all.accepts("Kitesurf"));

        let custom = TypeFilter::parse("Run, Kitesurf,,");
        assert!(custom.accepts("Run"));
        assert!(custom.accepts("Kitesurf"));
        assert!(!custom.accepts("Ride"));

        assert_eq!(TypeFilter::parse(" , "), TypeFilter::default());
    }

    #[test]
    fn test_streams_with_gaps() {
        let streams: ActivityStreams = serde_json::from_value(json!({
            "heartrate": [120, null, 131.5],
        }))
        .unwrap();

        assert_eq!(streams.heartrate, Some(vec![Some(120.0), None, Some(131.5)]));
        assert_eq!(streams.velocity_smooth, None);
        assert!(!streams.is_empty());
        assert!(ActivityStreams::default().is_empty());
    }
}
