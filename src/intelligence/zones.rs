// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Heart-rate zone model
//!
//! Five zones split at 60/70/80/90 % of either max HR (`percent_max`) or the
//! heart-rate reserve above resting HR (`karvonen`). Lower bounds are
//! inclusive, upper bounds exclusive, and Z5 is open-ended.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::constants::physiology::ZONE_FRACTIONS;

pub const ZONE_COUNT: usize = 5;
pub const ZONE_LABELS: [&str; ZONE_COUNT] = ["Z1", "Z2", "Z3", "Z4", "Z5"];

/// How zone boundaries are derived
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneModel {
    /// `floor(fraction * hr_max)`
    #[default]
    PercentMax,
    /// `round(hr_rest + fraction * (hr_max - hr_rest))`
    Karvonen,
}

impl ZoneModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ZoneModel::PercentMax => "percent_max",
            ZoneModel::Karvonen => "karvonen",
        }
    }
}

impl fmt::Display for ZoneModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ZoneModel {
    type Err = ZoneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "percent_max" => Ok(ZoneModel::PercentMax),
            "karvonen" => Ok(ZoneModel::Karvonen),
            other => Err(ZoneError::UnknownModel(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ZoneError {
    #[error("Max heart rate must be positive, got {0}")]
    InvalidHrMax(u32),

    #[error("Resting heart rate {hr_rest} must be positive and below max heart rate {hr_max}")]
    InvalidHrRest { hr_rest: u32, hr_max: u32 },

    #[error("{model} zones for max heart rate {hr_max} would not be strictly increasing")]
    DegenerateBoundaries { model: ZoneModel, hr_max: u32 },

    #[error("Unknown zone model '{0}', expected 'percent_max' or 'karvonen'")]
    UnknownModel(String),
}

/// One heart-rate zone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Zone {
    #[serde(rename = "zone")]
    pub label: &'static str,
    /// Inclusive
    pub min_bpm: u32,
    /// Exclusive; `None` for the open top zone
    pub max_bpm: Option<u32>,
}

impl Zone {
    pub fn contains(&self, bpm: f64) -> bool {
        let above_floor = bpm >= f64::from(self.min_bpm);
        match self.max_bpm {
            Some(max) => above_floor && bpm < f64::from(max),
            None => above_floor,
        }
    }
}

/// Ordered, contiguous partition of the heart-rate axis
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ZoneDefinition {
    zones: [Zone; ZONE_COUNT],
}

impl ZoneDefinition {
    fn from_boundaries(boundaries: [u32; ZONE_COUNT - 1]) -> Self {
        let zones = std::array::from_fn(|i| Zone {
            label: ZONE_LABELS[i],
            min_bpm: if i == 0 { 0 } else { boundaries[i - 1] },
            max_bpm: boundaries.get(i).copied(),
        });
        Self { zones }
    }

    pub fn zones(&self) -> &[Zone; ZONE_COUNT] {
        &self.zones
    }

    /// Index of the zone containing `bpm`; values matching no zone land in Z1
    pub fn zone_index(&self, bpm: f64) -> usize {
        self.zones.iter().position(|zone| zone.contains(bpm)).unwrap_or(0)
    }

    pub fn zone_for(&self, bpm: f64) -> &Zone {
        &self.zones[self.zone_index(bpm)]
    }
}

/// Build the five-zone partition for an athlete
///
/// `hr_rest` is ignored by [`ZoneModel::PercentMax`]. Callers substitute a
/// fallback max HR themselves; a zero `hr_max` is refused here.
pub fn build_zones(model: ZoneModel, hr_max: u32, hr_rest: u32) -> Result<ZoneDefinition, ZoneError> {
    if hr_max == 0 {
        return Err(ZoneError::InvalidHrMax(hr_max));
    }

    let max = f64::from(hr_max);
    let boundaries: [u32; ZONE_COUNT - 1] = match model {
        ZoneModel::PercentMax => ZONE_FRACTIONS.map(|f| (f * max).floor() as u32),
        ZoneModel::Karvonen => {
            if hr_rest == 0 || hr_rest >= hr_max {
                return Err(ZoneError::InvalidHrRest { hr_rest, hr_max });
            }
            let rest = f64::from(hr_rest);
            ZONE_FRACTIONS.map(|f| (rest + f * (max - rest)).round_ties_even() as u32)
        }
    };

    let increasing = boundaries[0] > 0 && boundaries.windows(2).all(|pair| pair[0] < pair[1]);
    if !increasing {
        return Err(ZoneError::DegenerateBoundaries { model, hr_max });
    }

    Ok(ZoneDefinition::from_boundaries(boundaries))
}

/// Where the max heart rate applied to a week came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HrMaxSource {
    /// Supplied by the caller
    Explicit,
    /// Highest max HR observed in the week's activities
    Estimated,
    /// Configured default, nothing better was available
    Fallback,
}

/// Zone model resolved for one analysis run
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedZones {
    pub model: ZoneModel,
    pub hr_max: u32,
    pub hr_max_source: HrMaxSource,
    /// Only set for Karvonen zones
    pub hr_rest: Option<u32>,
    pub definition: ZoneDefinition,
}
