// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Weekly analyzer: the engine entry point
//!
//! Resolves the zone model once for the week, analyzes every session against
//! it and aggregates the results. No I/O happens here.

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use super::decoupling::decoupling;
use super::time_in_zones::{attribution, time_in_zones};
use super::trimp::trimp;
use super::weekly::{aggregate, RecoveryStats, SessionAnalysis, TypeTotals, WeeklySummary};
use super::zones::{build_zones, HrMaxSource, ResolvedZones, ZoneDefinition, ZoneError, ZoneModel};
use crate::config::AnalysisConfig;
use crate::models::{ActivityBrief, SessionInput, SportType};

/// Errors raised before any computation starts
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AnalysisError {
    #[error("Invalid analysis configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Zones(#[from] ZoneError),
}

/// Full result of one weekly analysis
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyAnalysis {
    pub weekly_summary: WeeklySummary,
    pub recovery: RecoveryStats,
    pub by_type: BTreeMap<SportType, TypeTotals>,
    pub sessions: Vec<SessionAnalysis>,
    /// Zone boundaries actually applied
    pub zones_definition: ZoneDefinition,
}

/// Stateless analysis engine bound to one configuration
#[derive(Debug, Clone)]
pub struct WeeklyAnalyzer {
    config: AnalysisConfig,
}

impl WeeklyAnalyzer {
    /// Create an analyzer, refusing configurations it could not honor
    pub fn new(config: AnalysisConfig) -> Result<Self, AnalysisError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Pick the max heart rate and build the week's zones
    ///
    /// Explicit value first, then the highest observed max HR (when
    /// estimation is enabled), then the configured fallback.
    pub fn resolve_zones(&self, briefs: &[&ActivityBrief]) -> Result<ResolvedZones, AnalysisError> {
        let model = self.config.zone_model;
        let hr_rest = self.config.hr_rest_or_default();

        if let Some(hr_max) = self.config.explicit_hr_max() {
            let definition = build_zones(model, hr_max, hr_rest)?;
            return Ok(resolved(model, hr_max, HrMaxSource::Explicit, hr_rest, definition));
        }

        if self.config.estimate_hr_max {
            if let Some(estimate) = estimate_hr_max(briefs.iter().copied()) {
                match build_zones(model, estimate, hr_rest) {
                    Ok(definition) => {
                        debug!(hr_max = estimate, zone_model = %model, "Estimated max heart rate from activities");
                        return Ok(resolved(model, estimate, HrMaxSource::Estimated, hr_rest, definition));
                    }
                    Err(e) => {
                        warn!(hr_max = estimate, error = %e, "Estimated max heart rate unusable, using fallback");
                    }
                }
            }
        }

        let hr_max = self.config.fallback_hr_max;
        warn!(hr_max, "No max heart rate available, applying fallback");
        let definition = build_zones(model, hr_max, hr_rest)?;
        Ok(resolved(model, hr_max, HrMaxSource::Fallback, hr_rest, definition))
    }

    /// Analyze a single session against already resolved zones
    pub fn analyze_session(&self, input: &SessionInput, zones: &ResolvedZones) -> SessionAnalysis {
        let brief = &input.brief;
        let thresholds = &self.config.thresholds;
        let duration_s = brief.moving_time_s;
        let hr_stream = input.heart_rate();

        let source = attribution(duration_s, brief.avg_heartrate, hr_stream, thresholds);
        let tiz = time_in_zones(duration_s, brief.avg_heartrate, hr_stream, &zones.definition, thresholds);
        let load = trimp(duration_s, brief.avg_heartrate, zones.hr_max);

        let hr_decoupling_percent = if self.config.applies_decoupling(brief.sport_type) {
            match (hr_stream, input.speed()) {
                (Some(hr), Some(speed)) => decoupling(hr, speed, thresholds.decoupling_min_samples),
                _ => None,
            }
        } else {
            None
        };

        SessionAnalysis {
            brief: brief.clone(),
            time_in_zones_s: tiz,
            time_in_zones_source: source,
            trimp: load,
            hr_decoupling_percent,
        }
    }

    /// Analyze one week of sessions, in input order
    pub fn analyze(&self, inputs: &[SessionInput]) -> Result<WeeklyAnalysis, AnalysisError> {
        let briefs: Vec<&ActivityBrief> = inputs.iter().map(|input| &input.brief).collect();
        let zones = self.resolve_zones(&briefs)?;

        let sessions: Vec<SessionAnalysis> = inputs
            .iter()
            .map(|input| self.analyze_session(input, &zones))
            .collect();

        let week = aggregate(&sessions, &zones);

        debug!(
            sessions = sessions.len(),
            hrmax_used = zones.hr_max,
            trimp_total = week.summary.trimp_total,
            "Weekly analysis complete"
        );

        Ok(WeeklyAnalysis {
            weekly_summary: week.summary,
            recovery: week.recovery,
            by_type: week.by_type,
            sessions,
            zones_definition: zones.definition,
        })
    }
}

fn resolved(
    model: ZoneModel,
    hr_max: u32,
    hr_max_source: HrMaxSource,
    hr_rest: u32,
    definition: ZoneDefinition,
) -> ResolvedZones {
    ResolvedZones {
        model,
        hr_max,
        hr_max_source,
        hr_rest: (model == ZoneModel::Karvonen).then_some(hr_rest),
        definition,
    }
}

/// Highest observed max heart rate, rounded to the nearest bpm
pub fn estimate_hr_max<'a>(briefs: impl IntoIterator<Item = &'a ActivityBrief>) -> Option<u32> {
    briefs
        .into_iter()
        .filter_map(|brief| brief.max_heartrate)
        .filter(|hr| hr.is_finite() && *hr > 0.0)
        .fold(None, |best: Option<f64>, hr| Some(best.map_or(hr, |b| b.max(hr))))
        .map(|hr| hr.round_ties_even() as u32)
        .filter(|hr| *hr > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intelligence::time_in_zones::ZoneAttribution;
    use crate::models::{ActivityStreams, RawActivity};

    fn brief(sport: &str, moving_s: f64, avg_hr: Option<f64>, max_hr: Option<f64>) -> ActivityBrief {
        ActivityBrief::from_raw(&RawActivity {
            activity_type: Some(sport.to_string()),
            start_date_local: Some("2025-03-10T08:00:00Z".to_string()),
            moving_time: Some(moving_s),
            average_heartrate: avg_hr,
            max_heartrate: max_hr,
            ..RawActivity::default()
        })
    }

    #[test]
    fn test_explicit_hr_max_wins() {
        let analyzer = WeeklyAnalyzer::new(AnalysisConfig::default().with_hr_max(Some(180))).unwrap();
        let b = brief("Run", 3600.0, Some(144.0), Some(195.0));

        let zones = analyzer.resolve_zones(&[&b]).unwrap();
        assert_eq!(zones.hr_max, 180);
        assert_eq!(zones.hr_max_source, HrMaxSource::Explicit);
        assert_eq!(zones.hr_rest, None);
    }

    #[test]
    fn test_hr_max_estimated_from_week() {
        let analyzer = WeeklyAnalyzer::new(AnalysisConfig::default()).unwrap();
        let a = brief("Run", 1800.0, Some(140.0), Some(176.4));
        let b = brief("Ride", 3600.0, Some(130.0), Some(181.5));
        let c = brief("Swim", 1800.0, None, None);

        let zones = analyzer.resolve_zones(&[&a, &b, &c]).unwrap();
        assert_eq!(zones.hr_max, 182);
        assert_eq!(zones.hr_max_source, HrMaxSource::Estimated);
    }

    #[test]
    fn test_zero_hr_max_is_estimated() {
        let configured_zero = AnalysisConfig {
            hr_max: Some(0),
            ..AnalysisConfig::default()
        };
        let analyzer = WeeklyAnalyzer::new(configured_zero).unwrap();
        let a = brief("Run", 3600.0, Some(150.0), Some(181.0));

        let zones = analyzer.resolve_zones(&[&a]).unwrap();
        assert_eq!(zones.hr_max, 181);
        assert_eq!(zones.hr_max_source, HrMaxSource::Estimated);

        let b = brief("Swim", 1800.0, None, None);
        let zones = analyzer.resolve_zones(&[&b]).unwrap();
        assert_eq!(zones.hr_max, 190);
        assert_eq!(zones.hr_max_source, HrMaxSource::Fallback);
    }

    #[test]
    fn test_fallback_is_surfaced() {
        let analyzer = WeeklyAnalyzer::new(AnalysisConfig::default()).unwrap();
        let a = brief("Swim", 1800.0, None, None);

        let zones = analyzer.resolve_zones(&[&a]).unwrap();
        assert_eq!(zones.hr_max, 190);
        assert_eq!(zones.hr_max_source, HrMaxSource::Fallback);

        let no_estimate = AnalysisConfig {
            estimate_hr_max: false,
            ..AnalysisConfig::default()
        };
        let analyzer = WeeklyAnalyzer::new(no_estimate).unwrap();
        let b = brief("Run", 1800.0, Some(150.0), Some(185.0));
        assert_eq!(analyzer.resolve_zones(&[&b]).unwrap().hr_max_source, HrMaxSource::Fallback);
    }

    #[test]
    fn test_unusable_estimate_falls_back() {
        // Karvonen with hr_rest 60 cannot use an observed max of 55
        let config = AnalysisConfig::default().with_zone_model(ZoneModel::Karvonen);
        let analyzer = WeeklyAnalyzer::new(config).unwrap();
        let a = brief("Walk", 1800.0, Some(50.0), Some(55.0));

        let zones = analyzer.resolve_zones(&[&a]).unwrap();
        assert_eq!(zones.hr_max, 190);
        assert_eq!(zones.hr_max_source, HrMaxSource::Fallback);
        assert_eq!(zones.hr_rest, Some(60));
    }

    #[test]
    fn test_invalid_explicit_config_is_rejected() {
        let config = AnalysisConfig::default().with_hr_max(Some(0));
        assert!(matches!(
            WeeklyAnalyzer::new(config),
            Err(AnalysisError::Zones(ZoneError::InvalidHrMax(0)))
        ));
    }

    #[test]
    fn test_session_with_streams_and_decoupling() {
        let analyzer = WeeklyAnalyzer::new(AnalysisConfig::default().with_hr_max(Some(200))).unwrap();
        let mut hr = vec![Some(150.0); 300];
        hr.extend(vec![Some(160.0); 300]);
        let speed = vec![Some(3.2); 600];
        let input = SessionInput::new(brief("Run", 600.0, Some(155.0), Some(165.0))).with_streams(ActivityStreams {
            heartrate: Some(hr),
            velocity_smooth: Some(speed),
        });

        let zones = analyzer.resolve_zones(&[&input.brief]).unwrap();
        let session = analyzer.analyze_session(&input, &zones);

        assert_eq!(session.time_in_zones_source, ZoneAttribution::Stream);
        assert_eq!(session.time_in_zones_s.seconds(), &[0, 0, 300, 300, 0]);
        // (3.2/160 - 3.2/150) / (3.2/150) = -6.25 %
        assert_eq!(session.hr_decoupling_percent, Some(-6.25));
        assert!(session.trimp > 0.0);
    }

    #[test]
    fn test_decoupling_policy_applied_per_sport() {
        let analyzer = WeeklyAnalyzer::new(AnalysisConfig::default().with_hr_max(Some(190))).unwrap();
        let streams = ActivityStreams {
            heartrate: Some(vec![Some(140.0); 120]),
            velocity_smooth: Some(vec![Some(1.2); 120]),
        };
        let swim = SessionInput::new(brief("Swim", 120.0, Some(140.0), None)).with_streams(streams.clone());
        let run = SessionInput::new(brief("Run", 120.0, Some(140.0), None)).with_streams(streams);

        let week = analyzer.analyze(&[swim, run]).unwrap();
        assert_eq!(week.sessions[0].hr_decoupling_percent, None);
        assert_eq!(week.sessions[1].hr_decoupling_percent, Some(0.0));

        let disabled = WeeklyAnalyzer::new(analyzer.config().clone().with_decoupling(false)).unwrap();
        let run = SessionInput::new(brief("Run", 120.0, Some(140.0), None)).with_streams(ActivityStreams {
            heartrate: Some(vec![Some(140.0); 120]),
            velocity_smooth: Some(vec![Some(3.0); 120]),
        });
        assert_eq!(disabled.analyze(&[run]).unwrap().sessions[0].hr_decoupling_percent, None);
    }

    #[test]
    fn test_end_to_end_single_session() {
        let analyzer = WeeklyAnalyzer::new(AnalysisConfig::default().with_hr_max(Some(180))).unwrap();
        let input = SessionInput::new(brief("Run", 3600.0, Some(144.0), Some(170.0)));

        let week = analyzer.analyze(&[input]).unwrap();

        assert!((week.weekly_summary.trimp_total - 142.72).abs() < 0.01);
        assert_eq!(week.weekly_summary.hrmax_used, 180);
        // 144 bpm sits on the Z4 floor for hr_max 180
        assert_eq!(week.weekly_summary.time_in_zones_s.get("Z4"), Some(3600));
        assert_eq!(week.recovery.monotony, Some(week.weekly_summary.trimp_total));
        assert_eq!(week.sessions[0].time_in_zones_source, ZoneAttribution::Average);
    }

    #[test]
    fn test_estimate_ignores_junk() {
        let a = brief("Run", 60.0, None, Some(f64::NAN));
        let b = brief("Run", 60.0, None, Some(-3.0));
        assert_eq!(estimate_hr_max([&a, &b]), None);

        let c = brief("Run", 60.0, None, Some(172.5));
        assert_eq!(estimate_hr_max([&a, &b, &c]), Some(172));
    }
}
