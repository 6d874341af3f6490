// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Request orchestration: fetch a week from the source, run the engine

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use serde::Serialize;
use std::sync::Arc;

use crate::calendar::{history_windows, WeekSelection, WeekWindow};
use crate::config::AnalysisConfig;
use crate::intelligence::{
    summarize_week, StreamsMode, WeekHistoryEntry, WeeklyAnalysis, WeeklyAnalyzer, WeeklyDetails, WeeklyStats,
    ZoneModel,
};
use crate::logging::AppLogger;
use crate::models::{ActivityBrief, SessionInput, TypeFilter};
use crate::providers::{ActivitySource, SourceFactory};

/// Parameters shared by every weekly endpoint
#[derive(Debug, Clone)]
pub struct WeekRequest {
    pub access_token: Option<String>,
    pub types: TypeFilter,
    pub selection: WeekSelection,
}

#[derive(Debug, Clone)]
pub struct DetailsOptions {
    pub streams_mode: StreamsMode,
    pub max_points: usize,
    pub compute_decoupling: bool,
    pub hr_max: Option<u32>,
    pub hr_rest: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    pub with_streams: bool,
    pub zone_model: ZoneModel,
    pub hr_max: Option<u32>,
    pub hr_rest: Option<u32>,
    pub compute_decoupling: bool,
}

/// A weekly payload tagged with the week it covers
#[derive(Debug, Clone, Serialize)]
pub struct WeekReport<T> {
    pub week: WeekWindow,
    #[serde(flatten)]
    pub report: T,
}

pub struct CoachService {
    sources: Arc<dyn SourceFactory>,
    analysis: AnalysisConfig,
}

impl CoachService {
    pub fn new(sources: Arc<dyn SourceFactory>, analysis: AnalysisConfig) -> Self {
        Self { sources, analysis }
    }

    fn today() -> NaiveDate {
        Local::now().date_naive()
    }

    fn window(&self, selection: WeekSelection) -> Result<WeekWindow> {
        WeekWindow::for_selection(selection, Self::today(), &Local).context("Failed to resolve target week")
    }

    fn source(&self, request: &WeekRequest) -> Result<Arc<dyn ActivitySource>> {
        self.sources
            .source(request.access_token.clone())
            .context("Failed to create activity source")
    }

    async fn load_week(
        &self,
        source: &dyn ActivitySource,
        window: &WeekWindow,
        types: &TypeFilter,
        with_streams: bool,
    ) -> Result<(Vec<SessionInput>, usize)> {
        let raw = source
            .week_activities(window, types)
            .await
            .with_context(|| format!("Failed to fetch activities for week of {}", window.week_start))?;

        let mut inputs = Vec::with_capacity(raw.len());
        let mut streams_fetched = 0;
        for activity in &raw {
            let mut input = SessionInput::new(ActivityBrief::from_raw(activity));
            if let (true, Some(id)) = (with_streams, activity.id) {
                let streams = source
                    .activity_streams(id)
                    .await
                    .with_context(|| format!("Failed to fetch streams for activity {}", id))?;
                if !streams.is_empty() {
                    streams_fetched += 1;
                    input = input.with_streams(streams);
                }
            }
            inputs.push(input);
        }
        Ok((inputs, streams_fetched))
    }

    /// Volume totals for one week
    pub async fn weekly_stats(&self, request: &WeekRequest) -> Result<WeekReport<WeeklyStats>> {
        let window = self.window(request.selection)?;
        let source = self.source(request)?;
        let (inputs, _) = self.load_week(source.as_ref(), &window, &request.types, false).await?;

        let briefs: Vec<ActivityBrief> = inputs.into_iter().map(|input| input.brief).collect();
        AppLogger::log_week_analyzed("weekly-stats", &window.week_start.to_string(), briefs.len(), 0);

        Ok(WeekReport {
            week: window,
            report: summarize_week(&briefs),
        })
    }

    /// Per-activity listing with optional stream previews
    pub async fn weekly_details(&self, request: &WeekRequest, options: &DetailsOptions) -> Result<WeekReport<WeeklyDetails>> {
        let analyzer = WeeklyAnalyzer::new(
            self.analysis
                .clone()
                .with_hr_max(options.hr_max)
                .with_hr_rest(options.hr_rest)
                .with_decoupling(options.compute_decoupling),
        )?;
        let window = self.window(request.selection)?;
        let source = self.source(request)?;
        let with_streams = options.streams_mode.fetches_streams();
        let (inputs, streams_fetched) = self.load_week(source.as_ref(), &window, &request.types, with_streams).await?;

        let analysis = analyzer.analyze(&inputs)?;
        AppLogger::log_week_analyzed("weekly-details", &window.week_start.to_string(), inputs.len(), streams_fetched);

        Ok(WeekReport {
            week: window,
            report: WeeklyDetails::build(analysis, &inputs, options.streams_mode, options.max_points),
        })
    }

    /// Zones, TRIMP, recovery and decoupling for one week
    pub async fn weekly_analysis(&self, request: &WeekRequest, options: &AnalysisOptions) -> Result<WeekReport<WeeklyAnalysis>> {
        let analyzer = WeeklyAnalyzer::new(
            self.analysis
                .clone()
                .with_zone_model(options.zone_model)
                .with_hr_max(options.hr_max)
                .with_hr_rest(options.hr_rest)
                .with_decoupling(options.compute_decoupling),
        )?;
        let window = self.window(request.selection)?;
        let source = self.source(request)?;
        let (inputs, streams_fetched) = self
            .load_week(source.as_ref(), &window, &request.types, options.with_streams)
            .await?;

        let analysis = analyzer.analyze(&inputs)?;
        AppLogger::log_week_analyzed("weekly-analysis", &window.week_start.to_string(), inputs.len(), streams_fetched);

        Ok(WeekReport {
            week: window,
            report: analysis,
        })
    }

    /// Compact records for `weeks` weeks ending with the selected one, oldest first
    pub async fn weekly_history(&self, request: &WeekRequest, weeks: u32) -> Result<Vec<WeekReport<WeekHistoryEntry>>> {
        let analyzer = WeeklyAnalyzer::new(self.analysis.clone())?;
        let last = self.window(request.selection)?;
        let windows = history_windows(&last, weeks, &Local)?;
        let source = self.source(request)?;

        let mut history = Vec::with_capacity(windows.len());
        for window in windows {
            let (inputs, _) = self.load_week(source.as_ref(), &window, &request.types, false).await?;
            let analysis = analyzer.analyze(&inputs)?;
            history.push(WeekReport {
                week: window,
                report: WeekHistoryEntry::from_analysis(&analysis),
            });
        }

        let sessions = history.iter().map(|week| week.report.sessions).sum();
        AppLogger::log_week_analyzed("weekly-history", &last.week_start.to_string(), sessions, 0);
        Ok(history)
    }
}
