// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Offline Weekly Analysis
//!
//! Runs the analysis engine over activities exported to JSON and prints the
//! result. No network access.

use anyhow::{Context, Result};
use clap::Parser;
use coach_triathlon::{
    config::AnalysisConfig,
    intelligence::{WeeklyAnalyzer, ZoneModel},
    logging::LoggingConfig,
    models::{ActivityBrief, ActivityStreams, RawActivity, SessionInput, TypeFilter},
};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "analyze-week")]
#[command(about = "Analyze one week of exported activities")]
struct Args {
    /// JSON array of raw activities, as returned by /athlete/activities
    #[arg(short, long)]
    activities: PathBuf,

    /// JSON object mapping activity id to {"heartrate": [...], "velocity_smooth": [...]}
    #[arg(short, long)]
    streams: Option<PathBuf>,

    /// Analysis configuration file (TOML)
    #[arg(short, long)]
    config: Option<String>,

    /// Zone model: percent_max or karvonen
    #[arg(long)]
    zone_model: Option<ZoneModel>,

    /// Max heart rate in bpm
    #[arg(long)]
    hrmax: Option<u32>,

    /// Resting heart rate in bpm
    #[arg(long)]
    hrrest: Option<u32>,

    /// Skip aerobic decoupling
    #[arg(long, default_value = "false")]
    no_decoupling: bool,

    /// Comma-separated sport types, or "all"
    #[arg(short, long, default_value = "all")]
    types: String,
}

fn read_json<T: serde::de::DeserializeOwned>(path: &PathBuf) -> Result<T> {
    let content = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

fn main() -> Result<()> {
    LoggingConfig::for_cli().init()?;

    let args = Args::parse();

    let mut config = AnalysisConfig::load(args.config)?
        .with_hr_max(args.hrmax)
        .with_hr_rest(args.hrrest);
    if let Some(model) = args.zone_model {
        config = config.with_zone_model(model);
    }
    if args.no_decoupling {
        config = config.with_decoupling(false);
    }
    let analyzer = WeeklyAnalyzer::new(config)?;

    let filter = TypeFilter::parse(&args.types);
    let raw: Vec<RawActivity> = read_json(&args.activities)?;
    let mut streams: HashMap<String, ActivityStreams> = match &args.streams {
        Some(path) => read_json(path)?,
        None => HashMap::new(),
    };

    let inputs: Vec<SessionInput> = raw
        .iter()
        .filter(|activity| filter.accepts(activity.type_tag()))
        .map(|activity| {
            let input = SessionInput::new(ActivityBrief::from_raw(activity));
            match activity.id.and_then(|id| streams.remove(&id.to_string())) {
                Some(s) => input.with_streams(s),
                None => input,
            }
        })
        .collect();

    if !streams.is_empty() {
        warn!(unmatched = streams.len(), "Streams without a matching activity were ignored");
    }

    let week = analyzer.analyze(&inputs)?;
    info!(
        sessions = week.weekly_summary.sessions,
        hrmax_used = week.weekly_summary.hrmax_used,
        "Analysis complete"
    );

    println!("{}", serde_json::to_string_pretty(&week)?);
    Ok(())
}
