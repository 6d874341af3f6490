// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! HTTP route tests against an in-memory activity source

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use coach_triathlon::calendar::WeekWindow;
use coach_triathlon::config::AnalysisConfig;
use coach_triathlon::models::{ActivityStreams, RawActivity, TypeFilter};
use coach_triathlon::providers::{ActivitySource, ProviderError, SourceFactory};
use coach_triathlon::routes;
use coach_triathlon::service::CoachService;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use warp::http::StatusCode;

/// Serves the same fixture activities for every week
#[derive(Default)]
struct FixtureSource {
    activities: Vec<Value>,
    streams: ActivityStreams,
    fail: bool,
    weeks_requested: Mutex<Vec<NaiveDate>>,
    stream_calls: Mutex<u32>,
}

#[async_trait]
impl ActivitySource for FixtureSource {
    async fn week_activities(&self, window: &WeekWindow, filter: &TypeFilter) -> Result<Vec<RawActivity>, ProviderError> {
        self.weeks_requested.lock().unwrap().push(window.week_start);
        if self.fail {
            return Err(ProviderError::Status {
                provider: "Fixture",
                endpoint: "/athlete/activities".to_string(),
                status: 502,
            });
        }

        let activities = self
            .activities
            .iter()
            .map(|value| serde_json::from_value::<RawActivity>(value.clone()).unwrap())
            .filter(|activity| filter.accepts(activity.type_tag()))
            .collect();
        Ok(activities)
    }

    async fn activity_streams(&self, _activity_id: u64) -> Result<ActivityStreams, ProviderError> {
        *self.stream_calls.lock().unwrap() += 1;
        Ok(self.streams.clone())
    }

    fn provider_name(&self) -> &'static str {
        "Fixture"
    }
}

struct FixtureFactory {
    source: Arc<FixtureSource>,
}

impl SourceFactory for FixtureFactory {
    fn source(&self, access_token: Option<String>) -> Result<Arc<dyn ActivitySource>, ProviderError> {
        match access_token {
            Some(_) => Ok(self.source.clone()),
            None => Err(ProviderError::MissingCredentials),
        }
    }
}

fn week_fixture() -> Vec<Value> {
    vec![
        json!({
            "id": 11,
            "name": "Tempo run",
            "type": "Run",
            "start_date_local": "2025-03-11T07:00:00Z",
            "distance": 12000,
            "moving_time": 3600,
            "elapsed_time": 3700,
            "total_elevation_gain": 85.4,
            "average_speed": 3.333,
            "average_heartrate": 144,
            "max_heartrate": 171
        }),
        json!({
            "id": 12,
            "name": "Endurance swim",
            "type": "Swim",
            "start_date_local": "2025-03-13T18:30:00Z",
            "distance": 2500,
            "moving_time": 2700,
            "average_heartrate": 128
        }),
    ]
}

fn api_with(source: FixtureSource) -> (Arc<FixtureSource>, impl warp::Filter<Extract = impl warp::Reply, Error = std::convert::Infallible> + Clone) {
    let source = Arc::new(source);
    let factory = FixtureFactory { source: source.clone() };
    let service = CoachService::new(Arc::new(factory), AnalysisConfig::default());
    (source, routes::api(Arc::new(service)))
}

fn fixture_source() -> FixtureSource {
    FixtureSource {
        activities: week_fixture(),
        ..FixtureSource::default()
    }
}

async fn get_json<F>(api: &F, path: &str) -> Result<(StatusCode, Value)>
where
    F: warp::Filter + Clone + 'static,
    F::Extract: warp::Reply + Send,
{
    let response = warp::test::request().method("GET").path(path).reply(api).await;
    let status = response.status();
    let body = serde_json::from_slice(response.body())?;
    Ok((status, body))
}

#[tokio::test]
async fn test_healthz() -> Result<()> {
    let (_, api) = api_with(FixtureSource::default());
    let (status, body) = get_json(&api, "/healthz").await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));
    Ok(())
}

#[tokio::test]
async fn test_weekly_stats() -> Result<()> {
    let (_, api) = api_with(fixture_source());
    let (status, body) = get_json(&api, "/weekly-stats?access_token=abc&week_start=2025-03-12").await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["week"],
        json!({"week_start": "2025-03-10", "week_end": "2025-03-16", "iso_year": 2025, "iso_week": 11})
    );
    assert_eq!(body["sessions"], json!(2));
    assert_eq!(body["total_km"], json!(14.5));
    assert_eq!(body["total_time_h"], json!(1.75));
    assert_eq!(body["counts_by_type"], json!({"Run": 1, "Swim": 1}));
    Ok(())
}

#[tokio::test]
async fn test_type_filter_applies() -> Result<()> {
    let (_, api) = api_with(fixture_source());
    let (status, body) = get_json(&api, "/weekly-stats?access_token=abc&week_start=2025-03-12&types=Run").await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sessions"], json!(1));
    assert_eq!(body["counts_by_type"], json!({"Run": 1}));
    Ok(())
}

#[tokio::test]
async fn test_iso_week_selection() -> Result<()> {
    let (source, api) = api_with(fixture_source());
    let (status, body) = get_json(&api, "/weekly-stats?access_token=abc&iso_year=2025&iso_week=11").await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["week"]["week_start"], json!("2025-03-10"));
    assert_eq!(
        *source.weeks_requested.lock().unwrap(),
        vec![NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()]
    );
    Ok(())
}

#[tokio::test]
async fn test_weekly_analysis_shape() -> Result<()> {
    let (source, api) = api_with(fixture_source());
    let (status, body) =
        get_json(&api, "/weekly-analysis?access_token=abc&week_start=2025-03-10&hrmax=180").await?;

    assert_eq!(status, StatusCode::OK);

    let summary = &body["weekly_summary"];
    assert_eq!(summary["sessions"], json!(2));
    assert_eq!(summary["hrmax_used"], json!(180));
    assert_eq!(summary["hrmax_source"], json!("explicit"));
    assert_eq!(summary["zone_model"], json!("percent_max"));

    let run = &body["sessions"][0];
    assert_eq!(run["type"], json!("Run"));
    assert_eq!(run["trimp"], json!(142.7));
    assert_eq!(run["time_in_zones_source"], json!("average"));
    assert_eq!(run["time_in_zones_s"]["Z4"], json!(3600));

    assert_eq!(body["zones_definition"].as_array().map(Vec::len), Some(5));
    assert!(body["recovery"]["daily_trimp"]["2025-03-11"].is_number());
    assert!(body["by_type"]["Swim"].is_object());

    // streams are requested by default
    assert_eq!(*source.stream_calls.lock().unwrap(), 2);
    Ok(())
}

#[tokio::test]
async fn test_weekly_analysis_without_streams() -> Result<()> {
    let (source, api) = api_with(fixture_source());
    let (status, _) = get_json(
        &api,
        "/weekly-analysis?access_token=abc&week_start=2025-03-10&with_streams=false&zone_model=karvonen&hrmax=185&hrrest=48",
    )
    .await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(*source.stream_calls.lock().unwrap(), 0);
    Ok(())
}

#[tokio::test]
async fn test_zero_hrmax_uses_observed_max() -> Result<()> {
    let (_, api) = api_with(fixture_source());
    let (status, body) = get_json(&api, "/weekly-analysis?access_token=abc&week_start=2025-03-10&hrmax=0").await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["weekly_summary"]["hrmax_used"], json!(171));
    assert_eq!(body["weekly_summary"]["hrmax_source"], json!("estimated"));
    Ok(())
}

#[tokio::test]
async fn test_weekly_details_full_streams() -> Result<()> {
    let source = FixtureSource {
        streams: ActivityStreams {
            heartrate: Some((0..1000).map(|i| Some(120.0 + (i % 40) as f64)).collect()),
            velocity_smooth: Some(vec![Some(3.0); 1000]),
        },
        ..fixture_source()
    };
    let (_, api) = api_with(source);
    let (status, body) = get_json(
        &api,
        "/weekly-details?access_token=abc&week_start=2025-03-10&streams_mode=full&max_points=100",
    )
    .await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["summary"]["sessions"], json!(2));

    let first = &body["activities"][0];
    assert_eq!(first["stream_stats"]["samples"], json!(1000));
    assert_eq!(first["stream_stats"]["speed_avg_kmh"], json!(10.8));
    assert_eq!(first["streams"]["heartrate"].as_array().map(Vec::len), Some(100));
    assert_eq!(first["streams"]["velocity_smooth_kmh"][0], json!(10.8));
    assert!(first.get("hr_decoupling_percent").is_none());
    Ok(())
}

#[tokio::test]
async fn test_weekly_details_rejects_max_points() -> Result<()> {
    let (_, api) = api_with(fixture_source());
    let (status, body) = get_json(&api, "/weekly-details?access_token=abc&max_points=50").await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("weekly_details_failed"));
    assert!(body["detail"].as_str().unwrap().contains("max_points"));
    Ok(())
}

#[tokio::test]
async fn test_invalid_parameters_are_bad_requests() -> Result<()> {
    let (_, api) = api_with(fixture_source());

    let cases = [
        ("/weekly-analysis?access_token=abc&zone_model=zone2", "weekly_analysis_failed"),
        ("/weekly-analysis?access_token=abc&week_start=2025-13-01", "weekly_analysis_failed"),
        ("/weekly-stats?access_token=abc&iso_year=2025&iso_week=54", "weekly_stats_failed"),
        ("/weekly-details?access_token=abc&streams_mode=everything", "weekly_details_failed"),
        ("/weekly-history?access_token=abc&weeks=30", "weekly_history_failed"),
    ];

    for (path, error) in cases {
        let (status, body) = get_json(&api, path).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", path);
        assert_eq!(body["error"], json!(error), "{}", path);
        assert!(body["detail"].is_string(), "{}", path);
    }
    Ok(())
}

#[tokio::test]
async fn test_malformed_query_value() -> Result<()> {
    let (_, api) = api_with(fixture_source());
    let (status, body) = get_json(&api, "/weekly-analysis?hrmax=fast").await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("invalid_query"));
    Ok(())
}

#[tokio::test]
async fn test_source_failure_is_server_error() -> Result<()> {
    let (_, api) = api_with(FixtureSource {
        fail: true,
        ..fixture_source()
    });
    let (status, body) = get_json(&api, "/weekly-stats?access_token=abc&week_start=2025-03-10").await?;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], json!("weekly_stats_failed"));
    assert!(body["detail"].as_str().unwrap().contains("HTTP 502"));
    Ok(())
}

#[tokio::test]
async fn test_missing_token_is_server_error() -> Result<()> {
    let (_, api) = api_with(fixture_source());
    let (status, body) = get_json(&api, "/weekly-stats?week_start=2025-03-10").await?;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["detail"].as_str().unwrap().contains("No access token"));
    Ok(())
}

#[tokio::test]
async fn test_weekly_history_oldest_first() -> Result<()> {
    let (source, api) = api_with(fixture_source());
    let (status, body) =
        get_json(&api, "/weekly-history?access_token=abc&weeks=3&end_week_start=2025-03-12").await?;

    assert_eq!(status, StatusCode::OK);
    let weeks = body.as_array().unwrap();
    assert_eq!(weeks.len(), 3);

    let starts: Vec<&str> = weeks.iter().map(|w| w["week"]["week_start"].as_str().unwrap()).collect();
    assert_eq!(starts, vec!["2025-02-24", "2025-03-03", "2025-03-10"]);
    assert_eq!(weeks[2]["sessions"], json!(2));
    assert!(weeks[2]["monotony"].is_number());

    assert_eq!(source.weeks_requested.lock().unwrap().len(), 3);
    assert_eq!(*source.stream_calls.lock().unwrap(), 0);
    Ok(())
}

#[tokio::test]
async fn test_unknown_path() -> Result<()> {
    let (_, api) = api_with(FixtureSource::default());
    let (status, body) = get_json(&api, "/weekly-everything").await?;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], json!("not_found"));
    Ok(())
}
