// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! HTTP routes for the weekly endpoints
//!
//! Every endpoint is a GET returning JSON. Failures come back as
//! `{"error": "<endpoint>_failed", "detail": "..."}`: 400 for unusable
//! parameters, 500 for everything else.

use chrono::Local;
use serde::Deserialize;
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::{error, warn};
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

use crate::calendar::{WeekError, WeekSelection};
use crate::constants::limits;
use crate::intelligence::{AnalysisError, StreamsMode, ZoneError, ZoneModel};
use crate::logging::AppLogger;
use crate::models::TypeFilter;
use crate::service::{AnalysisOptions, CoachService, DetailsOptions, WeekRequest};

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    error: String,
    detail: String,
}

impl warp::reject::Reject for ApiError {}

impl ApiError {
    fn bad_request(endpoint: &str, detail: impl Into<String>) -> Rejection {
        warp::reject::custom(ApiError {
            status: StatusCode::BAD_REQUEST,
            error: format!("{}_failed", endpoint),
            detail: detail.into(),
        })
    }

    /// Parameter problems surfacing from the engine map to 400
    fn from_service(endpoint: &str, err: anyhow::Error) -> Rejection {
        let invalid_input = err
            .chain()
            .any(|cause| cause.is::<AnalysisError>() || cause.is::<WeekError>() || cause.is::<ZoneError>());
        let status = if invalid_input {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };

        let detail = format!("{:#}", err);
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(endpoint, error = %detail, "Request failed");
        }

        warp::reject::custom(ApiError {
            status,
            error: format!("{}_failed", endpoint),
            detail,
        })
    }
}

fn default_types() -> String {
    "all".to_string()
}

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    pub access_token: Option<String>,
    #[serde(default = "default_types")]
    pub types: String,
    pub week_start: Option<String>,
    pub iso_year: Option<i32>,
    pub iso_week: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct DetailsQuery {
    pub access_token: Option<String>,
    #[serde(default = "default_types")]
    pub types: String,
    pub week_start: Option<String>,
    pub iso_year: Option<i32>,
    pub iso_week: Option<u32>,
    pub streams_mode: Option<String>,
    pub max_points: Option<usize>,
    pub compute_decoupling: Option<bool>,
    pub hrmax: Option<u32>,
    pub hrrest: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct AnalysisQuery {
    pub access_token: Option<String>,
    #[serde(default = "default_types")]
    pub types: String,
    pub week_start: Option<String>,
    pub iso_year: Option<i32>,
    pub iso_week: Option<u32>,
    pub with_streams: Option<bool>,
    pub zone_model: Option<String>,
    pub hrmax: Option<u32>,
    pub hrrest: Option<u32>,
    pub compute_decoupling: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub access_token: Option<String>,
    #[serde(default = "default_types")]
    pub types: String,
    pub weeks: Option<u32>,
    pub end_week_start: Option<String>,
    pub iso_year: Option<i32>,
    pub iso_week: Option<u32>,
}

fn week_request(
    endpoint: &str,
    access_token: Option<String>,
    types: &str,
    week_start: Option<&str>,
    iso_year: Option<i32>,
    iso_week: Option<u32>,
) -> Result<WeekRequest, Rejection> {
    let selection = WeekSelection::from_params(week_start, iso_year, iso_week, Local::now().date_naive())
        .map_err(|e| ApiError::bad_request(endpoint, e.to_string()))?;
    Ok(WeekRequest {
        access_token,
        types: TypeFilter::parse(types),
        selection,
    })
}

fn with_service(service: Arc<CoachService>) -> impl Filter<Extract = (Arc<CoachService>,), Error = Infallible> + Clone {
    warp::any().map(move || service.clone())
}

/// All routes, with CORS, error recovery and request logging
pub fn api(service: Arc<CoachService>) -> impl Filter<Extract = impl Reply, Error = Infallible> + Clone {
    let cors = warp::cors()
        .allow_any_origin()
        .allow_headers(vec!["content-type", "authorization"])
        .allow_methods(vec!["GET", "OPTIONS"]);

    let healthz = warp::path("healthz")
        .and(warp::path::end())
        .and(warp::get())
        .map(|| warp::reply::json(&json!({"status": "ok"})));

    let stats = warp::path("weekly-stats")
        .and(warp::path::end())
        .and(warp::get())
        .and(warp::query::<StatsQuery>())
        .and(with_service(service.clone()))
        .and_then(weekly_stats_handler);

    let details = warp::path("weekly-details")
        .and(warp::path::end())
        .and(warp::get())
        .and(warp::query::<DetailsQuery>())
        .and(with_service(service.clone()))
        .and_then(weekly_details_handler);

    let analysis = warp::path("weekly-analysis")
        .and(warp::path::end())
        .and(warp::get())
        .and(warp::query::<AnalysisQuery>())
        .and(with_service(service.clone()))
        .and_then(weekly_analysis_handler);

    let history = warp::path("weekly-history")
        .and(warp::path::end())
        .and(warp::get())
        .and(warp::query::<HistoryQuery>())
        .and(with_service(service))
        .and_then(weekly_history_handler);

    let log = warp::log::custom(|info| {
        AppLogger::log_api_request(
            info.method().as_str(),
            info.path(),
            info.status().as_u16(),
            info.elapsed().as_millis() as u64,
        )
    });

    healthz
        .or(stats)
        .or(details)
        .or(analysis)
        .or(history)
        .with(cors)
        .recover(handle_rejection)
        .with(log)
}

async fn weekly_stats_handler(query: StatsQuery, service: Arc<CoachService>) -> Result<impl Reply, Rejection> {
    const ENDPOINT: &str = "weekly_stats";
    let request = week_request(
        ENDPOINT,
        query.access_token,
        &query.types,
        query.week_start.as_deref(),
        query.iso_year,
        query.iso_week,
    )?;

    match service.weekly_stats(&request).await {
        Ok(report) => Ok(warp::reply::json(&report)),
        Err(e) => Err(ApiError::from_service(ENDPOINT, e)),
    }
}

async fn weekly_details_handler(query: DetailsQuery, service: Arc<CoachService>) -> Result<impl Reply, Rejection> {
    const ENDPOINT: &str = "weekly_details";
    let request = week_request(
        ENDPOINT,
        query.access_token,
        &query.types,
        query.week_start.as_deref(),
        query.iso_year,
        query.iso_week,
    )?;

    let streams_mode = match query.streams_mode.as_deref() {
        Some(raw) => raw
            .parse::<StreamsMode>()
            .map_err(|e| ApiError::bad_request(ENDPOINT, e.to_string()))?,
        None => StreamsMode::default(),
    };

    let max_points = query.max_points.unwrap_or(limits::DEFAULT_MAX_POINTS);
    if !(limits::MIN_MAX_POINTS..=limits::MAX_MAX_POINTS).contains(&max_points) {
        return Err(ApiError::bad_request(
            ENDPOINT,
            format!(
                "max_points must be between {} and {}, got {}",
                limits::MIN_MAX_POINTS,
                limits::MAX_MAX_POINTS,
                max_points
            ),
        ));
    }

    let options = DetailsOptions {
        streams_mode,
        max_points,
        compute_decoupling: query.compute_decoupling.unwrap_or(false),
        hr_max: query.hrmax,
        hr_rest: query.hrrest,
    };

    match service.weekly_details(&request, &options).await {
        Ok(report) => Ok(warp::reply::json(&report)),
        Err(e) => Err(ApiError::from_service(ENDPOINT, e)),
    }
}

async fn weekly_analysis_handler(query: AnalysisQuery, service: Arc<CoachService>) -> Result<impl Reply, Rejection> {
    const ENDPOINT: &str = "weekly_analysis";
    let request = week_request(
        ENDPOINT,
        query.access_token,
        &query.types,
        query.week_start.as_deref(),
        query.iso_year,
        query.iso_week,
    )?;

    let zone_model = match query.zone_model.as_deref() {
        Some(raw) => raw
            .parse::<ZoneModel>()
            .map_err(|e| ApiError::bad_request(ENDPOINT, e.to_string()))?,
        None => ZoneModel::default(),
    };

    let options = AnalysisOptions {
        with_streams: query.with_streams.unwrap_or(true),
        zone_model,
        hr_max: query.hrmax,
        hr_rest: query.hrrest,
        compute_decoupling: query.compute_decoupling.unwrap_or(true),
    };

    match service.weekly_analysis(&request, &options).await {
        Ok(report) => Ok(warp::reply::json(&report)),
        Err(e) => Err(ApiError::from_service(ENDPOINT, e)),
    }
}

async fn weekly_history_handler(query: HistoryQuery, service: Arc<CoachService>) -> Result<impl Reply, Rejection> {
    const ENDPOINT: &str = "weekly_history";
    let weeks = query.weeks.unwrap_or(limits::DEFAULT_HISTORY_WEEKS);
    let request = week_request(
        ENDPOINT,
        query.access_token,
        &query.types,
        query.end_week_start.as_deref(),
        query.iso_year,
        query.iso_week,
    )?;

    match service.weekly_history(&request, weeks).await {
        Ok(history) => Ok(warp::reply::json(&history)),
        Err(e) => Err(ApiError::from_service(ENDPOINT, e)),
    }
}

/// Turn rejections into JSON error bodies
async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (status, body) = if let Some(api_error) = err.find::<ApiError>() {
        (
            api_error.status,
            json!({"error": api_error.error, "detail": api_error.detail}),
        )
    } else if let Some(invalid) = err.find::<warp::reject::InvalidQuery>() {
        (
            StatusCode::BAD_REQUEST,
            json!({"error": "invalid_query", "detail": invalid.to_string()}),
        )
    } else if err.is_not_found() {
        (
            StatusCode::NOT_FOUND,
            json!({"error": "not_found", "detail": "The requested endpoint was not found"}),
        )
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (
            StatusCode::METHOD_NOT_ALLOWED,
            json!({"error": "method_not_allowed", "detail": "Only GET is supported"}),
        )
    } else if let Some(cors) = err.find::<warp::cors::CorsForbidden>() {
        (
            StatusCode::FORBIDDEN,
            json!({"error": "cors_forbidden", "detail": cors.to_string()}),
        )
    } else {
        warn!(rejection = ?err, "Unhandled rejection");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({"error": "internal_error", "detail": "Something went wrong"}),
        )
    };

    Ok(warp::reply::with_status(warp::reply::json(&body), status))
}
