// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};
use url::Url;

use super::{ActivitySource, CredentialProvider, ProviderError, SourceFactory, StaticCredentials};
use crate::calendar::WeekWindow;
use crate::config::StravaConfig;
use crate::logging::AppLogger;
use crate::models::{ActivityStreams, RawActivity, TypeFilter};

const PROVIDER_NAME: &str = "Strava";
const STREAM_KEYS: &str = "heartrate,velocity_smooth";

pub struct StravaProvider {
    client: Client,
    api_base: Url,
    per_page: u32,
    credentials: Arc<dyn CredentialProvider>,
}

impl StravaProvider {
    pub fn new(config: &StravaConfig, credentials: Arc<dyn CredentialProvider>) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(ProviderError::Client)?;
        Self::with_client(client, &config.api_base, config.per_page, credentials)
    }

    pub fn with_client(
        client: Client,
        api_base: &str,
        per_page: u32,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Result<Self, ProviderError> {
        // trailing slash so joins stay under the versioned prefix
        let api_base = Url::parse(&format!("{}/", api_base.trim_end_matches('/')))?;
        Ok(Self {
            client,
            api_base,
            per_page: per_page.max(1),
            credentials,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ProviderError> {
        Ok(self.api_base.join(path)?)
    }

    async fn send(&self, url: &Url, query: &[(&str, String)], token: &str) -> Result<Response, ProviderError> {
        let started = Instant::now();
        let response = self
            .client
            .get(url.clone())
            .bearer_auth(token)
            .query(query)
            .send()
            .await
            .map_err(|source| ProviderError::Transport {
                endpoint: url.path().to_string(),
                source,
            })?;

        AppLogger::log_provider_call(
            PROVIDER_NAME,
            url.path(),
            response.status().as_u16(),
            started.elapsed().as_millis() as u64,
        );
        Ok(response)
    }

    /// GET with one refresh-and-retry on 401
    async fn get(&self, url: &Url, query: &[(&str, String)]) -> Result<Response, ProviderError> {
        let token = self.credentials.access_token().await?;
        let response = self.send(url, query, &token).await?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        match self.credentials.refresh().await? {
            Some(fresh) => {
                info!(endpoint = %url.path(), "Access token rejected, retrying with refreshed token");
                self.send(url, query, &fresh).await
            }
            None => Ok(response),
        }
    }

    fn check_status(url: &Url, response: &Response) -> Result<(), ProviderError> {
        if response.status().is_success() {
            Ok(())
        } else {
            Err(ProviderError::Status {
                provider: PROVIDER_NAME,
                endpoint: url.path().to_string(),
                status: response.status().as_u16(),
            })
        }
    }
}

#[async_trait]
impl ActivitySource for StravaProvider {
    async fn week_activities(&self, window: &WeekWindow, filter: &TypeFilter) -> Result<Vec<RawActivity>, ProviderError> {
        let url = self.endpoint("athlete/activities")?;
        let mut activities = Vec::new();
        let mut page = 1u32;

        loop {
            let query = [
                ("after", window.after_ts.to_string()),
                ("before", window.before_ts.to_string()),
                ("page", page.to_string()),
                ("per_page", self.per_page.to_string()),
            ];
            let response = self.get(&url, &query).await?;
            Self::check_status(&url, &response)?;

            let chunk: Vec<RawActivity> = response.json().await.map_err(|source| ProviderError::Decode {
                endpoint: url.path().to_string(),
                source,
            })?;
            let fetched = chunk.len();

            activities.extend(chunk.into_iter().filter(|a| filter.accepts(a.type_tag())));

            if fetched < self.per_page as usize {
                break;
            }
            page += 1;
        }

        debug!(
            week_start = %window.week_start,
            activities = activities.len(),
            pages = page,
            "Fetched week activities"
        );
        Ok(activities)
    }

    async fn activity_streams(&self, activity_id: u64) -> Result<ActivityStreams, ProviderError> {
        let url = self.endpoint(&format!("activities/{}/streams", activity_id))?;
        let query = [("keys", STREAM_KEYS.to_string()), ("key_by_type", "true".to_string())];

        let response = self.get(&url, &query).await?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!(activity_id, "No streams for activity");
            return Ok(ActivityStreams::default());
        }
        Self::check_status(&url, &response)?;

        let streams: StravaStreamSet = response.json().await.map_err(|source| ProviderError::Decode {
            endpoint: url.path().to_string(),
            source,
        })?;
        Ok(streams.into())
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER_NAME
    }
}

/// `key_by_type=true` payload: `{"heartrate": {"data": [...]}, ...}`
#[derive(Debug, Default, Deserialize)]
struct StravaStreamSet {
    #[serde(default)]
    heartrate: Option<StravaStream>,
    #[serde(default)]
    velocity_smooth: Option<StravaStream>,
}

#[derive(Debug, Deserialize)]
struct StravaStream {
    #[serde(default)]
    data: Option<Vec<Option<f64>>>,
}

impl From<StravaStreamSet> for ActivityStreams {
    fn from(set: StravaStreamSet) -> Self {
        ActivityStreams {
            heartrate: set.heartrate.and_then(|s| s.data),
            velocity_smooth: set.velocity_smooth.and_then(|s| s.data),
        }
    }
}

/// Builds a [`StravaProvider`] per request
///
/// The request's token wins over the configured one.
pub struct StravaSourceFactory {
    config: StravaConfig,
    client: Client,
}

impl StravaSourceFactory {
    pub fn new(config: &StravaConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(ProviderError::Client)?;
        Ok(Self {
            config: config.clone(),
            client,
        })
    }
}

impl SourceFactory for StravaSourceFactory {
    fn source(&self, access_token: Option<String>) -> Result<Arc<dyn ActivitySource>, ProviderError> {
        let token = access_token
            .filter(|t| !t.trim().is_empty())
            .or_else(|| self.config.access_token.clone());
        let credentials = Arc::new(StaticCredentials::new(token));
        let provider = StravaProvider::with_client(
            self.client.clone(),
            &self.config.api_base,
            self.config.per_page,
            credentials,
        )?;
        Ok(Arc::new(provider))
    }
}
