// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Activity sources and the credentials they run with

use async_trait::async_trait;
use std::sync::Arc;

use crate::calendar::WeekWindow;
use crate::models::{ActivityStreams, RawActivity, TypeFilter};

pub mod strava;

pub use strava::{StravaProvider, StravaSourceFactory};

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("No access token available: pass access_token or configure ACCESS_TOKEN")]
    MissingCredentials,

    #[error("{provider} returned HTTP {status} for {endpoint}")]
    Status {
        provider: &'static str,
        endpoint: String,
        status: u16,
    },

    #[error("Request to {endpoint} failed")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Unreadable response from {endpoint}")]
    Decode {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Invalid provider URL")]
    Url(#[from] url::ParseError),

    #[error("Failed to build HTTP client")]
    Client(#[source] reqwest::Error),

    #[error("Token refresh failed: {0}")]
    Refresh(String),
}

/// Supplies bearer tokens to a source
///
/// Scoped to whoever constructs it; nothing is cached process-wide.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn access_token(&self) -> Result<String, ProviderError>;

    /// Called after an HTTP 401. `Some(token)` makes the source retry once.
    async fn refresh(&self) -> Result<Option<String>, ProviderError> {
        Ok(None)
    }
}

/// A fixed token that cannot be refreshed
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    token: Option<String>,
}

impl StaticCredentials {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: token.filter(|t| !t.trim().is_empty()),
        }
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentials {
    async fn access_token(&self) -> Result<String, ProviderError> {
        self.token.clone().ok_or(ProviderError::MissingCredentials)
    }
}

/// Where activities and their streams come from
#[async_trait]
pub trait ActivitySource: Send + Sync {
    /// Every activity of the week whose raw type tag passes `filter`
    async fn week_activities(&self, window: &WeekWindow, filter: &TypeFilter) -> Result<Vec<RawActivity>, ProviderError>;

    /// Heart-rate and speed streams; empty when the provider has none
    async fn activity_streams(&self, activity_id: u64) -> Result<ActivityStreams, ProviderError>;

    fn provider_name(&self) -> &'static str;
}

/// Builds a source for one request's credentials
pub trait SourceFactory: Send + Sync {
    /// `access_token` is the per-request token, if any
    fn source(&self, access_token: Option<String>) -> Result<Arc<dyn ActivitySource>, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_credentials() {
        let creds = StaticCredentials::new(Some("abc".to_string()));
        assert_eq!(creds.access_token().await.unwrap(), "abc");
        assert!(creds.refresh().await.unwrap().is_none());

        let blank = StaticCredentials::new(Some("  ".to_string()));
        assert!(matches!(blank.access_token().await, Err(ProviderError::MissingCredentials)));
    }
}
