// File: src/fetch.rs
// Purpose: PropsFetcher over HTTP with reqwest

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CACHE_CONTROL, LOCATION};
use reqwest::redirect::Policy;
use reqwest::{Client, StatusCode};
use rssr_core::{wire, ServerSideProps, PROPS_MEDIA_TYPE};
use tracing::debug;

use crate::error::NavigationError;
use crate::host::PropsFetcher;

/// Requests `<origin><target>` with the serialized-props media type
///
/// Redirects are not followed: a `302` becomes a redirect result so the
/// navigation controller can push it onto the history.
#[derive(Debug, Clone)]
pub struct HttpPropsFetcher {
    client: Client,
    origin: String,
}

impl HttpPropsFetcher {
    pub fn new(origin: impl Into<String>) -> Result<Self, reqwest::Error> {
        let client = Client::builder().redirect(Policy::none()).build()?;
        Ok(Self {
            client,
            origin: origin.into().trim_end_matches('/').to_string(),
        })
    }

    fn fetch_error(target: &str, source: impl Into<anyhow::Error>) -> NavigationError {
        NavigationError::Fetch {
            target: target.to_string(),
            source: source.into(),
        }
    }
}

#[async_trait]
impl PropsFetcher for HttpPropsFetcher {
    async fn fetch(&self, target: &str) -> Result<Option<ServerSideProps>, NavigationError> {
        let url = format!("{}{}", self.origin, target);
        debug!("Fetching props from {}", url);

        let response = self
            .client
            .get(&url)
            .header(ACCEPT, PROPS_MEDIA_TYPE)
            .header(CACHE_CONTROL, "no-cache")
            .send()
            .await
            .map_err(|err| Self::fetch_error(target, err))?;

        let status = response.status();
        if status == StatusCode::FOUND {
            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|value| value.to_str().ok())
                .ok_or_else(|| Self::fetch_error(target, anyhow::anyhow!("redirect without location")))?;
            return Ok(Some(ServerSideProps::redirect(location)));
        }
        if !status.is_success() {
            return Err(Self::fetch_error(target, anyhow::anyhow!("server answered {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|err| Self::fetch_error(target, err))?;
        Ok(wire::from_str(&body)?)
    }
}
