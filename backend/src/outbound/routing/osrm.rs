//! Reqwest-backed OSRM route provider.
//!
//! This adapter owns transport details only: URL construction, timeout and
//! HTTP error mapping, and JSON decoding into a domain route.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use tracing::debug;

use super::dto::{OsrmResponseDto, RouteMapping};
use crate::domain::ports::{RouteProvider, RouteProviderError};
use crate::domain::{Coordinate, Route};

const USER_AGENT: &str = "dispatch-backend/0.1";

/// Route provider that queries `{base}/route/v1/driving/...`.
pub struct OsrmRouteProvider {
    client: Client,
    base_url: Url,
}

impl OsrmRouteProvider {
    /// Build an adapter using a reqwest client with an explicit request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client, base_url })
    }

    fn route_url(&self, pickup: Coordinate, destination: Coordinate) -> Result<Url, RouteProviderError> {
        let path = format!(
            "route/v1/driving/{},{};{},{}",
            pickup.longitude(),
            pickup.latitude(),
            destination.longitude(),
            destination.latitude(),
        );
        let mut base = self.base_url.clone();
        if !base.path().ends_with('/') {
            let with_slash = format!("{}/", base.path());
            base.set_path(&with_slash);
        }
        let mut url = base
            .join(&path)
            .map_err(|err| RouteProviderError::transport(format!("invalid route URL: {err}")))?;
        url.query_pairs_mut()
            .append_pair("overview", "full")
            .append_pair("geometries", "geojson");
        Ok(url)
    }
}

#[async_trait]
impl RouteProvider for OsrmRouteProvider {
    async fn route(
        &self,
        pickup: Coordinate,
        destination: Coordinate,
    ) -> Result<Route, RouteProviderError> {
        let url = self.route_url(pickup, destination)?;
        debug!(%url, "requesting route");
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status, body.as_ref()));
        }
        parse_route(body.as_ref())
    }
}

fn parse_route(body: &[u8]) -> Result<Route, RouteProviderError> {
    let decoded: OsrmResponseDto = serde_json::from_slice(body).map_err(|error| {
        RouteProviderError::decode(format!("invalid OSRM JSON payload: {error}"))
    })?;
    match decoded
        .into_domain_route()
        .map_err(RouteProviderError::decode)?
    {
        RouteMapping::Found(route) => Ok(route),
        RouteMapping::NoRoute => Err(RouteProviderError::no_route()),
    }
}

fn map_transport_error(error: reqwest::Error) -> RouteProviderError {
    if error.is_timeout() {
        RouteProviderError::timeout(error.to_string())
    } else {
        RouteProviderError::transport(error.to_string())
    }
}

fn map_status_error(status: StatusCode, body: &[u8]) -> RouteProviderError {
    match status {
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            RouteProviderError::timeout(format!("status {}", status.as_u16()))
        }
        _ => RouteProviderError::status(status.as_u16(), body_preview(body)),
    }
}

fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}
