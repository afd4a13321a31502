//! Service configuration loaded via OrthoConfig.
//!
//! Every value can come from `DISPATCH_*` environment variables, a
//! configuration file or command-line flags. Unset values fall back to the
//! defaults below.

use std::net::SocketAddr;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use url::Url;

use crate::domain::{PricingConfig, RetryPolicy};
use crate::domain::event_publisher::{DEFAULT_PUBLISH_ATTEMPTS, DEFAULT_PUBLISH_BACKOFF};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_ROUTE_PROVIDER_URL: &str = "http://router.project-osrm.org";

/// Raised when a configured value cannot be used.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("invalid bind address {value}: {message}")]
    BindAddr { value: String, message: String },
    #[error("invalid route provider URL {value}: {message}")]
    RouteProviderUrl { value: String, message: String },
}

/// Runtime settings for the dispatch service.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "DISPATCH")]
pub struct DispatchSettings {
    /// Socket address for the HTTP and WebSocket listener.
    pub bind_addr: Option<String>,
    /// PostgreSQL URL; trips are kept in memory when unset.
    pub database_url: Option<String>,
    /// Base URL of the OSRM-compatible routing service.
    pub route_provider_url: Option<String>,
    /// Route request timeout in milliseconds.
    #[ortho_config(default = 5000)]
    pub route_provider_timeout_ms: u64,
    /// Price in cents per unit of route distance.
    pub price_per_distance_unit: Option<f64>,
    /// Price in cents per unit of route duration.
    pub price_per_time_unit: Option<f64>,
    /// Publish attempts before an event is reported as not published.
    pub publish_max_attempts: Option<u32>,
    /// Backoff before the first publish retry, in milliseconds.
    pub publish_backoff_ms: Option<u64>,
}

impl DispatchSettings {
    pub fn bind_addr(&self) -> Result<SocketAddr, SettingsError> {
        let value = self.bind_addr.as_deref().unwrap_or(DEFAULT_BIND_ADDR);
        value.parse().map_err(|err: std::net::AddrParseError| SettingsError::BindAddr {
            value: value.to_owned(),
            message: err.to_string(),
        })
    }

    pub fn database_url(&self) -> Option<&str> {
        self.database_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
    }

    pub fn route_provider_url(&self) -> Result<Url, SettingsError> {
        let value = self
            .route_provider_url
            .as_deref()
            .unwrap_or(DEFAULT_ROUTE_PROVIDER_URL);
        Url::parse(value).map_err(|err| SettingsError::RouteProviderUrl {
            value: value.to_owned(),
            message: err.to_string(),
        })
    }

    pub fn route_provider_timeout(&self) -> Duration {
        Duration::from_millis(self.route_provider_timeout_ms)
    }

    pub fn pricing(&self) -> PricingConfig {
        let defaults = PricingConfig::default();
        PricingConfig {
            price_per_distance_unit: self
                .price_per_distance_unit
                .unwrap_or(defaults.price_per_distance_unit),
            price_per_time_unit: self
                .price_per_time_unit
                .unwrap_or(defaults.price_per_time_unit),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.publish_max_attempts.unwrap_or(DEFAULT_PUBLISH_ATTEMPTS),
            self.publish_backoff_ms
                .map_or(DEFAULT_PUBLISH_BACKOFF, Duration::from_millis),
        )
    }
}
