//! Port for the external routing engine.

use async_trait::async_trait;

use crate::domain::{Coordinate, Route};

use super::define_port_error;

define_port_error! {
    /// Errors raised by route provider adapters.
    pub enum RouteProviderError {
        /// Network or connection failure.
        [transient]
        Transport { message: String } => "route provider request failed: {message}",
        /// The provider did not answer in time.
        [transient]
        Timeout { message: String } => "route provider timed out: {message}",
        /// The provider answered with a non-success status.
        Status { status: u16, message: String } =>
            "route provider returned HTTP {status}: {message}",
        /// The response body could not be decoded.
        Decode { message: String } => "route provider response invalid: {message}",
        /// The provider found no route between the points.
        NoRoute => "route provider returned no route",
    }
}

/// Computes a driving route between two coordinates.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RouteProvider: Send + Sync {
    async fn route(
        &self,
        pickup: Coordinate,
        destination: Coordinate,
    ) -> Result<Route, RouteProviderError>;
}

/// Fixture provider returning a straight two-point route with fixed metrics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixtureRouteProvider {
    pub distance: f64,
    pub duration: f64,
}

impl Default for FixtureRouteProvider {
    fn default() -> Self {
        Self {
            distance: 5.0,
            duration: 10.0,
        }
    }
}

#[async_trait]
impl RouteProvider for FixtureRouteProvider {
    async fn route(
        &self,
        pickup: Coordinate,
        destination: Coordinate,
    ) -> Result<Route, RouteProviderError> {
        Ok(Route {
            distance: self.distance,
            duration: self.duration,
            geometry: vec![pickup, destination],
        })
    }
}
