//! DTOs for decoding OSRM route responses.
//!
//! Only the first route is used. Geometry arrives as GeoJSON `[lon, lat]`
//! pairs and is mapped into domain coordinates in one pass.

use serde::Deserialize;

use crate::domain::{Coordinate, Route};

#[derive(Debug, Deserialize)]
pub(super) struct OsrmResponseDto {
    pub(super) code: Option<String>,
    #[serde(default)]
    pub(super) routes: Vec<OsrmRouteDto>,
}

#[derive(Debug, Deserialize)]
pub(super) struct OsrmRouteDto {
    pub(super) distance: f64,
    pub(super) duration: f64,
    pub(super) geometry: OsrmGeometryDto,
}

#[derive(Debug, Deserialize)]
pub(super) struct OsrmGeometryDto {
    #[serde(default)]
    pub(super) coordinates: Vec<[f64; 2]>,
}

/// Outcome of mapping a decoded response.
#[derive(Debug, PartialEq)]
pub(super) enum RouteMapping {
    Found(Route),
    NoRoute,
}

impl OsrmResponseDto {
    pub(super) fn into_domain_route(self) -> Result<RouteMapping, String> {
        if self.code.as_deref().is_some_and(|code| code != "Ok") {
            return Ok(RouteMapping::NoRoute);
        }
        let Some(route) = self.routes.into_iter().next() else {
            return Ok(RouteMapping::NoRoute);
        };
        if !route.distance.is_finite() || !route.duration.is_finite() {
            return Err("route metrics must be finite".to_owned());
        }
        let geometry = route
            .geometry
            .coordinates
            .into_iter()
            .map(|[longitude, latitude]| {
                Coordinate::new(latitude, longitude)
                    .map_err(|err| format!("invalid geometry point: {err}"))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(RouteMapping::Found(Route {
            distance: route.distance,
            duration: route.duration,
            geometry,
        }))
    }
}
