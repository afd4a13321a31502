//! Coordinates and the route snapshot returned by the route provider.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Errors raised when a coordinate falls outside the valid range.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CoordinateError {
    #[error("latitude must be a finite value within [-90, 90], got {0}")]
    Latitude(f64),
    #[error("longitude must be a finite value within [-180, 180], got {0}")]
    Longitude(f64),
}

/// A validated latitude/longitude pair.
///
/// # Examples
/// ```
/// use dispatch::domain::Coordinate;
///
/// let pickup = Coordinate::new(52.52, 13.405).expect("valid coordinate");
/// assert_eq!(pickup.latitude(), 52.52);
/// assert!(Coordinate::new(91.0, 0.0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(try_from = "CoordinateDto", into = "CoordinateDto")]
pub struct Coordinate {
    latitude: f64,
    longitude: f64,
}

impl Coordinate {
    /// Validate and construct a coordinate.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CoordinateError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(CoordinateError::Latitude(latitude));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(CoordinateError::Longitude(longitude));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct CoordinateDto {
    latitude: f64,
    longitude: f64,
}

impl From<Coordinate> for CoordinateDto {
    fn from(value: Coordinate) -> Self {
        Self {
            latitude: value.latitude,
            longitude: value.longitude,
        }
    }
}

impl TryFrom<CoordinateDto> for Coordinate {
    type Error = CoordinateError;

    fn try_from(value: CoordinateDto) -> Result<Self, Self::Error> {
        Self::new(value.latitude, value.longitude)
    }
}

/// Route snapshot copied into every fare quote.
///
/// Distance and duration keep the provider's units (metres and seconds for
/// OSRM); pricing multiplies them directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub distance: f64,
    pub duration: f64,
    pub geometry: Vec<Coordinate>,
}
