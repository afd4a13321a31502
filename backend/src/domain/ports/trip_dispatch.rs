//! Driving port for the rider-facing trip RPCs.

use async_trait::async_trait;

use crate::domain::{Coordinate, Error, FareId, RideFare, RiderId, Route, Trip, TripId};

/// Request a route and a quote per package.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewTripRequest {
    pub rider_id: RiderId,
    pub pickup: Coordinate,
    pub destination: Coordinate,
}

/// Route plus the persisted quotes for it.
#[derive(Debug, Clone, PartialEq)]
pub struct TripPreview {
    pub route: Route,
    pub fares: Vec<RideFare>,
}

/// Start a trip from a previously quoted fare.
#[derive(Debug, Clone, PartialEq)]
pub struct StartTripRequest {
    pub fare_id: FareId,
    pub rider_id: RiderId,
}

/// Rider-initiated cancellation.
#[derive(Debug, Clone, PartialEq)]
pub struct CancelTripRequest {
    pub trip_id: TripId,
    pub rider_id: RiderId,
}

/// Committed trip plus non-fatal warnings (for example a failed publish).
#[derive(Debug, Clone, PartialEq)]
pub struct TripReceipt {
    pub trip: Trip,
    pub warnings: Vec<String>,
}

/// Rider-facing trip operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TripDispatch: Send + Sync {
    /// Quote every package for a route between the two coordinates.
    async fn preview_trip(&self, request: PreviewTripRequest) -> Result<TripPreview, Error>;

    /// Validate the fare, create a pending trip and announce it.
    async fn start_trip(&self, request: StartTripRequest) -> Result<TripReceipt, Error>;

    /// Cancel a pending or assigned trip owned by the rider.
    async fn cancel_trip(&self, request: CancelTripRequest) -> Result<TripReceipt, Error>;
}
