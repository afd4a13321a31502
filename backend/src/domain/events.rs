//! Broker event contract.
//!
//! Every event travels inside an [`EventEnvelope`] carrying an id, the
//! occurrence time and the originating trace id. Payloads hold enough context
//! (trip, rider, driver, package) for consumers to act without calling back
//! into the producer.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Coordinate, Driver, DriverId, PackageCategory, RiderId, Trip, TripId, TripStatus};

/// Routing key of an event on the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    TripCreated,
    DriverAssigned,
    TripStatusChanged,
    DriverAccepted,
    DriverStatusReported,
    DriverLocation,
}

impl EventKind {
    /// Trip lifecycle facts emitted by the dispatch side.
    pub const TRIP_LIFECYCLE: [Self; 3] = [
        Self::TripCreated,
        Self::DriverAssigned,
        Self::TripStatusChanged,
    ];

    /// Events originating from driver connections.
    pub const DRIVER_ORIGIN: [Self; 3] = [
        Self::DriverAccepted,
        Self::DriverStatusReported,
        Self::DriverLocation,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::TripCreated => "trip.created",
            Self::DriverAssigned => "trip.driver.assigned",
            Self::TripStatusChanged => "trip.status.changed",
            Self::DriverAccepted => "driver.trip.accepted",
            Self::DriverStatusReported => "driver.trip.status",
            Self::DriverLocation => "driver.location",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A trip was created from a consumed fare and awaits a driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripCreated {
    pub trip: Trip,
}

/// A driver was attached to a trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverAssigned {
    #[serde(rename = "tripID")]
    pub trip_id: TripId,
    #[serde(rename = "userID")]
    pub rider_id: RiderId,
    pub driver: Driver,
    #[serde(rename = "packageSlug")]
    pub package: PackageCategory,
}

/// A trip moved to a post-assignment status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripStatusChanged {
    #[serde(rename = "tripID")]
    pub trip_id: TripId,
    #[serde(rename = "userID")]
    pub rider_id: RiderId,
    #[serde(rename = "driverID")]
    pub driver_id: Option<DriverId>,
    pub status: TripStatus,
}

/// A driver accepted a trip request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverAccepted {
    #[serde(rename = "tripID")]
    pub trip_id: TripId,
    pub driver: Driver,
}

/// A driver reported progress on a trip they hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverStatusReported {
    #[serde(rename = "tripID")]
    pub trip_id: TripId,
    #[serde(rename = "driverID")]
    pub driver_id: DriverId,
    pub status: TripStatus,
}

/// A driver shared their position while serving a trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverLocation {
    #[serde(rename = "tripID")]
    pub trip_id: TripId,
    #[serde(rename = "driverID")]
    pub driver_id: DriverId,
    pub location: Coordinate,
}

/// Typed event payloads keyed by their wire kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data")]
pub enum DispatchEvent {
    #[serde(rename = "trip.created")]
    TripCreated(TripCreated),
    #[serde(rename = "trip.driver.assigned")]
    DriverAssigned(DriverAssigned),
    #[serde(rename = "trip.status.changed")]
    TripStatusChanged(TripStatusChanged),
    #[serde(rename = "driver.trip.accepted")]
    DriverAccepted(DriverAccepted),
    #[serde(rename = "driver.trip.status")]
    DriverStatusReported(DriverStatusReported),
    #[serde(rename = "driver.location")]
    DriverLocation(DriverLocation),
}

impl DispatchEvent {
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::TripCreated(_) => EventKind::TripCreated,
            Self::DriverAssigned(_) => EventKind::DriverAssigned,
            Self::TripStatusChanged(_) => EventKind::TripStatusChanged,
            Self::DriverAccepted(_) => EventKind::DriverAccepted,
            Self::DriverStatusReported(_) => EventKind::DriverStatusReported,
            Self::DriverLocation(_) => EventKind::DriverLocation,
        }
    }

    /// Trip the event refers to.
    #[must_use]
    pub fn trip_id(&self) -> TripId {
        match self {
            Self::TripCreated(event) => event.trip.id,
            Self::DriverAssigned(event) => event.trip_id,
            Self::TripStatusChanged(event) => event.trip_id,
            Self::DriverAccepted(event) => event.trip_id,
            Self::DriverStatusReported(event) => event.trip_id,
            Self::DriverLocation(event) => event.trip_id,
        }
    }
}

/// Broker envelope around a [`DispatchEvent`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope {
    pub id: Uuid,
    pub occurred_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<Uuid>,
    pub event: DispatchEvent,
}

impl EventEnvelope {
    /// Wrap an event with a fresh id.
    #[must_use]
    pub fn new(event: DispatchEvent, occurred_at: DateTime<Utc>, trace_id: Option<Uuid>) -> Self {
        Self {
            id: Uuid::new_v4(),
            occurred_at,
            trace_id,
            event,
        }
    }

    #[must_use]
    pub fn kind(&self) -> EventKind {
        self.event.kind()
    }
}
