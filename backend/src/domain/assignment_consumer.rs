//! Standing subscriber on driver-origin events.
//!
//! Acceptances are matched first-come-first-served among drivers of the
//! trip's package category: the first acceptance to move a trip out of
//! `pending` wins, a repeat by the same driver is a no-op
//! and a different driver gets a conflict that the consumer loop logs and
//! acks. Progress reports and location updates are only honoured for the
//! driver the trip is assigned to.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info};

use crate::domain::consumer::DeliveryHandler;
use crate::domain::notifications::client_message;
use crate::domain::{
    ClientMessageKind, DispatchEvent, DriverAccepted, DriverAssigned, DriverId, DriverLocation,
    DriverStatusReported, Error, EventEnvelope, EventPublisher, NotificationHub, Trip, TripId,
    TripService, TripStatus, TripStatusChanged, UpdateOutcome,
};

/// Rider-facing driver position.
#[derive(Debug, Serialize)]
struct LocationUpdate<'a> {
    #[serde(rename = "tripID")]
    trip_id: String,
    #[serde(rename = "driverID")]
    driver_id: &'a DriverId,
    latitude: f64,
    longitude: f64,
}

/// Applies driver acceptances, progress reports and locations.
pub struct DriverAssignmentConsumer {
    trips: Arc<TripService>,
    publisher: Arc<EventPublisher>,
    hub: Arc<NotificationHub>,
}

impl DriverAssignmentConsumer {
    pub fn new(
        trips: Arc<TripService>,
        publisher: Arc<EventPublisher>,
        hub: Arc<NotificationHub>,
    ) -> Self {
        Self {
            trips,
            publisher,
            hub,
        }
    }

    async fn on_accepted(&self, event: &DriverAccepted) -> Result<(), Error> {
        let requested = self.trips.get_trip(&event.trip_id).await?.fare.package;
        if event.driver.package != requested {
            return Err(Error::invalid_request(format!(
                "driver {} serves {} but trip {} needs {}",
                event.driver.id, event.driver.package, event.trip_id, requested
            )));
        }
        let outcome = self
            .trips
            .update_trip(
                &event.trip_id,
                TripStatus::Assigned,
                Some(event.driver.clone()),
            )
            .await?;

        let UpdateOutcome::Applied(trip) = outcome else {
            debug!(trip_id = %event.trip_id, driver_id = %event.driver.id, "assignment already recorded");
            return Ok(());
        };
        info!(trip_id = %trip.id, driver_id = %event.driver.id, "driver assigned");

        self.publisher
            .publish(DispatchEvent::DriverAssigned(DriverAssigned {
                trip_id: trip.id,
                rider_id: trip.rider_id.clone(),
                driver: event.driver.clone(),
                package: trip.fare.package,
            }))
            .await;
        Ok(())
    }

    async fn assigned_trip(&self, trip_id: &TripId, driver_id: &DriverId) -> Result<Trip, Error> {
        let trip = self.trips.get_trip(trip_id).await?;
        match &trip.driver {
            Some(driver) if &driver.id == driver_id => Ok(trip),
            _ => Err(Error::forbidden(format!(
                "trip {trip_id} is not assigned to driver {driver_id}"
            ))),
        }
    }

    async fn on_status(&self, event: &DriverStatusReported) -> Result<(), Error> {
        if !matches!(
            event.status,
            TripStatus::Ongoing | TripStatus::Completed | TripStatus::Cancelled
        ) {
            return Err(Error::invalid_request(format!(
                "drivers cannot report status {}",
                event.status
            )));
        }
        self.assigned_trip(&event.trip_id, &event.driver_id).await?;

        let outcome = self
            .trips
            .update_trip(&event.trip_id, event.status, None)
            .await?;
        let UpdateOutcome::Applied(trip) = outcome else {
            debug!(trip_id = %event.trip_id, status = %event.status, "status already recorded");
            return Ok(());
        };
        info!(trip_id = %trip.id, driver_id = %event.driver_id, status = %trip.status, "trip status changed");

        self.publisher
            .publish(DispatchEvent::TripStatusChanged(TripStatusChanged {
                trip_id: trip.id,
                rider_id: trip.rider_id.clone(),
                driver_id: Some(event.driver_id.clone()),
                status: trip.status,
            }))
            .await;
        Ok(())
    }

    async fn on_location(&self, event: &DriverLocation) -> Result<(), Error> {
        let trip = self.assigned_trip(&event.trip_id, &event.driver_id).await?;
        if !matches!(trip.status, TripStatus::Assigned | TripStatus::Ongoing) {
            debug!(trip_id = %trip.id, status = %trip.status, "location outside active trip ignored");
            return Ok(());
        }
        let message = client_message(
            ClientMessageKind::DriverLocation,
            &LocationUpdate {
                trip_id: trip.id.to_string(),
                driver_id: &event.driver_id,
                latitude: event.location.latitude(),
                longitude: event.location.longitude(),
            },
        )?;
        self.hub.notify_rider(&trip.rider_id, &message).await;
        Ok(())
    }
}

#[async_trait]
impl DeliveryHandler for DriverAssignmentConsumer {
    fn name(&self) -> &'static str {
        "driver-assignment"
    }

    async fn handle(&self, envelope: &EventEnvelope) -> Result<(), Error> {
        match &envelope.event {
            DispatchEvent::DriverAccepted(event) => self.on_accepted(event).await,
            DispatchEvent::DriverStatusReported(event) => self.on_status(event).await,
            DispatchEvent::DriverLocation(event) => self.on_location(event).await,
            other => {
                debug!(kind = %other.kind(), "ignoring event");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
#[path = "assignment_consumer_tests.rs"]
mod tests;
