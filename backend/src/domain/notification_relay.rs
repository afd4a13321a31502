//! Standing subscriber turning trip lifecycle events into client pushes.
//!
//! Delivery to clients is best effort: a missing or dead connection is
//! handled by the hub, so the relay never asks for redelivery.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info};

use crate::domain::consumer::DeliveryHandler;
use crate::domain::notifications::client_message;
use crate::domain::{
    ClientMessageKind, DispatchEvent, DriverAssigned, Error, EventEnvelope, NotificationHub,
    TripCreated, TripStatusChanged,
};

/// Status push shared by riders and drivers.
#[derive(Debug, Serialize)]
struct StatusUpdate<'a> {
    #[serde(rename = "tripID")]
    trip_id: String,
    status: &'a str,
}

/// Pushes trip lifecycle changes to the riders and drivers involved.
pub struct NotificationRelay {
    hub: Arc<NotificationHub>,
}

impl NotificationRelay {
    pub fn new(hub: Arc<NotificationHub>) -> Self {
        Self { hub }
    }

    async fn on_created(&self, event: &TripCreated) -> Result<(), Error> {
        let trip = &event.trip;
        let created = client_message(ClientMessageKind::TripCreated, trip)?;
        self.hub.notify_rider(&trip.rider_id, &created).await;

        let request = client_message(ClientMessageKind::TripRequest, trip)?;
        let package = trip.fare.package;
        let report = self
            .hub
            .broadcast_to_drivers(|_, offered| offered == Some(package), &request)
            .await;
        info!(
            trip_id = %trip.id,
            %package,
            delivered = report.delivered,
            failed = report.failed,
            "trip offered to drivers"
        );
        Ok(())
    }

    async fn on_assigned(&self, event: &DriverAssigned) -> Result<(), Error> {
        let to_rider = client_message(ClientMessageKind::DriverAssigned, event)?;
        self.hub.notify_rider(&event.rider_id, &to_rider).await;

        let to_driver = client_message(ClientMessageKind::TripAssigned, event)?;
        self.hub.notify_driver(&event.driver.id, &to_driver).await;
        Ok(())
    }

    async fn on_status(&self, event: &TripStatusChanged) -> Result<(), Error> {
        let message = client_message(
            ClientMessageKind::TripStatusChanged,
            &StatusUpdate {
                trip_id: event.trip_id.to_string(),
                status: event.status.as_str(),
            },
        )?;
        self.hub.notify_rider(&event.rider_id, &message).await;
        if let Some(driver_id) = &event.driver_id {
            self.hub.notify_driver(driver_id, &message).await;
        }
        Ok(())
    }
}

#[async_trait]
impl DeliveryHandler for NotificationRelay {
    fn name(&self) -> &'static str {
        "notification-relay"
    }

    async fn handle(&self, envelope: &EventEnvelope) -> Result<(), Error> {
        match &envelope.event {
            DispatchEvent::TripCreated(event) => self.on_created(event).await,
            DispatchEvent::DriverAssigned(event) => self.on_assigned(event).await,
            DispatchEvent::TripStatusChanged(event) => self.on_status(event).await,
            other => {
                debug!(kind = %other.kind(), "ignoring event");
                Ok(())
            }
        }
    }
}
