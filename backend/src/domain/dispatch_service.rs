//! Rider-facing trip operations: the [`TripDispatch`] driving port.
//!
//! Composes the trip service with the event publisher. Trip state is
//! committed before any event is published; a publish that fails after retries
//! is reported back to the caller as a warning, never as an error.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::ports::{
    CancelTripRequest, PreviewTripRequest, StartTripRequest, TripDispatch, TripPreview,
    TripReceipt,
};
use crate::domain::{
    DispatchEvent, Error, EventPublisher, TripCreated, TripService, TripStatusChanged,
};

/// Default [`TripDispatch`] implementation.
pub struct TripDispatchService {
    trips: Arc<TripService>,
    publisher: Arc<EventPublisher>,
}

impl TripDispatchService {
    pub fn new(trips: Arc<TripService>, publisher: Arc<EventPublisher>) -> Self {
        Self { trips, publisher }
    }
}

#[async_trait]
impl TripDispatch for TripDispatchService {
    async fn preview_trip(&self, request: PreviewTripRequest) -> Result<TripPreview, Error> {
        self.trips
            .preview_trip(&request.rider_id, request.pickup, request.destination)
            .await
    }

    async fn start_trip(&self, request: StartTripRequest) -> Result<TripReceipt, Error> {
        let fare = self
            .trips
            .get_and_validate_fare(&request.fare_id, &request.rider_id)
            .await?;
        let trip = self.trips.create_trip(fare).await?;

        let outcome = self
            .publisher
            .publish(DispatchEvent::TripCreated(TripCreated { trip: trip.clone() }))
            .await;
        Ok(TripReceipt {
            trip,
            warnings: outcome.warning().into_iter().collect(),
        })
    }

    async fn cancel_trip(&self, request: CancelTripRequest) -> Result<TripReceipt, Error> {
        let outcome = self
            .trips
            .cancel_trip(&request.trip_id, &request.rider_id)
            .await?;
        if !outcome.is_applied() {
            return Ok(TripReceipt {
                trip: outcome.into_trip(),
                warnings: Vec::new(),
            });
        }

        let trip = outcome.into_trip();
        let published = self
            .publisher
            .publish(DispatchEvent::TripStatusChanged(TripStatusChanged {
                trip_id: trip.id,
                rider_id: trip.rider_id.clone(),
                driver_id: trip.driver.as_ref().map(|driver| driver.id.clone()),
                status: trip.status,
            }))
            .await;
        Ok(TripReceipt {
            trip,
            warnings: published.warning().into_iter().collect(),
        })
    }
}
