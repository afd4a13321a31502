//! Trip domain service: fare quoting, fare validation and the trip state
//! machine.
//!
//! All trip mutations go through [`TripService::update_trip`], which reads
//! the trip, plans the transition and writes it back with a compare-and-set
//! on the observed status. A lost race re-reads and re-plans, so concurrent
//! updates to one trip are linearised by the repository.

use std::sync::Arc;

use mockable::Clock;
use serde_json::json;
use tracing::{debug, warn};

use crate::domain::ports::{
    RouteProvider, RouteProviderError, TripPreview, TripRepository, TripRepositoryError,
    TripUpdate,
};
use crate::domain::{
    Coordinate, Driver, Error, FareId, PricingConfig, RideFare, RiderId, TransitionError,
    TransitionPlan, Trip, TripId, TripStatus,
};

/// Compare-and-set attempts before an update is reported as a conflict.
const MAX_UPDATE_ATTEMPTS: usize = 4;

/// Result of [`TripService::update_trip`].
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    /// The trip was changed by this call.
    Applied(Trip),
    /// The trip already reflected the request; nothing was written.
    AlreadyApplied(Trip),
}

impl UpdateOutcome {
    pub fn trip(&self) -> &Trip {
        match self {
            Self::Applied(trip) | Self::AlreadyApplied(trip) => trip,
        }
    }

    pub fn into_trip(self) -> Trip {
        match self {
            Self::Applied(trip) | Self::AlreadyApplied(trip) => trip,
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }
}

pub(crate) fn map_repository_error(error: TripRepositoryError) -> Error {
    match error {
        TripRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("trip repository unavailable: {message}"))
        }
        TripRepositoryError::Query { message } => {
            Error::internal(format!("trip repository error: {message}"))
        }
        TripRepositoryError::TripNotFound { trip_id } => {
            Error::not_found(format!("trip {trip_id} not found"))
        }
        err @ (TripRepositoryError::StatusMismatch { .. }
        | TripRepositoryError::FareAlreadyConsumed { .. }) => Error::conflict(err.to_string()),
        TripRepositoryError::DuplicateTrip { trip_id } => {
            Error::internal(format!("trip id {trip_id} allocated twice"))
        }
    }
}

fn map_route_error(error: RouteProviderError) -> Error {
    warn!(error = %error, "route provider call failed");
    match error {
        RouteProviderError::NoRoute => {
            Error::service_unavailable("no route found between pickup and destination")
        }
        other => Error::service_unavailable("route provider unavailable")
            .with_details(json!({ "cause": other.to_string() })),
    }
}

fn map_transition_error(trip_id: TripId, error: TransitionError) -> Error {
    let mapped = match error {
        TransitionError::DriverMismatch { .. } => Error::conflict(error.to_string()),
        TransitionError::Illegal { .. } | TransitionError::DriverRequired => {
            Error::invalid_request(error.to_string())
        }
    };
    mapped.with_details(json!({ "tripID": trip_id }))
}

/// Trip domain service over a repository and a route provider.
pub struct TripService<R: ?Sized = dyn TripRepository, P: ?Sized = dyn RouteProvider> {
    trips: Arc<R>,
    routes: Arc<P>,
    pricing: PricingConfig,
    clock: Arc<dyn Clock>,
}

impl<R, P> TripService<R, P>
where
    R: TripRepository + ?Sized,
    P: RouteProvider + ?Sized,
{
    /// Create a service from its ports and pricing.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    /// use mockable::DefaultClock;
    /// use dispatch::domain::{PricingConfig, TripService};
    /// use dispatch::domain::ports::FixtureRouteProvider;
    /// use dispatch::outbound::memory::InMemoryTripRepository;
    ///
    /// let service = TripService::new(
    ///     Arc::new(InMemoryTripRepository::default()),
    ///     Arc::new(FixtureRouteProvider::default()),
    ///     PricingConfig::default(),
    ///     Arc::new(DefaultClock),
    /// );
    /// # let _ = service;
    /// ```
    pub fn new(trips: Arc<R>, routes: Arc<P>, pricing: PricingConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            trips,
            routes,
            pricing,
            clock,
        }
    }

    /// Fetch a route, quote every package and persist the quotes in one
    /// atomic call before returning them.
    pub async fn preview_trip(
        &self,
        rider_id: &RiderId,
        pickup: Coordinate,
        destination: Coordinate,
    ) -> Result<TripPreview, Error> {
        let route = self
            .routes
            .route(pickup, destination)
            .await
            .map_err(map_route_error)?;

        let fares = self.pricing.quote_all(rider_id, &route);
        self.trips
            .save_fares(&fares)
            .await
            .map_err(map_repository_error)?;

        debug!(rider_id = %rider_id, quotes = fares.len(), "fares quoted");
        Ok(TripPreview { route, fares })
    }

    /// Load a quote and check it belongs to the rider.
    pub async fn get_and_validate_fare(
        &self,
        fare_id: &FareId,
        rider_id: &RiderId,
    ) -> Result<RideFare, Error> {
        let fare = self
            .trips
            .find_fare(fare_id)
            .await
            .map_err(map_repository_error)?
            .ok_or_else(|| Error::not_found("fare does not exist"))?;

        if &fare.rider_id != rider_id {
            return Err(Error::forbidden("fare does not belong to the user"));
        }
        Ok(fare)
    }

    /// Create a pending trip from a validated quote.
    pub async fn create_trip(&self, fare: RideFare) -> Result<Trip, Error> {
        let trip = Trip::pending(TripId::random(), fare, self.clock.utc());
        self.trips
            .create_trip(&trip)
            .await
            .map_err(map_repository_error)?;
        debug!(trip_id = %trip.id, rider_id = %trip.rider_id, "trip created");
        Ok(trip)
    }

    /// Read a trip.
    pub async fn get_trip(&self, trip_id: &TripId) -> Result<Trip, Error> {
        self.trips
            .find_trip(trip_id)
            .await
            .map_err(map_repository_error)?
            .ok_or_else(|| Error::not_found(format!("trip {trip_id} not found")))
    }

    /// Move a trip to `status`, attaching `driver` when entering `assigned`.
    ///
    /// Requests the trip already satisfies return
    /// [`UpdateOutcome::AlreadyApplied`] without writing.
    pub async fn update_trip(
        &self,
        trip_id: &TripId,
        status: TripStatus,
        driver: Option<Driver>,
    ) -> Result<UpdateOutcome, Error> {
        for attempt in 1..=MAX_UPDATE_ATTEMPTS {
            let trip = self.get_trip(trip_id).await?;
            match trip
                .plan_transition(status, driver.as_ref())
                .map_err(|err| map_transition_error(*trip_id, err))?
            {
                TransitionPlan::AlreadySatisfied => return Ok(UpdateOutcome::AlreadyApplied(trip)),
                TransitionPlan::Apply => {}
            }

            let update = TripUpdate {
                trip_id: *trip_id,
                expected_status: trip.status,
                status,
                driver: (status == TripStatus::Assigned)
                    .then(|| driver.clone())
                    .flatten(),
            };
            match self.trips.update_trip(&update).await {
                Ok(updated) => return Ok(UpdateOutcome::Applied(updated)),
                Err(TripRepositoryError::StatusMismatch { expected, actual }) => {
                    debug!(
                        trip_id = %trip_id,
                        attempt,
                        %expected,
                        %actual,
                        "trip changed concurrently; re-planning"
                    );
                }
                Err(err) => return Err(map_repository_error(err)),
            }
        }
        Err(Error::conflict(format!(
            "trip {trip_id} kept changing while applying {status}"
        )))
    }

    /// Cancel a trip on behalf of its rider.
    pub async fn cancel_trip(
        &self,
        trip_id: &TripId,
        rider_id: &RiderId,
    ) -> Result<UpdateOutcome, Error> {
        let trip = self.get_trip(trip_id).await?;
        if &trip.rider_id != rider_id {
            return Err(Error::forbidden("trip does not belong to the user"));
        }
        self.update_trip(trip_id, TripStatus::Cancelled, None).await
    }
}

#[cfg(test)]
#[path = "trip_service_tests.rs"]
mod tests;
