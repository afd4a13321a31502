//! Port for trip and fare quote persistence.
//!
//! Implementations must be safe under concurrent use and give
//! read-your-write visibility. Updates are compare-and-set on the expected
//! current status, which serialises concurrent mutations of one trip without
//! lost updates. A fare backs at most one trip.

use async_trait::async_trait;

use crate::domain::{Driver, FareId, RideFare, Trip, TripId, TripStatus};

use super::define_port_error;

define_port_error! {
    /// Errors raised by trip repository adapters.
    pub enum TripRepositoryError {
        /// Repository connection could not be established.
        [transient]
        Connection { message: String } =>
            "trip repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "trip repository query failed: {message}",
        /// The trip to update does not exist.
        TripNotFound { trip_id: TripId } =>
            "trip {trip_id} not found",
        /// Another writer changed the trip since it was read.
        StatusMismatch { expected: TripStatus, actual: TripStatus } =>
            "trip status changed concurrently: expected {expected}, found {actual}",
        /// The fare already backs another trip.
        FareAlreadyConsumed { fare_id: FareId } =>
            "fare {fare_id} has already been used for a trip",
        /// A trip with the same id already exists.
        DuplicateTrip { trip_id: TripId } =>
            "trip {trip_id} already exists",
    }
}

/// Compare-and-set update of a trip's status and driver.
#[derive(Debug, Clone, PartialEq)]
pub struct TripUpdate {
    pub trip_id: TripId,
    /// Status the caller observed; the write fails if it no longer holds.
    pub expected_status: TripStatus,
    pub status: TripStatus,
    /// Driver to store; `None` keeps the stored driver.
    pub driver: Option<Driver>,
}

/// Port for reading and writing trips and fare quotes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TripRepository: Send + Sync {
    /// Persist a new trip. Fails if the id or fare is already in use.
    async fn create_trip(&self, trip: &Trip) -> Result<(), TripRepositoryError>;

    /// Find a trip by id.
    async fn find_trip(&self, trip_id: &TripId) -> Result<Option<Trip>, TripRepositoryError>;

    /// Apply a compare-and-set update and return the stored trip.
    async fn update_trip(&self, update: &TripUpdate) -> Result<Trip, TripRepositoryError>;

    /// Persist a batch of quotes atomically: all or none become visible.
    async fn save_fares(&self, fares: &[RideFare]) -> Result<(), TripRepositoryError>;

    /// Find a quote by id.
    async fn find_fare(&self, fare_id: &FareId) -> Result<Option<RideFare>, TripRepositoryError>;
}
