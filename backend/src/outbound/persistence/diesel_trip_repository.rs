//! PostgreSQL-backed `TripRepository` using Diesel.
//!
//! A unique constraint on `trips.fare_id` enforces single use of a quote.
//! Status updates filter on the expected status and return the written row;
//! when nothing matched, the trip is re-read to tell a missing trip from a
//! concurrent writer.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use tracing::warn;

use crate::domain::ports::{TripRepository, TripRepositoryError, TripUpdate};
use crate::domain::{FareId, RideFare, Trip, TripId, TripStatus};

use super::diesel_error_mapping::{map_diesel_error, map_pool_error, map_trip_insert_error};
use super::models::{
    FareRow, NewFareRow, NewTripRow, RowConversionError, TripChangeset, TripRow, driver_json,
};
use super::pool::DbPool;
use super::schema::{ride_fares, trips};

/// Diesel implementation of [`TripRepository`].
#[derive(Clone)]
pub struct DieselTripRepository {
    pool: DbPool,
}

impl DieselTripRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_conversion_error(error: RowConversionError) -> TripRepositoryError {
    warn!(error = %error, "stored trip data failed to convert");
    TripRepositoryError::query(format!("corrupt trip data: {error}"))
}

async fn load_trip(
    conn: &mut AsyncPgConnection,
    trip_id: &TripId,
) -> Result<Option<Trip>, TripRepositoryError> {
    let row: Option<(TripRow, FareRow)> = trips::table
        .inner_join(ride_fares::table)
        .filter(trips::id.eq(trip_id.as_uuid()))
        .select((TripRow::as_select(), FareRow::as_select()))
        .first(conn)
        .await
        .optional()
        .map_err(map_diesel_error)?;

    row.map(|(trip, fare)| trip.into_trip(fare))
        .transpose()
        .map_err(map_conversion_error)
}

/// Explain why a compare-and-set matched no row.
async fn cas_failure(
    conn: &mut AsyncPgConnection,
    trip_id: TripId,
    expected: TripStatus,
) -> TripRepositoryError {
    let current: Result<Option<TripRow>, _> = trips::table
        .filter(trips::id.eq(trip_id.as_uuid()))
        .select(TripRow::as_select())
        .first(conn)
        .await
        .optional()
        .map_err(map_diesel_error);

    match current {
        Ok(Some(row)) => match row.status() {
            Ok(actual) => TripRepositoryError::status_mismatch(expected, actual),
            Err(err) => map_conversion_error(err),
        },
        Ok(None) => TripRepositoryError::trip_not_found(trip_id),
        Err(err) => err,
    }
}

#[async_trait]
impl TripRepository for DieselTripRepository {
    async fn create_trip(&self, trip: &Trip) -> Result<(), TripRepositoryError> {
        let row = NewTripRow::from_domain(trip).map_err(map_conversion_error)?;
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        diesel::insert_into(trips::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(|err| map_trip_insert_error(err, trip.id, trip.fare.id))
    }

    async fn find_trip(&self, trip_id: &TripId) -> Result<Option<Trip>, TripRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        load_trip(&mut conn, trip_id).await
    }

    async fn update_trip(&self, update: &TripUpdate) -> Result<Trip, TripRepositoryError> {
        let changes = TripChangeset {
            status: update.status.as_str(),
            driver: driver_json(update.driver.as_ref()).map_err(map_conversion_error)?,
        };
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let updated = diesel::update(
            trips::table
                .filter(trips::id.eq(update.trip_id.as_uuid()))
                .filter(trips::status.eq(update.expected_status.as_str())),
        )
        .set((&changes, trips::updated_at.eq(diesel::dsl::now)))
        .execute(&mut conn)
        .await
        .map_err(map_diesel_error)?;

        if updated == 0 {
            return Err(cas_failure(&mut conn, update.trip_id, update.expected_status).await);
        }
        load_trip(&mut conn, &update.trip_id)
            .await?
            .ok_or_else(|| TripRepositoryError::trip_not_found(update.trip_id))
    }

    async fn save_fares(&self, fares: &[RideFare]) -> Result<(), TripRepositoryError> {
        if fares.is_empty() {
            return Ok(());
        }
        let rows = fares
            .iter()
            .map(NewFareRow::from_domain)
            .collect::<Result<Vec<_>, _>>()
            .map_err(map_conversion_error)?;
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        // A single multi-row insert commits all quotes or none.
        diesel::insert_into(ride_fares::table)
            .values(&rows)
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn find_fare(&self, fare_id: &FareId) -> Result<Option<RideFare>, TripRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row: Option<FareRow> = ride_fares::table
            .filter(ride_fares::id.eq(fare_id.as_uuid()))
            .select(FareRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        row.map(RideFare::try_from)
            .transpose()
            .map_err(map_conversion_error)
    }
}
