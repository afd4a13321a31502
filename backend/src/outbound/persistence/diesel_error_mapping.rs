//! Diesel error mapping for the trip repository.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::debug;

use crate::domain::ports::TripRepositoryError;
use crate::domain::{FareId, TripId};

use super::pool::PoolError;

/// Unique constraint guarding single use of a fare.
pub(super) const FARE_UNIQUE_CONSTRAINT: &str = "trips_fare_id_key";

pub(super) fn map_pool_error(error: PoolError) -> TripRepositoryError {
    TripRepositoryError::connection(error.message())
}

pub(super) fn map_diesel_error(error: DieselError) -> TripRepositoryError {
    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), "diesel operation failed");
        }
        _ => debug!(error = %error, "diesel operation failed"),
    }

    match error {
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            TripRepositoryError::connection("database connection closed")
        }
        DieselError::NotFound => TripRepositoryError::query("record not found"),
        DieselError::QueryBuilderError(_) => TripRepositoryError::query("database query error"),
        _ => TripRepositoryError::query("database error"),
    }
}

/// Map an insert failure, translating unique violations into the
/// corresponding domain conflict.
pub(super) fn map_trip_insert_error(
    error: DieselError,
    trip_id: TripId,
    fare_id: FareId,
) -> TripRepositoryError {
    if let DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) = &error {
        return if info.constraint_name() == Some(FARE_UNIQUE_CONSTRAINT) {
            TripRepositoryError::fare_already_consumed(fare_id)
        } else {
            TripRepositoryError::duplicate_trip(trip_id)
        };
    }
    map_diesel_error(error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn pool_errors_become_connection_errors() {
        let mapped = map_pool_error(PoolError::checkout("timed out"));
        assert_eq!(mapped, TripRepositoryError::connection("timed out"));
    }

    #[rstest]
    #[case(DieselError::NotFound)]
    #[case(DieselError::RollbackTransaction)]
    fn other_failures_become_query_errors(#[case] error: DieselError) {
        assert!(matches!(
            map_diesel_error(error),
            TripRepositoryError::Query { .. }
        ));
    }

    #[rstest]
    fn non_unique_insert_failures_fall_through() {
        let mapped = map_trip_insert_error(DieselError::NotFound, TripId::random(), FareId::random());
        assert!(matches!(mapped, TripRepositoryError::Query { .. }));
    }
}
