//! Diesel row structs and their conversions to domain records.
//!
//! Rows never leave the persistence layer. Conversions that can fail (a
//! status or package slug the domain does not know, malformed JSON) surface
//! as [`RowConversionError`] so the repository can report corrupt data
//! instead of panicking.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::{
    Driver, FareId, IdValidationError, PackageCategory, RideFare, RiderId, Route, Trip, TripId,
    TripStatus, UnknownPackageCategory, UnknownTripStatus,
};

use super::schema::{ride_fares, trips};

#[derive(Debug, thiserror::Error)]
pub(crate) enum RowConversionError {
    #[error(transparent)]
    Status(#[from] UnknownTripStatus),
    #[error(transparent)]
    Package(#[from] UnknownPackageCategory),
    #[error(transparent)]
    Id(#[from] IdValidationError),
    #[error("invalid {column} JSON: {source}")]
    Json {
        column: &'static str,
        source: serde_json::Error,
    },
}

impl RowConversionError {
    fn json(column: &'static str, source: serde_json::Error) -> Self {
        Self::Json { column, source }
    }
}

/// Row read from `ride_fares`.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = ride_fares)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct FareRow {
    pub id: Uuid,
    pub rider_id: String,
    pub package_slug: String,
    pub total_price_cents: f64,
    pub route: serde_json::Value,
}

impl TryFrom<FareRow> for RideFare {
    type Error = RowConversionError;

    fn try_from(row: FareRow) -> Result<Self, Self::Error> {
        let route: Route = serde_json::from_value(row.route)
            .map_err(|err| RowConversionError::json("route", err))?;
        Ok(Self {
            id: FareId::from_uuid(row.id),
            rider_id: RiderId::new(row.rider_id)?,
            package: row.package_slug.parse::<PackageCategory>()?,
            total_price_cents: row.total_price_cents,
            route,
        })
    }
}

/// Insertable quote. `created_at` takes the column default.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = ride_fares)]
pub(crate) struct NewFareRow<'a> {
    pub id: Uuid,
    pub rider_id: &'a str,
    pub package_slug: &'a str,
    pub total_price_cents: f64,
    pub route: serde_json::Value,
}

impl<'a> NewFareRow<'a> {
    pub(crate) fn from_domain(fare: &'a RideFare) -> Result<Self, RowConversionError> {
        Ok(Self {
            id: *fare.id.as_uuid(),
            rider_id: fare.rider_id.as_ref(),
            package_slug: fare.package.as_str(),
            total_price_cents: fare.total_price_cents,
            route: serde_json::to_value(&fare.route)
                .map_err(|err| RowConversionError::json("route", err))?,
        })
    }
}

/// Row read from `trips`.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = trips)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct TripRow {
    pub id: Uuid,
    pub rider_id: String,
    pub fare_id: Uuid,
    pub status: String,
    pub driver: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl TripRow {
    pub(crate) fn status(&self) -> Result<TripStatus, RowConversionError> {
        Ok(self.status.parse::<TripStatus>()?)
    }

    /// Combine the trip row with the fare it consumed.
    pub(crate) fn into_trip(self, fare: FareRow) -> Result<Trip, RowConversionError> {
        let status = self.status()?;
        let driver = self
            .driver
            .map(serde_json::from_value::<Driver>)
            .transpose()
            .map_err(|err| RowConversionError::json("driver", err))?;
        Ok(Trip {
            id: TripId::from_uuid(self.id),
            rider_id: RiderId::new(self.rider_id)?,
            status,
            fare: RideFare::try_from(fare)?,
            driver,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = trips)]
pub(crate) struct NewTripRow<'a> {
    pub id: Uuid,
    pub rider_id: &'a str,
    pub fare_id: Uuid,
    pub status: &'a str,
    pub driver: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl<'a> NewTripRow<'a> {
    pub(crate) fn from_domain(trip: &'a Trip) -> Result<Self, RowConversionError> {
        Ok(Self {
            id: *trip.id.as_uuid(),
            rider_id: trip.rider_id.as_ref(),
            fare_id: *trip.fare.id.as_uuid(),
            status: trip.status.as_str(),
            driver: driver_json(trip.driver.as_ref())?,
            created_at: trip.created_at,
        })
    }
}

/// Changeset for a compare-and-set update; a `None` driver leaves the
/// column untouched.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = trips)]
pub(crate) struct TripChangeset<'a> {
    pub status: &'a str,
    pub driver: Option<serde_json::Value>,
}

pub(crate) fn driver_json(
    driver: Option<&Driver>,
) -> Result<Option<serde_json::Value>, RowConversionError> {
    driver
        .map(serde_json::to_value)
        .transpose()
        .map_err(|err| RowConversionError::json("driver", err))
}
