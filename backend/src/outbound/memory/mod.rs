//! In-memory trip repository.
//!
//! Used when no database is configured and by the integration tests. All
//! state lives behind one lock so fare consumption, trip creation and
//! compare-and-set updates are each atomic.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::ports::{TripRepository, TripRepositoryError, TripUpdate};
use crate::domain::{FareId, RideFare, Trip, TripId};

#[derive(Default)]
struct Store {
    trips: HashMap<TripId, Trip>,
    fares: HashMap<FareId, RideFare>,
    /// Fare id to the trip it backs.
    consumed: HashMap<FareId, TripId>,
}

/// [`TripRepository`] backed by process memory.
#[derive(Default)]
pub struct InMemoryTripRepository {
    store: RwLock<Store>,
}

#[async_trait]
impl TripRepository for InMemoryTripRepository {
    async fn create_trip(&self, trip: &Trip) -> Result<(), TripRepositoryError> {
        let mut store = self.store.write().await;
        if store.trips.contains_key(&trip.id) {
            return Err(TripRepositoryError::duplicate_trip(trip.id));
        }
        if store.consumed.contains_key(&trip.fare.id) {
            return Err(TripRepositoryError::fare_already_consumed(trip.fare.id));
        }
        store.consumed.insert(trip.fare.id, trip.id);
        store.trips.insert(trip.id, trip.clone());
        Ok(())
    }

    async fn find_trip(&self, trip_id: &TripId) -> Result<Option<Trip>, TripRepositoryError> {
        Ok(self.store.read().await.trips.get(trip_id).cloned())
    }

    async fn update_trip(&self, update: &TripUpdate) -> Result<Trip, TripRepositoryError> {
        let mut store = self.store.write().await;
        let trip = store
            .trips
            .get_mut(&update.trip_id)
            .ok_or_else(|| TripRepositoryError::trip_not_found(update.trip_id))?;
        if trip.status != update.expected_status {
            return Err(TripRepositoryError::status_mismatch(
                update.expected_status,
                trip.status,
            ));
        }
        let updated = trip
            .clone()
            .with_transition(update.status, update.driver.clone());
        *trip = updated.clone();
        Ok(updated)
    }

    async fn save_fares(&self, fares: &[RideFare]) -> Result<(), TripRepositoryError> {
        let mut store = self.store.write().await;
        store
            .fares
            .extend(fares.iter().map(|fare| (fare.id, fare.clone())));
        Ok(())
    }

    async fn find_fare(&self, fare_id: &FareId) -> Result<Option<RideFare>, TripRepositoryError> {
        Ok(self.store.read().await.fares.get(fare_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use rstest::{fixture, rstest};

    use super::*;
    use crate::domain::{
        Driver, DriverId, PackageCategory, PricingConfig, RiderId, Route, TripStatus,
    };

    #[fixture]
    fn fares() -> Vec<RideFare> {
        let route = Route {
            distance: 5.0,
            duration: 10.0,
            geometry: Vec::new(),
        };
        PricingConfig::default().quote_all(&RiderId::new("rider-1").expect("rider id"), &route)
    }

    #[rstest]
    #[tokio::test]
    async fn saved_fares_are_readable(fares: Vec<RideFare>) {
        let repo = InMemoryTripRepository::default();
        repo.save_fares(&fares).await.expect("save");

        for fare in &fares {
            let found = repo.find_fare(&fare.id).await.expect("find");
            assert_eq!(found.as_ref(), Some(fare));
        }
        assert!(repo.find_fare(&FareId::random()).await.expect("find").is_none());
    }

    #[rstest]
    #[tokio::test]
    async fn fare_backs_only_one_trip(fares: Vec<RideFare>) {
        let repo = InMemoryTripRepository::default();
        let fare = fares[0].clone();
        repo.create_trip(&Trip::pending(TripId::random(), fare.clone(), Utc::now()))
            .await
            .expect("first trip");

        let err = repo
            .create_trip(&Trip::pending(TripId::random(), fare.clone(), Utc::now()))
            .await
            .expect_err("second trip on same fare");

        assert_eq!(err, TripRepositoryError::fare_already_consumed(fare.id));
    }

    #[rstest]
    #[tokio::test]
    async fn update_is_compare_and_set(fares: Vec<RideFare>) {
        let repo = InMemoryTripRepository::default();
        let trip = Trip::pending(TripId::random(), fares[1].clone(), Utc::now());
        repo.create_trip(&trip).await.expect("create");
        let driver = Driver::for_connection(
            DriverId::new("driver-1").expect("driver id"),
            PackageCategory::Sedan,
        );

        let assigned = repo
            .update_trip(&TripUpdate {
                trip_id: trip.id,
                expected_status: TripStatus::Pending,
                status: TripStatus::Assigned,
                driver: Some(driver.clone()),
            })
            .await
            .expect("assign");
        assert_eq!(assigned.driver.as_ref(), Some(&driver));

        let stale = repo
            .update_trip(&TripUpdate {
                trip_id: trip.id,
                expected_status: TripStatus::Pending,
                status: TripStatus::Cancelled,
                driver: None,
            })
            .await
            .expect_err("stale status");
        assert_eq!(
            stale,
            TripRepositoryError::status_mismatch(TripStatus::Pending, TripStatus::Assigned)
        );

        let ongoing = repo
            .update_trip(&TripUpdate {
                trip_id: trip.id,
                expected_status: TripStatus::Assigned,
                status: TripStatus::Ongoing,
                driver: None,
            })
            .await
            .expect("start trip");
        assert_eq!(ongoing.driver, Some(driver));
    }

    #[rstest]
    #[tokio::test]
    async fn driver_only_changes_on_assignment(fares: Vec<RideFare>) {
        let repo = InMemoryTripRepository::default();
        let driver = |id: &str| {
            Driver::for_connection(DriverId::new(id).expect("driver id"), PackageCategory::Sedan)
        };
        let trip = Trip::pending(TripId::random(), fares[1].clone(), Utc::now())
            .with_transition(TripStatus::Assigned, Some(driver("driver-1")));
        repo.create_trip(&trip).await.expect("create");

        let ongoing = repo
            .update_trip(&TripUpdate {
                trip_id: trip.id,
                expected_status: TripStatus::Assigned,
                status: TripStatus::Ongoing,
                driver: Some(driver("driver-2")),
            })
            .await
            .expect("start trip");

        assert_eq!(ongoing.driver, Some(driver("driver-1")));
        let stored = repo.find_trip(&trip.id).await.expect("find");
        assert_eq!(stored, Some(ongoing));
    }

    #[rstest]
    #[tokio::test]
    async fn concurrent_creates_yield_distinct_trips(fares: Vec<RideFare>) {
        let repo = Arc::new(InMemoryTripRepository::default());
        let handles: Vec<_> = fares
            .iter()
            .cloned()
            .map(|fare| {
                let repo = Arc::clone(&repo);
                tokio::spawn(async move {
                    let trip = Trip::pending(TripId::random(), fare, Utc::now());
                    repo.create_trip(&trip).await.map(|()| trip.id)
                })
            })
            .collect();

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.expect("join").expect("create"));
        }
        ids.sort_by_key(|id| *id.as_uuid());
        ids.dedup();
        assert_eq!(ids.len(), fares.len());
    }
}
