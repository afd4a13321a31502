//! Tests for the trip domain service.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, TimeZone, Utc};
use mockable::MockClock;
use rstest::{fixture, rstest};

use super::*;
use crate::domain::ports::{MockRouteProvider, MockTripRepository};
use crate::domain::{DriverId, ErrorCode, PackageCategory, Route};

type MockService = TripService<MockTripRepository, MockRouteProvider>;

fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0)
        .single()
        .expect("valid timestamp")
}

fn clock() -> Arc<MockClock> {
    let mut clock = MockClock::new();
    clock.expect_utc().return_const(fixed_time());
    Arc::new(clock)
}

fn pricing() -> PricingConfig {
    PricingConfig {
        price_per_distance_unit: 100.0,
        price_per_time_unit: 50.0,
    }
}

fn service(repo: MockTripRepository, routes: MockRouteProvider) -> MockService {
    TripService::new(Arc::new(repo), Arc::new(routes), pricing(), clock())
}

fn coordinate(lat: f64, lon: f64) -> Coordinate {
    Coordinate::new(lat, lon).expect("valid coordinate")
}

fn rider(id: &str) -> RiderId {
    RiderId::new(id).expect("rider id")
}

fn driver(id: &str) -> Driver {
    Driver::for_connection(DriverId::new(id).expect("driver id"), PackageCategory::Sedan)
}

#[fixture]
fn route() -> Route {
    Route {
        distance: 5.0,
        duration: 10.0,
        geometry: vec![coordinate(52.5, 13.4), coordinate(52.6, 13.5)],
    }
}

#[fixture]
fn sedan_fare(route: Route) -> RideFare {
    pricing()
        .quote_all(&rider("rider-1"), &route)
        .into_iter()
        .find(|fare| fare.package == PackageCategory::Sedan)
        .expect("sedan quote")
}

#[fixture]
fn pending_trip(sedan_fare: RideFare) -> Trip {
    Trip::pending(TripId::random(), sedan_fare, fixed_time())
}

#[rstest]
#[tokio::test]
async fn preview_persists_every_quote_in_one_call(route: Route) {
    let mut routes = MockRouteProvider::new();
    let returned = route.clone();
    routes
        .expect_route()
        .times(1)
        .return_once(move |_, _| Ok(returned));
    let mut repo = MockTripRepository::new();
    repo.expect_save_fares()
        .times(1)
        .withf(|fares| fares.len() == PackageCategory::ALL.len())
        .return_once(|_| Ok(()));

    let preview = service(repo, routes)
        .preview_trip(&rider("rider-1"), coordinate(52.5, 13.4), coordinate(52.6, 13.5))
        .await
        .expect("preview succeeds");

    assert_eq!(preview.route, route);
    let sedan = preview
        .fares
        .iter()
        .find(|fare| fare.package == PackageCategory::Sedan)
        .expect("sedan quote");
    assert_eq!(sedan.total_price_cents, 3000.0);
    for fare in &preview.fares {
        assert_eq!(
            fare.total_price_cents,
            fare.package.base_price_cents() + 5.0 * 100.0 + 10.0 * 50.0
        );
    }
}

#[rstest]
#[tokio::test]
async fn preview_reports_route_failure_without_persisting() {
    let mut routes = MockRouteProvider::new();
    routes
        .expect_route()
        .times(1)
        .return_once(|_, _| Err(RouteProviderError::timeout("5s elapsed")));
    let mut repo = MockTripRepository::new();
    repo.expect_save_fares().times(0);

    let error = service(repo, routes)
        .preview_trip(&rider("rider-1"), coordinate(0.0, 0.0), coordinate(1.0, 1.0))
        .await
        .expect_err("route failure");

    assert_eq!(error.code(), ErrorCode::ServiceUnavailable);
}

#[rstest]
#[tokio::test]
async fn preview_maps_store_outage_to_service_unavailable(route: Route) {
    let mut routes = MockRouteProvider::new();
    routes.expect_route().return_once(move |_, _| Ok(route));
    let mut repo = MockTripRepository::new();
    repo.expect_save_fares()
        .return_once(|_| Err(TripRepositoryError::connection("pool exhausted")));

    let error = service(repo, routes)
        .preview_trip(&rider("rider-1"), coordinate(0.0, 0.0), coordinate(1.0, 1.0))
        .await
        .expect_err("store outage");

    assert_eq!(error.code(), ErrorCode::ServiceUnavailable);
}

#[rstest]
#[tokio::test]
async fn fare_lookup_reports_missing_fare() {
    let mut repo = MockTripRepository::new();
    repo.expect_find_fare().return_once(|_| Ok(None));

    let error = service(repo, MockRouteProvider::new())
        .get_and_validate_fare(&FareId::random(), &rider("rider-1"))
        .await
        .expect_err("missing fare");

    assert_eq!(error.code(), ErrorCode::NotFound);
    assert_eq!(error.message(), "fare does not exist");
}

#[rstest]
#[tokio::test]
async fn fare_lookup_rejects_other_riders(sedan_fare: RideFare) {
    let mut repo = MockTripRepository::new();
    repo.expect_find_fare()
        .return_once(move |_| Ok(Some(sedan_fare)));

    let error = service(repo, MockRouteProvider::new())
        .get_and_validate_fare(&FareId::random(), &rider("someone-else"))
        .await
        .expect_err("ownership mismatch");

    assert_eq!(error.code(), ErrorCode::Forbidden);
    assert_eq!(error.message(), "fare does not belong to the user");
}

#[rstest]
#[tokio::test]
async fn create_trip_starts_pending_without_driver(sedan_fare: RideFare) {
    let mut repo = MockTripRepository::new();
    repo.expect_create_trip()
        .times(1)
        .withf(|trip| trip.status == TripStatus::Pending && trip.driver.is_none())
        .return_once(|_| Ok(()));

    let trip = service(repo, MockRouteProvider::new())
        .create_trip(sedan_fare.clone())
        .await
        .expect("trip created");

    assert_eq!(trip.status, TripStatus::Pending);
    assert_eq!(trip.rider_id, sedan_fare.rider_id);
    assert_eq!(trip.fare, sedan_fare);
    assert_eq!(trip.created_at, fixed_time());
}

#[rstest]
#[tokio::test]
async fn create_trip_rejects_consumed_fare(sedan_fare: RideFare) {
    let fare_id = sedan_fare.id;
    let mut repo = MockTripRepository::new();
    repo.expect_create_trip()
        .return_once(move |_| Err(TripRepositoryError::fare_already_consumed(fare_id)));

    let error = service(repo, MockRouteProvider::new())
        .create_trip(sedan_fare)
        .await
        .expect_err("fare reuse");

    assert_eq!(error.code(), ErrorCode::Conflict);
}

#[rstest]
#[tokio::test]
async fn update_assigns_driver(pending_trip: Trip) {
    let stored = pending_trip.clone();
    let written = pending_trip
        .clone()
        .with_transition(TripStatus::Assigned, Some(driver("alice")));
    let mut repo = MockTripRepository::new();
    repo.expect_find_trip()
        .return_once(move |_| Ok(Some(stored)));
    repo.expect_update_trip()
        .times(1)
        .withf(|update| {
            update.expected_status == TripStatus::Pending
                && update.status == TripStatus::Assigned
                && update.driver.as_ref().map(|d| d.id.as_ref()) == Some("alice")
        })
        .return_once(move |_| Ok(written));

    let outcome = service(repo, MockRouteProvider::new())
        .update_trip(&pending_trip.id, TripStatus::Assigned, Some(driver("alice")))
        .await
        .expect("assignment applies");

    assert!(outcome.is_applied());
    assert_eq!(outcome.trip().status, TripStatus::Assigned);
}

#[rstest]
#[tokio::test]
async fn update_surfaces_query_failures(pending_trip: Trip) {
    let trip_id = pending_trip.id;
    let mut repo = MockTripRepository::new();
    repo.expect_find_trip()
        .return_once(move |_| Ok(Some(pending_trip)));
    repo.expect_update_trip()
        .return_once(|_| Err(TripRepositoryError::query("deadlock detected")));

    let error = service(repo, MockRouteProvider::new())
        .update_trip(&trip_id, TripStatus::Cancelled, None)
        .await
        .expect_err("query failure");

    assert_eq!(error.code(), ErrorCode::InternalError);
}

#[rstest]
#[tokio::test]
async fn update_retries_after_concurrent_change(pending_trip: Trip) {
    let reads = Arc::new(AtomicUsize::new(0));
    let alice = driver("alice");
    let first_read = pending_trip.clone();
    let second_read = pending_trip
        .clone()
        .with_transition(TripStatus::Assigned, Some(alice.clone()));
    let reads_in_mock = Arc::clone(&reads);
    let mut repo = MockTripRepository::new();
    repo.expect_find_trip().returning(move |_| {
        if reads_in_mock.fetch_add(1, Ordering::SeqCst) == 0 {
            Ok(Some(first_read.clone()))
        } else {
            Ok(Some(second_read.clone()))
        }
    });
    repo.expect_update_trip().times(1).returning(|_| {
        Err(TripRepositoryError::status_mismatch(
            TripStatus::Pending,
            TripStatus::Assigned,
        ))
    });

    let outcome = service(repo, MockRouteProvider::new())
        .update_trip(&pending_trip.id, TripStatus::Assigned, Some(alice))
        .await
        .expect("second pass sees the assignment");

    assert!(!outcome.is_applied());
    assert_eq!(reads.load(Ordering::SeqCst), 2);
}

#[rstest]
#[tokio::test]
async fn update_with_same_driver_is_idempotent(pending_trip: Trip) {
    let alice = driver("alice");
    let assigned = pending_trip.with_transition(TripStatus::Assigned, Some(alice.clone()));
    let trip_id = assigned.id;
    let mut repo = MockTripRepository::new();
    repo.expect_find_trip()
        .return_once(move |_| Ok(Some(assigned)));
    repo.expect_update_trip().times(0);

    let outcome = service(repo, MockRouteProvider::new())
        .update_trip(&trip_id, TripStatus::Assigned, Some(alice))
        .await
        .expect("idempotent");

    assert!(matches!(outcome, UpdateOutcome::AlreadyApplied(_)));
}

#[rstest]
#[tokio::test]
async fn update_with_other_driver_is_a_conflict(pending_trip: Trip) {
    let assigned = pending_trip.with_transition(TripStatus::Assigned, Some(driver("alice")));
    let trip_id = assigned.id;
    let mut repo = MockTripRepository::new();
    repo.expect_find_trip()
        .return_once(move |_| Ok(Some(assigned)));
    repo.expect_update_trip().times(0);

    let error = service(repo, MockRouteProvider::new())
        .update_trip(&trip_id, TripStatus::Assigned, Some(driver("bob")))
        .await
        .expect_err("conflict");

    assert_eq!(error.code(), ErrorCode::Conflict);
}

#[rstest]
#[case(TripStatus::Ongoing)]
#[case(TripStatus::Completed)]
#[tokio::test]
async fn update_rejects_skipping_states(pending_trip: Trip, #[case] target: TripStatus) {
    let trip_id = pending_trip.id;
    let mut repo = MockTripRepository::new();
    repo.expect_find_trip()
        .return_once(move |_| Ok(Some(pending_trip)));
    repo.expect_update_trip().times(0);

    let error = service(repo, MockRouteProvider::new())
        .update_trip(&trip_id, target, None)
        .await
        .expect_err("illegal transition");

    assert_eq!(error.code(), ErrorCode::InvalidRequest);
}

#[rstest]
#[tokio::test]
async fn update_reports_missing_trip() {
    let mut repo = MockTripRepository::new();
    repo.expect_find_trip().return_once(|_| Ok(None));

    let error = service(repo, MockRouteProvider::new())
        .update_trip(&TripId::random(), TripStatus::Cancelled, None)
        .await
        .expect_err("missing trip");

    assert_eq!(error.code(), ErrorCode::NotFound);
}

#[rstest]
#[tokio::test]
async fn cancel_requires_owner(pending_trip: Trip) {
    let trip_id = pending_trip.id;
    let mut repo = MockTripRepository::new();
    repo.expect_find_trip()
        .return_once(move |_| Ok(Some(pending_trip)));
    repo.expect_update_trip().times(0);

    let error = service(repo, MockRouteProvider::new())
        .cancel_trip(&trip_id, &rider("intruder"))
        .await
        .expect_err("not the owner");

    assert_eq!(error.code(), ErrorCode::Forbidden);
}
