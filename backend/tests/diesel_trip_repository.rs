//! Integration tests for `DieselTripRepository` against embedded PostgreSQL.
//!
//! Each test boots its own cluster, applies the embedded migrations and
//! talks to the adapter through the `TripRepository` port.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use pg_embedded_setup_unpriv::TestCluster;
use rstest::{fixture, rstest};
use tokio::runtime::Runtime;

use dispatch::domain::ports::{TripRepository, TripRepositoryError, TripUpdate};
use dispatch::domain::{
    Driver, DriverId, PackageCategory, PricingConfig, RideFare, RiderId, Route, Trip, TripId,
    TripStatus,
};
use dispatch::outbound::persistence::{
    DbPool, DieselTripRepository, PoolConfig, run_pending_migrations,
};

mod support;

use support::{handle_cluster_setup_failure, test_cluster};

struct TestContext {
    runtime: Runtime,
    repository: DieselTripRepository,
    _cluster: TestCluster,
}

fn setup_context() -> Result<TestContext, String> {
    let cluster = test_cluster()?;
    let database_url = cluster.connection().database_url("postgres");
    run_pending_migrations(&database_url).map_err(|err| err.to_string())?;

    let runtime = Runtime::new().map_err(|err| err.to_string())?;
    let config = PoolConfig::new(database_url)
        .with_max_size(2)
        .with_min_idle(Some(1));
    let pool = runtime
        .block_on(DbPool::new(config))
        .map_err(|err| err.to_string())?;

    Ok(TestContext {
        runtime,
        repository: DieselTripRepository::new(pool),
        _cluster: cluster,
    })
}

#[fixture]
fn repo_context() -> Option<TestContext> {
    match setup_context() {
        Ok(ctx) => Some(ctx),
        Err(reason) => handle_cluster_setup_failure(reason),
    }
}

#[fixture]
fn fares() -> Vec<RideFare> {
    let route = Route {
        distance: 5.0,
        duration: 10.0,
        geometry: Vec::new(),
    };
    PricingConfig::default().quote_all(&RiderId::new("rider-1").expect("rider id"), &route)
}

/// Whole seconds so the value survives the timestamptz round trip.
fn created_at() -> DateTime<Utc> {
    DateTime::from_timestamp(1_767_268_800, 0).expect("valid timestamp")
}

fn sedan_driver() -> Driver {
    Driver::for_connection(
        DriverId::new("driver-1").expect("driver id"),
        PackageCategory::Sedan,
    )
}

#[rstest]
fn saved_fares_are_readable(repo_context: Option<TestContext>, fares: Vec<RideFare>) {
    let Some(ctx) = repo_context else {
        eprintln!("SKIP-TEST-CLUSTER: saved_fares_are_readable skipped");
        return;
    };

    ctx.runtime.block_on(async {
        ctx.repository.save_fares(&[]).await.expect("empty batch");
        ctx.repository.save_fares(&fares).await.expect("save fares");

        for fare in &fares {
            let stored = ctx.repository.find_fare(&fare.id).await.expect("find fare");
            assert_eq!(stored.as_ref(), Some(fare));
        }
    });
}

#[rstest]
fn created_trip_is_readable(repo_context: Option<TestContext>, fares: Vec<RideFare>) {
    let Some(ctx) = repo_context else {
        eprintln!("SKIP-TEST-CLUSTER: created_trip_is_readable skipped");
        return;
    };

    ctx.runtime.block_on(async {
        ctx.repository.save_fares(&fares).await.expect("save fares");
        let trip = Trip::pending(TripId::random(), fares[0].clone(), created_at());
        ctx.repository.create_trip(&trip).await.expect("create");

        let stored = ctx.repository.find_trip(&trip.id).await.expect("find");
        assert_eq!(stored, Some(trip));

        let missing = ctx
            .repository
            .find_trip(&TripId::random())
            .await
            .expect("find missing");
        assert_eq!(missing, None);
    });
}

#[rstest]
fn fare_backs_only_one_trip(repo_context: Option<TestContext>, fares: Vec<RideFare>) {
    let Some(ctx) = repo_context else {
        eprintln!("SKIP-TEST-CLUSTER: fare_backs_only_one_trip skipped");
        return;
    };

    ctx.runtime.block_on(async {
        ctx.repository.save_fares(&fares).await.expect("save fares");
        let fare = &fares[0];
        ctx.repository
            .create_trip(&Trip::pending(TripId::random(), fare.clone(), created_at()))
            .await
            .expect("first trip");

        let err = ctx
            .repository
            .create_trip(&Trip::pending(TripId::random(), fare.clone(), created_at()))
            .await
            .expect_err("second trip on same fare");
        assert_eq!(err, TripRepositoryError::fare_already_consumed(fare.id));
    });
}

#[rstest]
fn update_is_compare_and_set(repo_context: Option<TestContext>, fares: Vec<RideFare>) {
    let Some(ctx) = repo_context else {
        eprintln!("SKIP-TEST-CLUSTER: update_is_compare_and_set skipped");
        return;
    };

    ctx.runtime.block_on(async {
        ctx.repository.save_fares(&fares).await.expect("save fares");
        let trip = Trip::pending(TripId::random(), fares[1].clone(), created_at());
        ctx.repository.create_trip(&trip).await.expect("create");
        let driver = sedan_driver();

        let assigned = ctx
            .repository
            .update_trip(&TripUpdate {
                trip_id: trip.id,
                expected_status: TripStatus::Pending,
                status: TripStatus::Assigned,
                driver: Some(driver.clone()),
            })
            .await
            .expect("assign");
        assert_eq!(assigned.status, TripStatus::Assigned);
        assert_eq!(assigned.driver.as_ref(), Some(&driver));

        let stale = ctx
            .repository
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

        let ongoing = ctx
            .repository
            .update_trip(&TripUpdate {
                trip_id: trip.id,
                expected_status: TripStatus::Assigned,
                status: TripStatus::Ongoing,
                driver: None,
            })
            .await
            .expect("start trip");
        assert_eq!(ongoing.driver, Some(driver));

        let stored = ctx.repository.find_trip(&trip.id).await.expect("find");
        assert_eq!(stored, Some(ongoing));
    });
}

#[rstest]
fn update_of_unknown_trip_is_not_found(repo_context: Option<TestContext>) {
    let Some(ctx) = repo_context else {
        eprintln!("SKIP-TEST-CLUSTER: update_of_unknown_trip_is_not_found skipped");
        return;
    };

    let trip_id = TripId::random();
    let err = ctx
        .runtime
        .block_on(ctx.repository.update_trip(&TripUpdate {
            trip_id,
            expected_status: TripStatus::Pending,
            status: TripStatus::Cancelled,
            driver: None,
        }))
        .expect_err("unknown trip");
    assert_eq!(err, TripRepositoryError::trip_not_found(trip_id));
}

#[rstest]
fn concurrent_creates_yield_distinct_trips(
    repo_context: Option<TestContext>,
    fares: Vec<RideFare>,
) {
    let Some(ctx) = repo_context else {
        eprintln!("SKIP-TEST-CLUSTER: concurrent_creates_yield_distinct_trips skipped");
        return;
    };

    let repository = Arc::new(ctx.repository.clone());
    ctx.runtime.block_on(async {
        repository.save_fares(&fares).await.expect("save fares");
        let handles: Vec<_> = fares
            .iter()
            .cloned()
            .map(|fare| {
                let repository = Arc::clone(&repository);
                tokio::spawn(async move {
                    let trip = Trip::pending(TripId::random(), fare, created_at());
                    repository.create_trip(&trip).await.map(|()| trip.id)
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
    });
}
