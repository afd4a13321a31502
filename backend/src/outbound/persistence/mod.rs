//! PostgreSQL persistence adapter built on Diesel.
//!
//! Submodules:
//! - `pool`: async connection pooling via bb8.
//! - `schema` and `models`: table definitions and row structs.
//! - `diesel_trip_repository`: the [`TripRepository`](crate::domain::ports::TripRepository) adapter.
//! - `migrations`: embedded schema migrations.

mod diesel_error_mapping;
mod diesel_trip_repository;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_trip_repository::DieselTripRepository;
pub use migrations::{MigrationError, run_pending_migrations};
pub use pool::{DbPool, PoolConfig, PoolError};
