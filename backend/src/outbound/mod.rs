//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **persistence**: PostgreSQL trip repository using Diesel.
//! - **memory**: in-process trip repository for single-node runs and tests.
//! - **messaging**: in-process event broker.
//! - **routing**: OSRM route provider over reqwest.
//!
//! Adapters translate between domain types and infrastructure
//! representations. They contain no business logic.

pub mod memory;
pub mod messaging;
pub mod persistence;
pub mod routing;
