//! Route provider outbound adapters.
//!
//! This module provides a thin HTTP implementation of the `RouteProvider`
//! port against an OSRM-compatible routing engine.

mod dto;
mod osrm;

pub use osrm::OsrmRouteProvider;
