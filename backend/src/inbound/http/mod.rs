//! HTTP inbound adapter exposing the trip RPCs and health checks.

pub mod error;
pub mod health;
pub mod state;
pub mod trips;
pub mod validation;

pub use error::ApiResult;
