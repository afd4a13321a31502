//! Trip dispatch service library.
//!
//! Hexagonal layout: [`domain`] holds the model, services and ports;
//! [`inbound`] adapts HTTP and WebSocket traffic onto it; [`outbound`]
//! implements the ports against PostgreSQL, OSRM and the event broker.

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;
pub mod settings;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

/// Public OpenAPI surface used by Swagger UI and tooling.
pub use doc::ApiDoc;
pub use middleware::Trace;
