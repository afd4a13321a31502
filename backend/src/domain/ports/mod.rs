//! Domain ports.
//!
//! Driven ports (repository, route provider, broker, client connection) are
//! implemented by outbound adapters; the driving port [`TripDispatch`] is
//! what inbound adapters call.

mod client_connection;
mod event_broker;
mod macros;
mod route_provider;
mod trip_dispatch;
mod trip_repository;

pub(crate) use macros::define_port_error;

#[cfg(test)]
pub use client_connection::MockClientConnection;
pub use client_connection::{ClientConnection, ConnectionWriteError, OutboundFrame};
#[cfg(test)]
pub use event_broker::{MockEventBroker, MockEventSubscription};
pub use event_broker::{Delivery, EventBroker, EventBrokerError, EventSubscription};
#[cfg(test)]
pub use route_provider::MockRouteProvider;
pub use route_provider::{FixtureRouteProvider, RouteProvider, RouteProviderError};
#[cfg(test)]
pub use trip_dispatch::MockTripDispatch;
pub use trip_dispatch::{
    CancelTripRequest, PreviewTripRequest, StartTripRequest, TripDispatch, TripPreview,
    TripReceipt,
};
#[cfg(test)]
pub use trip_repository::MockTripRepository;
pub use trip_repository::{TripRepository, TripRepositoryError, TripUpdate};
