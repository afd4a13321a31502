//! Domain primitives, aggregates and services.
//!
//! Purpose: define the strongly typed trip dispatch model (identifiers,
//! routes, fare quotes, trips, broker events) and the services that drive it.
//! Adapters reach the domain only through the traits in [`ports`].
//!
//! Public surface:
//! - Error (alias to `error::Error`): API error response payload.
//! - Trip, RideFare, Driver: the records clients see.
//! - TripService: quoting, fare validation and the trip state machine.
//! - TripDispatchService: the rider-facing [`ports::TripDispatch`] port.
//! - DriverAssignmentConsumer, NotificationRelay: standing broker consumers.
//! - NotificationHub: live driver and rider connections.

pub mod assignment_consumer;
pub mod consumer;
pub mod dispatch_service;
pub mod driver;
pub mod error;
pub mod event_publisher;
pub mod events;
pub mod fare;
pub mod ids;
pub mod notification_hub;
pub mod notification_relay;
pub mod notifications;
pub mod ports;
pub mod route;
pub mod trace_id;
pub mod trip;
pub mod trip_service;

pub use self::assignment_consumer::DriverAssignmentConsumer;
pub use self::consumer::{DeliveryHandler, run_consumer};
pub use self::dispatch_service::TripDispatchService;
pub use self::driver::Driver;
pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::event_publisher::{EventPublisher, PublishOutcome, RetryPolicy};
pub use self::events::{
    DispatchEvent, DriverAccepted, DriverAssigned, DriverLocation, DriverStatusReported,
    EventEnvelope, EventKind, TripCreated, TripStatusChanged,
};
pub use self::fare::{PackageCategory, PricingConfig, RideFare, UnknownPackageCategory};
pub use self::ids::{DriverId, FareId, IdValidationError, RiderId, TripId};
pub use self::notification_hub::{
    BroadcastReport, ConnectionHandle, NotificationHub, NotifyOutcome, SessionId,
};
pub use self::notification_relay::NotificationRelay;
pub use self::notifications::{ClientMessage, ClientMessageKind};
pub use self::route::{Coordinate, CoordinateError, Route};
pub use self::trace_id::{TRACE_ID_HEADER, TraceId};
pub use self::trip::{Trip, TripStatus, TransitionError, TransitionPlan, UnknownTripStatus};
pub use self::trip_service::{TripService, UpdateOutcome};
