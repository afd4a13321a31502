//! Port for the durable event broker.
//!
//! Publishing is keyed by [`EventKind`]. Subscriptions pull deliveries one at
//! a time and settle each with `ack` (done) or `nack` (redeliver or drop).

use async_trait::async_trait;

use crate::domain::{EventEnvelope, EventKind};

use super::define_port_error;

define_port_error! {
    /// Errors raised by broker adapters.
    pub enum EventBrokerError {
        /// The broker could not be reached; retrying may succeed.
        [transient]
        Unavailable { message: String } => "event broker unavailable: {message}",
        /// The broker refused the event; retrying will not help.
        Rejected { message: String } => "event broker rejected event: {message}",
        /// The subscription has been shut down.
        Closed => "event subscription closed",
    }
}

/// One delivery pulled from a subscription.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    /// Broker-assigned tag used to settle the delivery.
    pub tag: u64,
    pub envelope: EventEnvelope,
    /// Set when the broker has delivered this envelope before.
    pub redelivered: bool,
}

/// Publishing side of the broker.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventBroker: Send + Sync {
    /// Publish one envelope under its kind.
    async fn publish(&self, envelope: &EventEnvelope) -> Result<(), EventBrokerError>;

    /// Open a subscription receiving every later event of the given kinds.
    async fn subscribe(
        &self,
        kinds: &[EventKind],
    ) -> Result<Box<dyn EventSubscription>, EventBrokerError>;
}

/// Consuming side of a broker subscription.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventSubscription: Send {
    /// Wait for the next delivery. Returns [`EventBrokerError::Closed`] once
    /// the broker shuts down.
    async fn next_delivery(&mut self) -> Result<Delivery, EventBrokerError>;

    /// Mark a delivery as processed.
    async fn ack(&mut self, tag: u64) -> Result<(), EventBrokerError>;

    /// Reject a delivery; `requeue` asks for redelivery.
    async fn nack(&mut self, tag: u64, requeue: bool) -> Result<(), EventBrokerError>;
}
