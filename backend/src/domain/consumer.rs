//! Broker consumer loop.
//!
//! Pulls deliveries one at a time from a subscription and hands each to a
//! [`DeliveryHandler`] inside the trace scope of the publishing request.
//! Settlement follows the handler result:
//!
//! - `Ok` acks the delivery;
//! - a retryable error (the store or a dependency is down) nacks with requeue
//!   after a short pause;
//! - any other error is a business outcome (lost race, bad payload). It is
//!   logged and acked so it is never redelivered.
//!
//! The loop stops when the shutdown token fires or the subscription closes.
//! A delivery already being handled is finished and settled first.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::ports::{Delivery, EventBrokerError, EventSubscription};
use crate::domain::{Error, EventEnvelope, TraceId};

#[cfg(not(test))]
const REQUEUE_DELAY: Duration = Duration::from_millis(500);
#[cfg(test)]
const REQUEUE_DELAY: Duration = Duration::from_millis(5);

/// Business logic run for each delivery.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DeliveryHandler: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Process one envelope.
    async fn handle(&self, envelope: &EventEnvelope) -> Result<(), Error>;
}

/// How a handled delivery is settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Settlement {
    Ack,
    Requeue,
}

fn settlement_for(handler: &str, delivery: &Delivery, result: Result<(), Error>) -> Settlement {
    let kind = delivery.envelope.kind();
    let trip_id = delivery.envelope.event.trip_id();
    match result {
        Ok(()) => Settlement::Ack,
        Err(err) if err.code().is_retryable() => {
            warn!(handler, %kind, %trip_id, error = %err, "delivery failed; requeueing");
            Settlement::Requeue
        }
        Err(err) => {
            warn!(handler, %kind, %trip_id, error = %err, "delivery rejected; dropping");
            Settlement::Ack
        }
    }
}

/// Sleep unless shutdown fires first. Returns `false` on shutdown.
async fn pause(shutdown: &CancellationToken) -> bool {
    tokio::select! {
        () = shutdown.cancelled() => false,
        () = tokio::time::sleep(REQUEUE_DELAY) => true,
    }
}

/// Drive `subscription` through `handler` until shutdown.
pub async fn run_consumer(
    handler: Arc<dyn DeliveryHandler>,
    mut subscription: Box<dyn EventSubscription>,
    shutdown: CancellationToken,
) {
    let name = handler.name();
    info!(handler = name, "consumer started");
    loop {
        let next = tokio::select! {
            biased;
            () = shutdown.cancelled() => break,
            next = subscription.next_delivery() => next,
        };

        let delivery = match next {
            Ok(delivery) => delivery,
            Err(EventBrokerError::Closed) => {
                info!(handler = name, "subscription closed");
                break;
            }
            Err(err) => {
                warn!(handler = name, error = %err, "failed to pull delivery");
                if pause(&shutdown).await {
                    continue;
                }
                break;
            }
        };

        let trace_id = delivery
            .envelope
            .trace_id
            .map_or_else(TraceId::generate, TraceId::from_uuid);
        let result = TraceId::scope(trace_id, handler.handle(&delivery.envelope)).await;
        let settle = match settlement_for(name, &delivery, result) {
            Settlement::Ack => subscription.ack(delivery.tag).await,
            Settlement::Requeue => {
                let keep_running = pause(&shutdown).await;
                let nacked = subscription.nack(delivery.tag, true).await;
                if !keep_running {
                    if let Err(err) = nacked {
                        warn!(handler = name, tag = delivery.tag, error = %err, "nack failed");
                    }
                    break;
                }
                nacked
            }
        };
        match settle {
            Ok(()) => debug!(handler = name, tag = delivery.tag, "delivery settled"),
            Err(err) => warn!(handler = name, tag = delivery.tag, error = %err, "settle failed"),
        }
    }
    info!(handler = name, "consumer stopped");
}

#[cfg(test)]
#[path = "consumer_tests.rs"]
mod tests;
