//! In-process event broker.
//!
//! Each subscription owns an unbounded queue and receives every event of the
//! kinds it asked for, published after it subscribed. Envelopes cross the
//! broker as JSON so the wire contract is exercised the same way a networked
//! broker would. A nacked delivery with `requeue` goes to the back of its
//! subscription's queue flagged as redelivered.
//!
//! [`InMemoryBroker::shutdown`] closes every subscription: pending
//! `next_delivery` calls return [`EventBrokerError::Closed`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::domain::ports::{Delivery, EventBroker, EventBrokerError, EventSubscription};
use crate::domain::{EventEnvelope, EventKind};

#[derive(Debug, Clone)]
struct Queued {
    payload: String,
    redelivered: bool,
}

struct Subscriber {
    kinds: Vec<EventKind>,
    sender: mpsc::UnboundedSender<Queued>,
}

/// Broker shared by publishers and consumers in one process.
#[derive(Clone, Default)]
pub struct InMemoryBroker {
    subscribers: Arc<Mutex<Vec<Subscriber>>>,
    shutdown: CancellationToken,
}

impl InMemoryBroker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Close every subscription and refuse further publishes.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    fn poisoned() -> EventBrokerError {
        EventBrokerError::unavailable("broker state lock poisoned")
    }
}

#[async_trait]
impl EventBroker for InMemoryBroker {
    async fn publish(&self, envelope: &EventEnvelope) -> Result<(), EventBrokerError> {
        if self.shutdown.is_cancelled() {
            return Err(EventBrokerError::unavailable("broker is shut down"));
        }
        let payload = serde_json::to_string(envelope)
            .map_err(|err| EventBrokerError::rejected(err.to_string()))?;
        let kind = envelope.kind();

        let mut subscribers = self.subscribers.lock().map_err(|_| Self::poisoned())?;
        subscribers.retain(|subscriber| !subscriber.sender.is_closed());
        let mut fanned_out = 0_usize;
        for subscriber in subscribers.iter().filter(|s| s.kinds.contains(&kind)) {
            let queued = Queued {
                payload: payload.clone(),
                redelivered: false,
            };
            if subscriber.sender.send(queued).is_ok() {
                fanned_out += 1;
            }
        }
        debug!(%kind, event_id = %envelope.id, subscribers = fanned_out, "event queued");
        Ok(())
    }

    async fn subscribe(
        &self,
        kinds: &[EventKind],
    ) -> Result<Box<dyn EventSubscription>, EventBrokerError> {
        if self.shutdown.is_cancelled() {
            return Err(EventBrokerError::closed());
        }
        let (sender, receiver) = mpsc::unbounded_channel();
        self.subscribers
            .lock()
            .map_err(|_| Self::poisoned())?
            .push(Subscriber {
                kinds: kinds.to_vec(),
                sender: sender.clone(),
            });
        Ok(Box::new(InMemorySubscription {
            receiver,
            requeue: sender,
            in_flight: HashMap::new(),
            next_tag: 1,
            shutdown: self.shutdown.clone(),
        }))
    }
}

/// Consuming end of an [`InMemoryBroker`] subscription.
pub struct InMemorySubscription {
    receiver: mpsc::UnboundedReceiver<Queued>,
    requeue: mpsc::UnboundedSender<Queued>,
    in_flight: HashMap<u64, Queued>,
    next_tag: u64,
    shutdown: CancellationToken,
}

impl InMemorySubscription {
    fn take(&mut self, tag: u64) -> Result<Queued, EventBrokerError> {
        self.in_flight
            .remove(&tag)
            .ok_or_else(|| EventBrokerError::rejected(format!("unknown delivery tag {tag}")))
    }
}

#[async_trait]
impl EventSubscription for InMemorySubscription {
    async fn next_delivery(&mut self) -> Result<Delivery, EventBrokerError> {
        let queued = tokio::select! {
            biased;
            () = self.shutdown.cancelled() => None,
            queued = self.receiver.recv() => queued,
        }
        .ok_or_else(EventBrokerError::closed)?;

        let envelope: EventEnvelope = serde_json::from_str(&queued.payload).map_err(|err| {
            warn!(error = %err, "dropping undecodable delivery");
            EventBrokerError::rejected(err.to_string())
        })?;
        let tag = self.next_tag;
        self.next_tag += 1;
        let redelivered = queued.redelivered;
        self.in_flight.insert(tag, queued);
        Ok(Delivery {
            tag,
            envelope,
            redelivered,
        })
    }

    async fn ack(&mut self, tag: u64) -> Result<(), EventBrokerError> {
        self.take(tag).map(|_| ())
    }

    async fn nack(&mut self, tag: u64, requeue: bool) -> Result<(), EventBrokerError> {
        let queued = self.take(tag)?;
        if !requeue {
            debug!(tag, "delivery discarded");
            return Ok(());
        }
        self.requeue
            .send(Queued {
                redelivered: true,
                ..queued
            })
            .map_err(|_| EventBrokerError::closed())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::Utc;
    use rstest::rstest;

    use super::*;
    use crate::domain::{
        DispatchEvent, DriverId, DriverStatusReported, TripId, TripStatus, TripStatusChanged,
        RiderId,
    };

    fn status_report() -> EventEnvelope {
        EventEnvelope::new(
            DispatchEvent::DriverStatusReported(DriverStatusReported {
                trip_id: TripId::random(),
                driver_id: DriverId::new("driver-1").expect("driver id"),
                status: TripStatus::Ongoing,
            }),
            Utc::now(),
            None,
        )
    }

    fn status_change() -> EventEnvelope {
        EventEnvelope::new(
            DispatchEvent::TripStatusChanged(TripStatusChanged {
                trip_id: TripId::random(),
                rider_id: RiderId::new("rider-1").expect("rider id"),
                driver_id: None,
                status: TripStatus::Cancelled,
            }),
            Utc::now(),
            None,
        )
    }

    #[rstest]
    #[tokio::test]
    async fn delivers_only_subscribed_kinds() {
        let broker = InMemoryBroker::new();
        let mut subscription = broker
            .subscribe(&EventKind::DRIVER_ORIGIN)
            .await
            .expect("subscribe");

        broker.publish(&status_change()).await.expect("publish");
        let report = status_report();
        broker.publish(&report).await.expect("publish");

        let delivery = subscription.next_delivery().await.expect("delivery");
        assert_eq!(delivery.envelope, report);
        assert!(!delivery.redelivered);
    }

    #[rstest]
    #[tokio::test]
    async fn every_subscription_gets_its_own_copy() {
        let broker = InMemoryBroker::new();
        let mut first = broker
            .subscribe(&[EventKind::DriverStatusReported])
            .await
            .expect("subscribe");
        let mut second = broker
            .subscribe(&[EventKind::DriverStatusReported])
            .await
            .expect("subscribe");

        let report = status_report();
        broker.publish(&report).await.expect("publish");

        assert_eq!(first.next_delivery().await.expect("first").envelope.id, report.id);
        assert_eq!(second.next_delivery().await.expect("second").envelope.id, report.id);
    }

    #[rstest]
    #[tokio::test]
    async fn nack_with_requeue_redelivers() {
        let broker = InMemoryBroker::new();
        let mut subscription = broker
            .subscribe(&[EventKind::DriverStatusReported])
            .await
            .expect("subscribe");
        broker.publish(&status_report()).await.expect("publish");

        let first = subscription.next_delivery().await.expect("delivery");
        subscription.nack(first.tag, true).await.expect("nack");
        let second = subscription.next_delivery().await.expect("redelivery");

        assert_eq!(second.envelope.id, first.envelope.id);
        assert!(second.redelivered);
        assert_ne!(second.tag, first.tag);
        subscription.ack(second.tag).await.expect("ack");
        assert!(subscription.ack(second.tag).await.is_err());
    }

    #[rstest]
    #[tokio::test]
    async fn shutdown_closes_waiting_subscriptions() {
        let broker = InMemoryBroker::new();
        let mut subscription = broker
            .subscribe(&EventKind::TRIP_LIFECYCLE)
            .await
            .expect("subscribe");

        let closer = broker.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            closer.shutdown();
        });

        let err = subscription.next_delivery().await.expect_err("closed");
        assert_eq!(err, EventBrokerError::closed());
        assert!(broker.publish(&status_report()).await.is_err());
    }
}
