//! Event publisher with bounded retry.
//!
//! Publishing is at-least-once: transient broker failures are retried with
//! exponential backoff up to the configured number of attempts. Exhaustion is
//! logged and returned as a [`PublishOutcome::Failed`] that callers surface as
//! a warning; the trip state already committed stays authoritative.

use std::sync::Arc;
use std::time::Duration;

use mockable::Clock;
use tracing::{debug, error, warn};

use crate::domain::ports::{EventBroker, EventBrokerError};
use crate::domain::{DispatchEvent, EventEnvelope, TraceId};

/// Default number of publish attempts per event.
pub const DEFAULT_PUBLISH_ATTEMPTS: u32 = 3;
/// Default delay before the first retry.
pub const DEFAULT_PUBLISH_BACKOFF: Duration = Duration::from_millis(100);
const MAX_PUBLISH_BACKOFF: Duration = Duration::from_secs(2);

/// Retry schedule for publishing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_backoff: Duration,
}

impl RetryPolicy {
    /// Build a policy; at least one attempt is always made.
    #[must_use]
    pub fn new(max_attempts: u32, initial_backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_backoff,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay after the given failed attempt (1-based), doubling each time.
    #[must_use]
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        let factor = 2_u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(MAX_PUBLISH_BACKOFF)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_PUBLISH_ATTEMPTS, DEFAULT_PUBLISH_BACKOFF)
    }
}

/// Result of a publish call.
#[derive(Debug, Clone, PartialEq)]
pub enum PublishOutcome {
    Published { attempts: u32 },
    Failed { attempts: u32, error: EventBrokerError },
}

impl PublishOutcome {
    /// Warning text for RPC responses when publishing failed.
    #[must_use]
    pub fn warning(&self) -> Option<String> {
        match self {
            Self::Published { .. } => None,
            Self::Failed { error, .. } => Some(format!("trip event not published: {error}")),
        }
    }
}

/// Publishes dispatch events onto the broker.
pub struct EventPublisher {
    broker: Arc<dyn EventBroker>,
    clock: Arc<dyn Clock>,
    policy: RetryPolicy,
}

impl EventPublisher {
    pub fn new(broker: Arc<dyn EventBroker>, clock: Arc<dyn Clock>, policy: RetryPolicy) -> Self {
        Self {
            broker,
            clock,
            policy,
        }
    }

    /// Wrap and publish one event, retrying transient failures.
    pub async fn publish(&self, event: DispatchEvent) -> PublishOutcome {
        let envelope = EventEnvelope::new(
            event,
            self.clock.utc(),
            TraceId::current().map(|id| *id.as_uuid()),
        );
        let kind = envelope.kind();
        let trip_id = envelope.event.trip_id();

        let mut attempt = 1;
        loop {
            match self.broker.publish(&envelope).await {
                Ok(()) => {
                    debug!(%kind, %trip_id, event_id = %envelope.id, attempt, "event published");
                    return PublishOutcome::Published { attempts: attempt };
                }
                Err(err) if err.is_transient() && attempt < self.policy.max_attempts => {
                    let delay = self.policy.backoff_after(attempt);
                    warn!(
                        %kind,
                        %trip_id,
                        attempt,
                        delay_ms = delay.as_millis(),
                        error = %err,
                        "publish failed; retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    error!(%kind, %trip_id, attempts = attempt, error = %err, "publish failed");
                    return PublishOutcome::Failed {
                        attempts: attempt,
                        error: err,
                    };
                }
            }
        }
    }
}
