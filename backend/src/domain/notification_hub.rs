//! Connection registry and notification hub.
//!
//! Holds the live driver and rider connections keyed by their owner id. Each
//! connection sits behind its own mutex so every write to a client is
//! serialised, whether it comes from the connection's read loop (heartbeats)
//! or from a notification. Map locks are never held across a write.
//!
//! Registering an id that is already connected replaces the old session and
//! closes it. A read loop tearing down calls `release_*` with its handle,
//! which only removes the entry if it still belongs to that session, so a
//! stale loop cannot evict a newer reconnect.

use std::collections::HashMap;
use std::fmt::Display;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::future::join_all;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::domain::ports::{ClientConnection, ConnectionWriteError, OutboundFrame};
use crate::domain::{ClientMessage, DriverId, PackageCategory, RiderId};

/// Unique token of one connection session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u64);

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

struct ConnectionSlot {
    session_id: SessionId,
    package: Option<PackageCategory>,
    writer: Mutex<Box<dyn ClientConnection>>,
}

impl ConnectionSlot {
    async fn send(&self, frame: OutboundFrame) -> Result<(), ConnectionWriteError> {
        self.writer.lock().await.send(frame).await
    }

    async fn close(&self, reason: Option<String>) {
        self.writer.lock().await.close(reason).await;
    }
}

/// Handle owned by a connection's read loop.
///
/// Writes made through the handle share the session's writer lock with
/// notifications.
#[derive(Clone)]
pub struct ConnectionHandle {
    slot: Arc<ConnectionSlot>,
}

impl ConnectionHandle {
    pub fn session_id(&self) -> SessionId {
        self.slot.session_id
    }

    /// Write one frame to this session.
    pub async fn send(&self, frame: OutboundFrame) -> Result<(), ConnectionWriteError> {
        self.slot.send(frame).await
    }

    /// Encode and write a message to this session.
    pub async fn send_message(&self, message: &ClientMessage) -> Result<(), ConnectionWriteError> {
        match message.to_text() {
            Ok(text) => self.send(OutboundFrame::Text(text)).await,
            Err(err) => {
                error!(error = %err, "failed to encode client message");
                Ok(())
            }
        }
    }

    /// Close the underlying connection.
    pub async fn close(&self, reason: Option<String>) {
        self.slot.close(reason).await;
    }
}

/// Result of a targeted notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyOutcome {
    Delivered,
    /// Nobody with that id is connected; the message was dropped.
    NoConnection,
    /// The write failed and the session was deregistered.
    Failed,
}

/// Tally of a broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub failed: usize,
}

struct Registry<K> {
    role: &'static str,
    sessions: RwLock<HashMap<K, Arc<ConnectionSlot>>>,
}

impl<K> Registry<K>
where
    K: Eq + Hash + Clone + Display,
{
    fn new(role: &'static str) -> Self {
        Self {
            role,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    async fn insert(&self, key: K, slot: Arc<ConnectionSlot>) -> Option<Arc<ConnectionSlot>> {
        self.sessions.write().await.insert(key, slot)
    }

    async fn remove(&self, key: &K) -> bool {
        self.sessions.write().await.remove(key).is_some()
    }

    async fn remove_session(&self, key: &K, session_id: SessionId) -> bool {
        let mut sessions = self.sessions.write().await;
        match sessions.get(key) {
            Some(slot) if slot.session_id == session_id => {
                sessions.remove(key);
                true
            }
            _ => false,
        }
    }

    async fn get(&self, key: &K) -> Option<Arc<ConnectionSlot>> {
        self.sessions.read().await.get(key).cloned()
    }

    async fn matching<F>(&self, predicate: F) -> Vec<(K, Arc<ConnectionSlot>)>
    where
        F: Fn(&K, &ConnectionSlot) -> bool,
    {
        self.sessions
            .read()
            .await
            .iter()
            .filter(|(key, slot)| predicate(key, slot))
            .map(|(key, slot)| (key.clone(), Arc::clone(slot)))
            .collect()
    }

    async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    async fn deliver(&self, key: &K, slot: &ConnectionSlot, text: String) -> NotifyOutcome {
        match slot.send(OutboundFrame::Text(text)).await {
            Ok(()) => NotifyOutcome::Delivered,
            Err(err) => {
                warn!(
                    role = self.role,
                    id = %key,
                    session = %slot.session_id,
                    error = %err,
                    "client write failed; deregistering session"
                );
                self.remove_session(key, slot.session_id).await;
                NotifyOutcome::Failed
            }
        }
    }

    async fn notify(&self, key: &K, message: &ClientMessage) -> NotifyOutcome {
        let Some(slot) = self.get(key).await else {
            debug!(role = self.role, id = %key, kind = ?message.kind, "no connection; dropping message");
            return NotifyOutcome::NoConnection;
        };
        let text = match message.to_text() {
            Ok(text) => text,
            Err(err) => {
                error!(error = %err, kind = ?message.kind, "failed to encode client message");
                return NotifyOutcome::Failed;
            }
        };
        self.deliver(key, &slot, text).await
    }
}

/// Live driver and rider connections.
pub struct NotificationHub {
    drivers: Registry<DriverId>,
    riders: Registry<RiderId>,
    next_session: AtomicU64,
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationHub {
    #[must_use]
    pub fn new() -> Self {
        Self {
            drivers: Registry::new("driver"),
            riders: Registry::new("rider"),
            next_session: AtomicU64::new(1),
        }
    }

    fn new_slot(
        &self,
        package: Option<PackageCategory>,
        connection: Box<dyn ClientConnection>,
    ) -> Arc<ConnectionSlot> {
        Arc::new(ConnectionSlot {
            session_id: SessionId(self.next_session.fetch_add(1, Ordering::Relaxed)),
            package,
            writer: Mutex::new(connection),
        })
    }

    async fn close_replaced(role: &str, id: &dyn Display, replaced: Option<Arc<ConnectionSlot>>) {
        if let Some(old) = replaced {
            info!(role, id = %id, session = %old.session_id, "closing replaced session");
            old.close(Some("replaced by a newer connection".to_owned()))
                .await;
        }
    }

    /// Register a driver connection for the given package.
    pub async fn register_driver(
        &self,
        driver_id: DriverId,
        package: PackageCategory,
        connection: Box<dyn ClientConnection>,
    ) -> ConnectionHandle {
        let slot = self.new_slot(Some(package), connection);
        info!(driver_id = %driver_id, %package, session = %slot.session_id, "driver connected");
        let replaced = self.drivers.insert(driver_id.clone(), Arc::clone(&slot)).await;
        Self::close_replaced("driver", &driver_id, replaced).await;
        ConnectionHandle { slot }
    }

    /// Register a rider connection.
    pub async fn register_rider(
        &self,
        rider_id: RiderId,
        connection: Box<dyn ClientConnection>,
    ) -> ConnectionHandle {
        let slot = self.new_slot(None, connection);
        info!(rider_id = %rider_id, session = %slot.session_id, "rider connected");
        let replaced = self.riders.insert(rider_id.clone(), Arc::clone(&slot)).await;
        Self::close_replaced("rider", &rider_id, replaced).await;
        ConnectionHandle { slot }
    }

    /// Remove a driver regardless of session; a no-op if absent.
    pub async fn unregister_driver(&self, driver_id: &DriverId) -> bool {
        self.drivers.remove(driver_id).await
    }

    /// Remove a rider regardless of session; a no-op if absent.
    pub async fn unregister_rider(&self, rider_id: &RiderId) -> bool {
        self.riders.remove(rider_id).await
    }

    /// Remove the driver only if `handle` is still their current session.
    pub async fn release_driver(&self, driver_id: &DriverId, handle: &ConnectionHandle) -> bool {
        self.drivers
            .remove_session(driver_id, handle.session_id())
            .await
    }

    /// Remove the rider only if `handle` is still their current session.
    pub async fn release_rider(&self, rider_id: &RiderId, handle: &ConnectionHandle) -> bool {
        self.riders
            .remove_session(rider_id, handle.session_id())
            .await
    }

    /// Push a message to one driver.
    pub async fn notify_driver(&self, driver_id: &DriverId, message: &ClientMessage) -> NotifyOutcome {
        self.drivers.notify(driver_id, message).await
    }

    /// Push a message to one rider.
    pub async fn notify_rider(&self, rider_id: &RiderId, message: &ClientMessage) -> NotifyOutcome {
        self.riders.notify(rider_id, message).await
    }

    /// Push a message to every driver matching `predicate`. Each delivery is
    /// independent; a failed write only deregisters that driver.
    pub async fn broadcast_to_drivers<F>(&self, predicate: F, message: &ClientMessage) -> BroadcastReport
    where
        F: Fn(&DriverId, Option<PackageCategory>) -> bool,
    {
        let targets = self
            .drivers
            .matching(|id, slot| predicate(id, slot.package))
            .await;
        if targets.is_empty() {
            debug!(kind = ?message.kind, "broadcast matched no drivers");
            return BroadcastReport::default();
        }
        let text = match message.to_text() {
            Ok(text) => text,
            Err(err) => {
                error!(error = %err, kind = ?message.kind, "failed to encode client message");
                return BroadcastReport {
                    delivered: 0,
                    failed: targets.len(),
                };
            }
        };

        let outcomes = join_all(
            targets
                .iter()
                .map(|(id, slot)| self.drivers.deliver(id, slot, text.clone())),
        )
        .await;

        outcomes
            .into_iter()
            .fold(BroadcastReport::default(), |mut report, outcome| {
                if outcome == NotifyOutcome::Delivered {
                    report.delivered += 1;
                } else {
                    report.failed += 1;
                }
                report
            })
    }

    pub async fn driver_count(&self) -> usize {
        self.drivers.len().await
    }

    pub async fn rider_count(&self) -> usize {
        self.riders.len().await
    }
}

#[cfg(test)]
#[path = "notification_hub_tests.rs"]
mod tests;
