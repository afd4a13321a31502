//! Shared WebSocket adapter state.

use std::sync::Arc;

use crate::domain::{EventPublisher, NotificationHub};

/// Dependency bundle for the WebSocket entry points and sessions.
#[derive(Clone)]
pub struct WsState {
    pub hub: Arc<NotificationHub>,
    pub publisher: Arc<EventPublisher>,
}

impl WsState {
    pub fn new(hub: Arc<NotificationHub>, publisher: Arc<EventPublisher>) -> Self {
        Self { hub, publisher }
    }
}
