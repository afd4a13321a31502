//! Per-connection WebSocket read loop.
//!
//! Every write, including heartbeat pings and pongs, goes through the
//! session's [`ConnectionHandle`] so it shares the hub's single-writer lock
//! with notifications. The public contract pings every 5s and considers a
//! connection idle after 10s without client traffic; tests shorten both.
//! Teardown releases the hub registration before the loop returns.

use std::sync::Arc;
use std::time::{Duration, Instant};

use actix_ws::{Message, MessageStream, ProtocolError, Session};
use tokio::time;
use tracing::{debug, info, warn};

use crate::domain::notifications::client_message;
use crate::domain::ports::OutboundFrame;
use crate::domain::{
    ClientMessageKind, ConnectionHandle, Driver, EventPublisher, NotificationHub, RiderId,
    TraceId,
};
use crate::inbound::ws::connection::ActixClientConnection;
use crate::inbound::ws::messages::DriverCommand;
use crate::inbound::ws::state::WsState;

/// Time between heartbeats to the client (5s in production, shorter in tests).
#[cfg(not(test))]
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);
#[cfg(test)]
const HEARTBEAT_INTERVAL: Duration = Duration::from_millis(50);

/// Max idle time before disconnecting the client (10s in production, shorter in tests).
#[cfg(not(test))]
const CLIENT_TIMEOUT: Duration = Duration::from_secs(10);
#[cfg(test)]
const CLIENT_TIMEOUT: Duration = Duration::from_millis(100);

enum Participant {
    Driver(Driver),
    Rider(RiderId),
}

enum SessionEnd {
    ClientClosed,
    StreamClosed,
    HeartbeatTimeout,
    Protocol(ProtocolError),
    Network,
}

impl SessionEnd {
    fn close_reason(&self) -> Option<&'static str> {
        match self {
            Self::HeartbeatTimeout => Some("heartbeat timeout"),
            Self::Protocol(_) => Some("protocol error"),
            Self::ClientClosed => Some("closed by client"),
            Self::StreamClosed | Self::Network => None,
        }
    }
}

struct WsSession {
    participant: Participant,
    handle: ConnectionHandle,
    hub: Arc<NotificationHub>,
    publisher: Arc<EventPublisher>,
}

/// Register the driver, push their record, then serve the connection.
pub(super) async fn run_driver_session(
    state: WsState,
    driver: Driver,
    session: Session,
    stream: MessageStream,
) {
    let connection = Box::new(ActixClientConnection::new(session));
    let handle = state
        .hub
        .register_driver(driver.id.clone(), driver.package, connection)
        .await;

    match client_message(ClientMessageKind::DriverRegister, &driver) {
        Ok(message) => {
            if handle.send_message(&message).await.is_err() {
                warn!(driver_id = %driver.id, "driver left before registration was sent");
            }
        }
        Err(err) => warn!(driver_id = %driver.id, error = %err, "failed to encode driver record"),
    }

    WsSession {
        participant: Participant::Driver(driver),
        handle,
        hub: state.hub,
        publisher: state.publisher,
    }
    .run(stream)
    .await;
}

/// Register the rider and serve the connection. Riders only listen.
pub(super) async fn run_rider_session(
    state: WsState,
    rider_id: RiderId,
    session: Session,
    stream: MessageStream,
) {
    let connection = Box::new(ActixClientConnection::new(session));
    let handle = state.hub.register_rider(rider_id.clone(), connection).await;

    WsSession {
        participant: Participant::Rider(rider_id),
        handle,
        hub: state.hub,
        publisher: state.publisher,
    }
    .run(stream)
    .await;
}

impl WsSession {
    async fn run(self, mut stream: MessageStream) {
        let mut last_heartbeat = Instant::now();
        let mut heartbeat = time::interval(HEARTBEAT_INTERVAL);

        let end = loop {
            let result = tokio::select! {
                _ = heartbeat.tick() => self.handle_heartbeat_tick(last_heartbeat).await,
                message = stream.recv() => {
                    self.handle_stream_message(&mut last_heartbeat, message).await
                }
            };
            if let Err(end) = result {
                break end;
            }
        };

        self.log_shutdown_reason(&end);
        self.release().await;
        if let Some(reason) = end.close_reason() {
            self.handle.close(Some(reason.to_owned())).await;
        }
    }

    async fn release(&self) {
        let session = self.handle.session_id();
        let released = match &self.participant {
            Participant::Driver(driver) => self.hub.release_driver(&driver.id, &self.handle).await,
            Participant::Rider(rider_id) => self.hub.release_rider(rider_id, &self.handle).await,
        };
        if !released {
            debug!(%session, "session already replaced or removed");
            return;
        }
        info!(
            %session,
            drivers_online = self.hub.driver_count().await,
            riders_online = self.hub.rider_count().await,
            "session released"
        );
    }

    async fn handle_heartbeat_tick(&self, last_heartbeat: Instant) -> Result<(), SessionEnd> {
        if Instant::now().duration_since(last_heartbeat) > CLIENT_TIMEOUT {
            return Err(SessionEnd::HeartbeatTimeout);
        }
        self.handle
            .send(OutboundFrame::Ping(Vec::new()))
            .await
            .map_err(|_| SessionEnd::Network)
    }

    async fn handle_stream_message(
        &self,
        last_heartbeat: &mut Instant,
        message: Option<Result<Message, ProtocolError>>,
    ) -> Result<(), SessionEnd> {
        let Some(message) = message else {
            return Err(SessionEnd::StreamClosed);
        };
        let message = message.map_err(SessionEnd::Protocol)?;
        *last_heartbeat = Instant::now();

        match message {
            Message::Ping(payload) => self
                .handle
                .send(OutboundFrame::Pong(payload.to_vec()))
                .await
                .map_err(|_| SessionEnd::Network),
            Message::Text(text) => {
                self.handle_text(text.as_ref()).await;
                Ok(())
            }
            Message::Pong(_) | Message::Binary(_) | Message::Continuation(_) | Message::Nop => {
                Ok(())
            }
            Message::Close(_) => Err(SessionEnd::ClientClosed),
        }
    }

    async fn handle_text(&self, text: &str) {
        let Participant::Driver(driver) = &self.participant else {
            debug!("ignoring frame from rider connection");
            return;
        };
        let command = match serde_json::from_str::<DriverCommand>(text) {
            Ok(command) => command,
            Err(err) => {
                warn!(driver_id = %driver.id, error = %err, "ignoring unrecognised driver frame");
                return;
            }
        };

        let event = command.into_event(driver);
        let kind = event.kind();
        let trip_id = event.trip_id();
        let outcome = TraceId::scope(TraceId::generate(), self.publisher.publish(event)).await;
        if let Some(warning) = outcome.warning() {
            warn!(driver_id = %driver.id, %kind, %trip_id, %warning, "driver frame dropped");
        } else {
            debug!(driver_id = %driver.id, %kind, %trip_id, "driver frame forwarded");
        }
    }

    fn log_shutdown_reason(&self, end: &SessionEnd) {
        let session = self.handle.session_id();
        match end {
            SessionEnd::HeartbeatTimeout => {
                warn!(%session, "WebSocket heartbeat timeout; closing connection");
            }
            SessionEnd::Protocol(error) => {
                warn!(%session, error = %error, "WebSocket protocol error");
            }
            SessionEnd::Network => {
                warn!(%session, "WebSocket send failed; closing connection");
            }
            SessionEnd::ClientClosed | SessionEnd::StreamClosed => {
                info!(%session, "WebSocket closed");
            }
        }
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
