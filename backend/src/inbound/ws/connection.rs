//! [`ClientConnection`] over an `actix-ws` session.

use actix_ws::{CloseCode, CloseReason, Session};
use async_trait::async_trait;
use tracing::debug;

use crate::domain::ports::{ClientConnection, ConnectionWriteError, OutboundFrame};

/// Write half of one WebSocket.
pub struct ActixClientConnection {
    session: Session,
}

impl ActixClientConnection {
    pub fn new(session: Session) -> Self {
        Self { session }
    }
}

#[async_trait]
impl ClientConnection for ActixClientConnection {
    async fn send(&mut self, frame: OutboundFrame) -> Result<(), ConnectionWriteError> {
        let result = match frame {
            OutboundFrame::Text(text) => self.session.text(text).await,
            OutboundFrame::Ping(payload) => self.session.ping(&payload).await,
            OutboundFrame::Pong(payload) => self.session.pong(&payload).await,
        };
        result.map_err(|_| ConnectionWriteError::closed())
    }

    async fn close(&mut self, reason: Option<String>) {
        let reason = reason.map(|description| CloseReason {
            code: CloseCode::Normal,
            description: Some(description),
        });
        if self.session.clone().close(reason).await.is_err() {
            debug!("websocket already closed");
        }
    }
}
