//! Port for writing to one live client connection.
//!
//! The notification hub owns each connection behind a mutex, so an
//! implementation only ever sees one writer at a time.

use async_trait::async_trait;

use super::define_port_error;

define_port_error! {
    /// Errors raised while writing to a client.
    pub enum ConnectionWriteError {
        /// The peer is gone; the connection must be deregistered.
        Closed => "client connection closed",
    }
}

/// A frame written to a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    Text(String),
    Ping(Vec<u8>),
    Pong(Vec<u8>),
}

/// Write half of a client connection.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ClientConnection: Send {
    /// Write one frame.
    async fn send(&mut self, frame: OutboundFrame) -> Result<(), ConnectionWriteError>;

    /// Close the connection with an optional human-readable reason.
    async fn close(&mut self, reason: Option<String>);
}
