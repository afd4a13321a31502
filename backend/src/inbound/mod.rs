//! Inbound adapters translating external requests into domain calls while
//! keeping framework details at the edge.
//!
//! - [`http`]: trip RPCs and health checks.
//! - [`ws`]: driver and rider WebSocket connections.

pub mod http;
pub mod ws;
