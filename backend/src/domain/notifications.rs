//! Messages pushed to connected riders and drivers.
//!
//! Every frame is a JSON object `{"type": <kind>, "data": <payload>}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Error;

/// Kind tag of a pushed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClientMessageKind {
    /// Rider: their trip was created.
    #[serde(rename = "trip.event.created")]
    TripCreated,
    /// Rider: a driver was assigned to their trip.
    #[serde(rename = "trip.event.driver_assigned")]
    DriverAssigned,
    /// Rider or driver: the trip moved to a new status.
    #[serde(rename = "trip.event.status_changed")]
    TripStatusChanged,
    /// Rider: the assigned driver's position.
    #[serde(rename = "trip.event.driver_location")]
    DriverLocation,
    /// Driver: registration acknowledgement with the driver record.
    #[serde(rename = "driver.cmd.register")]
    DriverRegister,
    /// Driver: a trip matching their package awaits acceptance.
    #[serde(rename = "driver.cmd.trip_request")]
    TripRequest,
    /// Driver: their acceptance won the trip.
    #[serde(rename = "driver.cmd.trip_assigned")]
    TripAssigned,
}

/// A message ready to be written to a client connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientMessage {
    #[serde(rename = "type")]
    pub kind: ClientMessageKind,
    pub data: Value,
}

impl ClientMessage {
    /// Build a message from any serialisable payload.
    pub fn new<T: Serialize>(kind: ClientMessageKind, data: &T) -> Result<Self, serde_json::Error> {
        Ok(Self {
            kind,
            data: serde_json::to_value(data)?,
        })
    }

    /// Encode as a text frame body.
    pub fn to_text(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Build a message, reporting encoding failures as internal errors.
pub(crate) fn client_message<T: Serialize>(
    kind: ClientMessageKind,
    data: &T,
) -> Result<ClientMessage, Error> {
    ClientMessage::new(kind, data)
        .map_err(|err| Error::internal(format!("failed to encode {kind:?} message: {err}")))
}
