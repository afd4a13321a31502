//! Inbound driver frames.
//!
//! Drivers send `{"type": <command>, "data": {...}}`. The driver identity is
//! never read from the frame; the session supplies it.

use serde::Deserialize;

use crate::domain::{
    Coordinate, DispatchEvent, Driver, DriverAccepted, DriverLocation, DriverStatusReported,
    TripId, TripStatus,
};

/// Commands a connected driver may send.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum DriverCommand {
    #[serde(rename = "driver.cmd.trip_accept")]
    TripAccept {
        #[serde(rename = "tripID")]
        trip_id: TripId,
    },
    #[serde(rename = "driver.cmd.trip_status")]
    TripStatus {
        #[serde(rename = "tripID")]
        trip_id: TripId,
        status: TripStatus,
    },
    #[serde(rename = "driver.cmd.location")]
    Location {
        #[serde(rename = "tripID")]
        trip_id: TripId,
        location: Coordinate,
    },
}

impl DriverCommand {
    /// Event to publish on behalf of `driver`.
    pub fn into_event(self, driver: &Driver) -> DispatchEvent {
        match self {
            Self::TripAccept { trip_id } => DispatchEvent::DriverAccepted(DriverAccepted {
                trip_id,
                driver: driver.clone(),
            }),
            Self::TripStatus { trip_id, status } => {
                DispatchEvent::DriverStatusReported(DriverStatusReported {
                    trip_id,
                    driver_id: driver.id.clone(),
                    status,
                })
            }
            Self::Location { trip_id, location } => DispatchEvent::DriverLocation(DriverLocation {
                trip_id,
                driver_id: driver.id.clone(),
                location,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DriverId, EventKind, PackageCategory};
    use rstest::rstest;
    use serde_json::json;

    fn driver() -> Driver {
        Driver::for_connection(DriverId::new("driver-1").expect("id"), PackageCategory::Van)
    }

    #[rstest]
    #[case(json!({"type": "driver.cmd.trip_accept", "data": {"tripID": TripId::random()}}), EventKind::DriverAccepted)]
    #[case(json!({"type": "driver.cmd.trip_status", "data": {"tripID": TripId::random(), "status": "ongoing"}}), EventKind::DriverStatusReported)]
    #[case(json!({"type": "driver.cmd.location", "data": {"tripID": TripId::random(), "location": {"latitude": 1.0, "longitude": 2.0}}}), EventKind::DriverLocation)]
    fn commands_map_to_driver_events(#[case] frame: serde_json::Value, #[case] kind: EventKind) {
        let command: DriverCommand = serde_json::from_value(frame).expect("command");
        assert_eq!(command.into_event(&driver()).kind(), kind);
    }

    #[rstest]
    fn acceptance_carries_the_session_driver() {
        let trip_id = TripId::random();
        let command = DriverCommand::TripAccept { trip_id };

        let DispatchEvent::DriverAccepted(accepted) = command.into_event(&driver()) else {
            panic!("expected acceptance");
        };
        assert_eq!(accepted.driver, driver());
        assert_eq!(accepted.trip_id, trip_id);
    }

    #[rstest]
    #[case(json!({"type": "driver.cmd.honk", "data": {}}))]
    #[case(json!({"type": "driver.cmd.location", "data": {"tripID": "x"}}))]
    fn unknown_or_incomplete_frames_do_not_parse(#[case] frame: serde_json::Value) {
        assert!(serde_json::from_value::<DriverCommand>(frame).is_err());
    }
}
