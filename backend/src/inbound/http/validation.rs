//! Field validation helpers for request payloads.
//!
//! Failures are `invalid_request` errors whose details name the offending
//! field, so clients can highlight it.

use std::str::FromStr;

use serde_json::json;

use crate::domain::{Error, RiderId};

pub(crate) fn field_error(field: &str, message: impl Into<String>) -> Error {
    Error::invalid_request(message).with_details(json!({ "field": field }))
}

pub(crate) fn parse_rider_id(value: String, field: &str) -> Result<RiderId, Error> {
    RiderId::new(value).map_err(|err| field_error(field, err.to_string()))
}

/// Parse an identifier such as a fare or trip id.
pub(crate) fn parse_id<T: FromStr>(value: &str, field: &str) -> Result<T, Error> {
    value
        .parse()
        .map_err(|_| field_error(field, format!("{field} must be a valid UUID")))
}
