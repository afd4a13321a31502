//! Rider-facing trip RPC handlers.
//!
//! ```text
//! POST /trip/preview {userID, pickup, destination} -> 201 {data: {route, rideFares}}
//! POST /trip/start   {rideFareID, userID}          -> 201 {data: {tripID, warnings?}}
//! POST /trip/cancel  {tripID, userID}              -> 200 {data: {trip, warnings?}}
//! ```

use actix_web::{HttpResponse, post, web};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use crate::domain::ports::{CancelTripRequest, PreviewTripRequest, StartTripRequest};
use crate::domain::{Coordinate, Error, RideFare, Route, Trip, TripId};
use crate::inbound::http::ApiResult;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{parse_id, parse_rider_id};

/// Successful responses wrap their payload in `data`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DataEnvelope<T> {
    pub data: T,
}

impl<T> DataEnvelope<T> {
    fn new(data: T) -> Self {
        Self { data }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct PreviewTripBody {
    #[serde(rename = "userID")]
    pub user_id: String,
    pub pickup: Coordinate,
    pub destination: Coordinate,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TripPreviewResponse {
    pub route: Route,
    pub ride_fares: Vec<RideFare>,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct StartTripBody {
    #[serde(rename = "rideFareID")]
    pub ride_fare_id: String,
    #[serde(rename = "userID")]
    pub user_id: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StartTripResponse {
    #[serde(rename = "tripID")]
    pub trip_id: TripId,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct CancelTripBody {
    #[serde(rename = "tripID")]
    pub trip_id: String,
    #[serde(rename = "userID")]
    pub user_id: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CancelTripResponse {
    pub trip: Trip,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

fn parse_preview(body: PreviewTripBody) -> Result<PreviewTripRequest, Error> {
    Ok(PreviewTripRequest {
        rider_id: parse_rider_id(body.user_id, "userID")?,
        pickup: body.pickup,
        destination: body.destination,
    })
}

fn parse_start(body: StartTripBody) -> Result<StartTripRequest, Error> {
    Ok(StartTripRequest {
        fare_id: parse_id(&body.ride_fare_id, "rideFareID")?,
        rider_id: parse_rider_id(body.user_id, "userID")?,
    })
}

fn parse_cancel(body: CancelTripBody) -> Result<CancelTripRequest, Error> {
    Ok(CancelTripRequest {
        trip_id: parse_id(&body.trip_id, "tripID")?,
        rider_id: parse_rider_id(body.user_id, "userID")?,
    })
}

/// Quote every package for the route between pickup and destination.
#[utoipa::path(
    post,
    path = "/trip/preview",
    request_body = PreviewTripBody,
    responses(
        (status = 201, description = "Route and persisted quotes", body = DataEnvelope<TripPreviewResponse>),
        (status = 400, description = "Invalid request", body = Error),
        (status = 503, description = "Route provider or store unavailable", body = Error)
    ),
    tags = ["trips"]
)]
#[post("/trip/preview")]
pub async fn preview_trip(
    state: web::Data<HttpState>,
    payload: web::Json<PreviewTripBody>,
) -> ApiResult<HttpResponse> {
    let request = parse_preview(payload.into_inner())?;
    let preview = state.dispatch.preview_trip(request).await?;
    Ok(HttpResponse::Created().json(DataEnvelope::new(TripPreviewResponse {
        route: preview.route,
        ride_fares: preview.fares,
    })))
}

/// Start a trip from a quote the rider owns.
#[utoipa::path(
    post,
    path = "/trip/start",
    request_body = StartTripBody,
    responses(
        (status = 201, description = "Trip created", body = DataEnvelope<StartTripResponse>),
        (status = 400, description = "Invalid request", body = Error),
        (status = 403, description = "Fare belongs to another rider", body = Error),
        (status = 404, description = "Fare not found", body = Error),
        (status = 409, description = "Fare already used", body = Error)
    ),
    tags = ["trips"]
)]
#[post("/trip/start")]
pub async fn start_trip(
    state: web::Data<HttpState>,
    payload: web::Json<StartTripBody>,
) -> ApiResult<HttpResponse> {
    let request = parse_start(payload.into_inner())?;
    let receipt = state.dispatch.start_trip(request).await?;
    info!(trip_id = %receipt.trip.id, rider_id = %receipt.trip.rider_id, "trip started");
    Ok(HttpResponse::Created().json(DataEnvelope::new(StartTripResponse {
        trip_id: receipt.trip.id,
        warnings: receipt.warnings,
    })))
}

/// Cancel a pending or assigned trip.
#[utoipa::path(
    post,
    path = "/trip/cancel",
    request_body = CancelTripBody,
    responses(
        (status = 200, description = "Trip cancelled", body = DataEnvelope<CancelTripResponse>),
        (status = 403, description = "Trip belongs to another rider", body = Error),
        (status = 404, description = "Trip not found", body = Error),
        (status = 409, description = "Trip already started or finished", body = Error)
    ),
    tags = ["trips"]
)]
#[post("/trip/cancel")]
pub async fn cancel_trip(
    state: web::Data<HttpState>,
    payload: web::Json<CancelTripBody>,
) -> ApiResult<HttpResponse> {
    let request = parse_cancel(payload.into_inner())?;
    let receipt = state.dispatch.cancel_trip(request).await?;
    Ok(HttpResponse::Ok().json(DataEnvelope::new(CancelTripResponse {
        trip: receipt.trip,
        warnings: receipt.warnings,
    })))
}

#[cfg(test)]
#[path = "trips_tests.rs"]
mod tests;
