//! OpenAPI documentation for the trip RPCs and health checks.
//!
//! Served by Swagger UI in debug builds.

use utoipa::OpenApi;

use crate::domain::{
    Coordinate, Driver, Error, ErrorCode, PackageCategory, RideFare, Route, Trip, TripStatus,
};
use crate::inbound::http::trips::{
    CancelTripBody, CancelTripResponse, PreviewTripBody, StartTripBody, StartTripResponse,
    TripPreviewResponse,
};

/// OpenAPI document for the HTTP API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Trip dispatch API",
        description = "Fare previews, trip start and cancellation, and health checks."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    paths(
        crate::inbound::http::trips::preview_trip,
        crate::inbound::http::trips::start_trip,
        crate::inbound::http::trips::cancel_trip,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        Error,
        ErrorCode,
        Coordinate,
        Route,
        RideFare,
        PackageCategory,
        Driver,
        Trip,
        TripStatus,
        PreviewTripBody,
        TripPreviewResponse,
        StartTripBody,
        StartTripResponse,
        CancelTripBody,
        CancelTripResponse,
    )),
    tags(
        (name = "trips", description = "Rider-facing trip operations"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;
