//! WebSocket inbound adapter for drivers and riders.
//!
//! Responsibilities:
//! - validate the connecting identity from the query string
//! - upgrade the connection and hand it to a per-connection read loop
//! - keep WebSocket framing at the edge; pushes go through the
//!   [`NotificationHub`](crate::domain::NotificationHub)

use actix_web::web::{self, Payload};
use actix_web::{HttpRequest, HttpResponse, get};
use serde::Deserialize;
use tracing::error;

use crate::domain::{Driver, DriverId, Error, PackageCategory};
use crate::inbound::http::ApiResult;
use crate::inbound::http::validation::{field_error, parse_rider_id};

mod connection;
mod session;

pub mod messages;
pub mod state;

pub use connection::ActixClientConnection;

#[derive(Debug, Deserialize)]
pub struct DriverQuery {
    #[serde(rename = "userID")]
    pub user_id: String,
    #[serde(rename = "packageSlug")]
    pub package_slug: String,
}

#[derive(Debug, Deserialize)]
pub struct RiderQuery {
    #[serde(rename = "userID")]
    pub user_id: String,
}

fn parse_driver(query: DriverQuery) -> Result<Driver, Error> {
    let driver_id =
        DriverId::new(query.user_id).map_err(|err| field_error("userID", err.to_string()))?;
    let package = query
        .package_slug
        .parse::<PackageCategory>()
        .map_err(|err| field_error("packageSlug", err.to_string()))?;
    Ok(Driver::for_connection(driver_id, package))
}

fn upgrade(
    req: &HttpRequest,
    stream: Payload,
) -> Result<(HttpResponse, actix_ws::Session, actix_ws::MessageStream), Error> {
    actix_ws::handle(req, stream).map_err(|err| {
        error!(error = %err, "WebSocket upgrade failed");
        Error::invalid_request("WebSocket upgrade failed")
    })
}

/// Driver connection: `GET /ws/drivers?userID=..&packageSlug=..`.
#[get("/ws/drivers")]
pub async fn driver_entry(
    state: web::Data<state::WsState>,
    query: web::Query<DriverQuery>,
    req: HttpRequest,
    stream: Payload,
) -> ApiResult<HttpResponse> {
    let driver = parse_driver(query.into_inner())?;
    let (response, session, messages) = upgrade(&req, stream)?;
    actix_web::rt::spawn(session::run_driver_session(
        state.get_ref().clone(),
        driver,
        session,
        messages,
    ));
    Ok(response)
}

/// Rider connection: `GET /ws/riders?userID=..`.
#[get("/ws/riders")]
pub async fn rider_entry(
    state: web::Data<state::WsState>,
    query: web::Query<RiderQuery>,
    req: HttpRequest,
    stream: Payload,
) -> ApiResult<HttpResponse> {
    let rider_id = parse_rider_id(query.into_inner().user_id, "userID")?;
    let (response, session, messages) = upgrade(&req, stream)?;
    actix_web::rt::spawn(session::run_rider_session(
        state.get_ref().clone(),
        rider_id,
        session,
        messages,
    ));
    Ok(response)
}
