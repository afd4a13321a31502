//! Tests for HTTP error mapping.

use super::*;
use actix_web::body::to_bytes;
use actix_web::http::StatusCode;
use actix_web::{App, HttpResponse, ResponseError, test as actix_test};
use rstest::{fixture, rstest};
use serde::Deserialize;
use serde_json::json;

const TRACE_ID: &str = "00000000-0000-0000-0000-000000000000";

#[fixture]
fn internal_error() -> Error {
    Error::internal("database password rejected")
        .with_trace_id(TRACE_ID)
        .with_details(json!({"secret": "x"}))
}

#[rstest]
#[case(Error::invalid_request("bad"), StatusCode::BAD_REQUEST)]
#[case(Error::forbidden("not yours"), StatusCode::FORBIDDEN)]
#[case(Error::not_found("missing"), StatusCode::NOT_FOUND)]
#[case(Error::conflict("already assigned"), StatusCode::CONFLICT)]
#[case(Error::service_unavailable("router down"), StatusCode::SERVICE_UNAVAILABLE)]
#[case(Error::internal("boom"), StatusCode::INTERNAL_SERVER_ERROR)]
fn status_code_matches_error_code(#[case] error: Error, #[case] status: StatusCode) {
    assert_eq!(ResponseError::status_code(&error), status);
}

async fn response_body(error: &Error) -> (StatusCode, Option<String>, Error) {
    let response = ResponseError::error_response(error);
    let status = response.status();
    let header = response
        .headers()
        .get(TRACE_ID_HEADER)
        .map(|value| value.to_str().expect("ascii header").to_owned());
    let bytes = to_bytes(response.into_body())
        .await
        .expect("reading response body succeeds");
    let body = serde_json::from_slice(&bytes).expect("Error JSON deserialisation succeeds");
    (status, header, body)
}

#[rstest]
#[actix_web::test]
async fn internal_errors_are_redacted(internal_error: Error) {
    let (status, header, body) = response_body(&internal_error).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(header.as_deref(), Some(TRACE_ID));
    assert_eq!(body.message(), "Internal server error");
    assert!(body.details().is_none());
    assert_eq!(body.trace_id(), Some(TRACE_ID));
}

#[rstest]
#[actix_web::test]
async fn validation_errors_keep_message_and_details() {
    let error = Error::invalid_request("userID must not be empty")
        .with_details(json!({"field": "userID"}));

    let (status, header, body) = response_body(&error).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(header.is_none());
    assert_eq!(body, error);
}

#[derive(Debug, Deserialize)]
struct Probe {
    #[allow(dead_code)]
    value: u32,
}

#[actix_web::test]
async fn malformed_json_becomes_invalid_request() {
    let app = actix_test::init_service(App::new().app_data(json_config()).route(
        "/",
        actix_web::web::post().to(|_: actix_web::web::Json<Probe>| async {
            HttpResponse::Ok().finish()
        }),
    ))
    .await;

    let request = actix_test::TestRequest::post()
        .uri("/")
        .insert_header(("content-type", "application/json"))
        .set_payload("{\"value\": \"nope\"}")
        .to_request();
    let response = actix_test::call_service(&app, request).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Error = actix_test::read_body_json(response).await;
    assert_eq!(body.code(), ErrorCode::InvalidRequest);
}
