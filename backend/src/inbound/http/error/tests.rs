//! Tests for HTTP error mapping.

use super::*;
use actix_web::ResponseError;
use actix_web::body::to_bytes;
use actix_web::http::StatusCode;
use rstest::{fixture, rstest};
use serde_json::{Value, json};

const TRACE_ID: &str = "00000000-0000-0000-0000-000000000000";

#[fixture]
fn internal_error() -> Error {
    Error::internal("connection pool exhausted: 10/10 in use")
        .with_trace_id(TRACE_ID)
        .with_details(json!({"secret": "x"}))
}

async fn body_of(error: &Error) -> (StatusCode, actix_web::http::header::HeaderMap, Value) {
    let response = ResponseError::error_response(error);
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body())
        .await
        .expect("reading response body succeeds");
    let body = serde_json::from_slice(&bytes).expect("error JSON parses");
    (status, headers, body)
}

#[rstest]
#[case(Error::invalid_param("bad"), StatusCode::BAD_REQUEST)]
#[case(Error::missing_idempotency_key("missing"), StatusCode::BAD_REQUEST)]
#[case(Error::unauthorized("login"), StatusCode::UNAUTHORIZED)]
#[case(Error::not_found("missing"), StatusCode::NOT_FOUND)]
#[case(Error::already_accepted("dup"), StatusCode::CONFLICT)]
#[case(Error::already_used("dup"), StatusCode::CONFLICT)]
#[case(Error::conflict("race"), StatusCode::CONFLICT)]
#[case(Error::expired("gone"), StatusCode::GONE)]
#[case(Error::invalid_token("bad"), StatusCode::UNPROCESSABLE_ENTITY)]
#[case(Error::rate_limited("slow down", 3), StatusCode::TOO_MANY_REQUESTS)]
#[case(Error::internal("boom"), StatusCode::INTERNAL_SERVER_ERROR)]
fn status_code_matches_error_code(#[case] error: Error, #[case] status: StatusCode) {
    assert_eq!(ResponseError::status_code(&error), status);
}

#[rstest]
#[actix_web::test]
async fn server_errors_are_redacted_but_keep_trace_id(internal_error: Error) {
    let (status, headers, body) = body_of(&internal_error).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        headers
            .get(TRACE_ID_HEADER)
            .and_then(|value| value.to_str().ok()),
        Some(TRACE_ID)
    );
    assert_eq!(
        body,
        json!({
            "code": "server_error",
            "message": REDACTED_MESSAGE,
            "traceId": TRACE_ID,
        })
    );
}

#[rstest]
#[actix_web::test]
async fn client_errors_keep_message_and_details() {
    let error = Error::already_accepted("offer has already been accepted")
        .with_trace_id(TRACE_ID)
        .with_details(json!({"voucherId": "v-1"}));
    let (_, _, body) = body_of(&error).await;

    assert_eq!(body["code"], "already_accepted");
    assert_eq!(body["message"], "offer has already been accepted");
    assert_eq!(body["details"], json!({"voucherId": "v-1"}));
}

#[rstest]
#[actix_web::test]
async fn rate_limited_sets_retry_after() {
    let error = Error::rate_limited("Too many requests. Limit: 3/60s. Reset in 42s", 42)
        .without_trace_id();
    let (status, headers, body) = body_of(&error).await;

    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        headers
            .get(header::RETRY_AFTER)
            .and_then(|value| value.to_str().ok()),
        Some("42")
    );
    assert!(headers.get(TRACE_ID_HEADER).is_none());
    assert_eq!(body["details"]["retryAfterSeconds"], 42);
}
