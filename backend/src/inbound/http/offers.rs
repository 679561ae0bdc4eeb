//! Offer acceptance HTTP handler.
//!
//! ```text
//! POST /api/v1/offers/{id}/accept
//! ```
//!
//! The response is rendered from the stored idempotent reply, so a retry
//! with the same key returns the original status and body verbatim.

use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse, post, web};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::ports::AcceptOfferRequest;
use crate::domain::{Error, IdempotentReply, OfferId, RateLimitPolicy};
use crate::inbound::http::ApiResult;
use crate::inbound::http::idempotency::{IDEMPOTENCY_STATUS_HEADER, require_idempotency_key};
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, parse_id};

/// Response payload for an accepted offer.
#[derive(Debug, Serialize, ToSchema)]
pub struct AcceptOfferResponse {
    /// Voucher issued for the offer.
    #[schema(value_type = String, format = Uuid)]
    pub voucher_id: String,
    /// Active vouchers held by the user after acceptance.
    pub wallet_count: u64,
}

fn render_reply(reply: IdempotentReply) -> Result<HttpResponse, Error> {
    let status = StatusCode::from_u16(reply.response.status()).map_err(|err| {
        Error::internal(format!("stored response has invalid status: {err}"))
    })?;
    let marker = if reply.replayed { "hit" } else { "miss" };
    Ok(HttpResponse::build(status)
        .insert_header((IDEMPOTENCY_STATUS_HEADER, marker))
        .json(reply.response.body()))
}

/// Accept an inbox offer, issuing a voucher exactly once.
#[utoipa::path(
    post,
    path = "/api/v1/offers/{id}/accept",
    params(
        ("id" = String, Path, description = "Offer identifier"),
        ("Idempotency-Key" = String, Header, description = "UUID identifying this attempt")
    ),
    responses(
        (
            status = 201,
            description = "Voucher issued",
            headers(("X-Idempotency" = String, description = "hit when replayed, miss otherwise")),
            body = AcceptOfferResponse
        ),
        (status = 400, description = "Missing or malformed input", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 404, description = "Offer not in the user's inbox", body = ErrorSchema),
        (status = 409, description = "Already accepted or key reused", body = ErrorSchema),
        (status = 410, description = "Offer has ended", body = ErrorSchema),
        (status = 429, description = "Rate limited", body = ErrorSchema),
        (status = 500, description = "Internal server error", body = ErrorSchema)
    ),
    tags = ["offers"],
    operation_id = "acceptOffer"
)]
#[post("/offers/{id}/accept")]
pub async fn accept_offer(
    state: web::Data<HttpState>,
    session: SessionContext,
    request: HttpRequest,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let user_id = session.require_user_id()?;
    let offer_id: OfferId = parse_id(&path, FieldName::new("id"))?;
    let idempotency_key = require_idempotency_key(request.headers())?;
    let identity = user_id.to_string();

    // Replays are vetted against the budget but do not consume it.
    state
        .throttle
        .check(RateLimitPolicy::OFFER_ACCEPT, &identity)
        .await?;
    let reply = state
        .offers
        .accept_offer(AcceptOfferRequest {
            user_id,
            offer_id,
            idempotency_key,
        })
        .await?;
    if !reply.replayed {
        state
            .throttle
            .record(RateLimitPolicy::OFFER_ACCEPT, &identity)
            .await?;
    }

    render_reply(reply)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::App;
    use actix_web::test as actix_test;
    use rstest::rstest;
    use serde_json::{Value, json};

    use super::*;
    use crate::domain::ports::{MockOfferAcceptanceCommand, MockRequestThrottle};
    use crate::domain::{StoredResponse, UserId};
    use crate::inbound::http::test_utils::{login_cookie, test_app_with};

    const OFFER: &str = "0b6f2a4e-7c57-4d8e-9a36-5b1d8e4f6a10";
    const KEY: &str = "550e8400-e29b-41d4-a716-446655440000";

    fn throttle_expecting_record(records: usize) -> MockRequestThrottle {
        let mut throttle = MockRequestThrottle::new();
        throttle.expect_check().returning(|_, _| Ok(()));
        throttle.expect_record().times(records).returning(|_, _| Ok(()));
        throttle
    }

    #[rstest]
    #[case(false, "miss", 1)]
    #[case(true, "hit", 0)]
    #[actix_web::test]
    async fn renders_stored_reply(
        #[case] replayed: bool,
        #[case] marker: &str,
        #[case] records: usize,
    ) {
        let user: UserId = "3fa85f64-5717-4562-b3fc-2c963f66afa6".parse().expect("user");
        let mut offers = MockOfferAcceptanceCommand::new();
        offers
            .expect_accept_offer()
            .withf(move |request| {
                request.user_id == user && request.offer_id.to_string() == OFFER
            })
            .return_once(move |_| {
                let response = StoredResponse::new(
                    201,
                    json!({"voucher_id": "v-1", "wallet_count": 2}),
                );
                Ok(IdempotentReply { response, replayed })
            });
        let state = HttpState {
            offers: Arc::new(offers),
            throttle: Arc::new(throttle_expecting_record(records)),
            ..HttpState::fixture()
        };
        let app = actix_test::init_service(test_app_with(state)).await;
        let cookie = login_cookie(&app, &user).await;

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri(&format!("/api/v1/offers/{OFFER}/accept"))
                .insert_header(("Idempotency-Key", KEY))
                .cookie(cookie)
                .to_request(),
        )
        .await;

        assert_eq!(res.status(), StatusCode::CREATED);
        assert_eq!(
            res.headers()
                .get(IDEMPOTENCY_STATUS_HEADER)
                .and_then(|value| value.to_str().ok()),
            Some(marker)
        );
        let body: Value = actix_test::read_body_json(res).await;
        assert_eq!(body, json!({"voucher_id": "v-1", "wallet_count": 2}));
    }

    #[rstest]
    #[actix_web::test]
    async fn missing_key_is_rejected_before_use_case() {
        let user = UserId::random();
        let mut offers = MockOfferAcceptanceCommand::new();
        offers.expect_accept_offer().never();
        let state = HttpState {
            offers: Arc::new(offers),
            ..HttpState::fixture()
        };
        let app = actix_test::init_service(test_app_with(state)).await;
        let cookie = login_cookie(&app, &user).await;

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri(&format!("/api/v1/offers/{OFFER}/accept"))
                .cookie(cookie)
                .to_request(),
        )
        .await;

        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body: Value = actix_test::read_body_json(res).await;
        assert_eq!(body["code"], "missing_idempotency_key");
    }

    #[rstest]
    #[actix_web::test]
    async fn rate_limited_requests_never_reach_use_case() {
        let user = UserId::random();
        let mut throttle = MockRequestThrottle::new();
        throttle
            .expect_check()
            .return_once(|_, _| Err(Error::rate_limited("Too many requests", 12)));
        let mut offers = MockOfferAcceptanceCommand::new();
        offers.expect_accept_offer().never();
        let state = HttpState {
            offers: Arc::new(offers),
            throttle: Arc::new(throttle),
            ..HttpState::fixture()
        };
        let app = actix_test::init_service(test_app_with(state)).await;
        let cookie = login_cookie(&app, &user).await;

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri(&format!("/api/v1/offers/{OFFER}/accept"))
                .insert_header(("Idempotency-Key", KEY))
                .cookie(cookie)
                .to_request(),
        )
        .await;

        assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            res.headers()
                .get("retry-after")
                .and_then(|value| value.to_str().ok()),
            Some("12")
        );
    }

    #[rstest]
    #[actix_web::test]
    async fn anonymous_requests_are_unauthorised() {
        let app = actix_test::init_service(test_app_with(HttpState::fixture())).await;
        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri(&format!("/api/v1/offers/{OFFER}/accept"))
                .insert_header(("Idempotency-Key", KEY))
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }
}
