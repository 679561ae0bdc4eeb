//! QR presentation and issuance HTTP handlers.
//!
//! ```text
//! POST /api/v1/qr/verify
//! POST /api/v1/wallet/vouchers/{id}/qr
//! ```

use actix_web::{HttpResponse, post, web};
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;

use crate::domain::ports::{IssueQrRequest, VerifyQrRequest};
use crate::domain::{Error, GeoPoint, PresentedCode, RateLimitPolicy, VoucherId};
use crate::inbound::http::ApiResult;
use crate::inbound::http::cache_control::{NO_STORE, cache_control};
use crate::inbound::http::schemas::{ErrorSchema, IssuedQrCodeSchema, QrVerifyOutcomeSchema};
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, ValidationCode, field_error, parse_id};

/// Request payload for presenting a code.
#[derive(Deserialize, ToSchema)]
pub struct VerifyQrBody {
    /// Plaintext code scanned from the QR image.
    pub token: String,
    /// Scan latitude in WGS84 degrees.
    pub lat: Option<f64>,
    /// Scan longitude in WGS84 degrees.
    pub lng: Option<f64>,
}

impl std::fmt::Debug for VerifyQrBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerifyQrBody")
            .field("token", &"<redacted>")
            .field("lat", &self.lat)
            .field("lng", &self.lng)
            .finish()
    }
}

fn parse_location(lat: Option<f64>, lng: Option<f64>) -> Result<Option<GeoPoint>, Error> {
    match (lat, lng) {
        (None, None) => Ok(None),
        (Some(lat), Some(lng)) => GeoPoint::new(lat, lng).map(Some).map_err(|err| {
            field_error(FieldName::new("location"), ValidationCode::OutOfRange, err.to_string())
        }),
        _ => Err(Error::invalid_param("lat and lng must be supplied together")
            .with_details(json!({"field": "location", "code": "incomplete"}))),
    }
}

fn parse_verify_body(body: VerifyQrBody) -> Result<VerifyQrRequest, Error> {
    let location = parse_location(body.lat, body.lng)?;
    let code = PresentedCode::new(body.token).map_err(|err| {
        field_error(FieldName::new("token"), ValidationCode::Malformed, err.to_string())
    })?;
    Ok(VerifyQrRequest { code, location })
}

/// Present a code at the till.
///
/// Every outcome, including unknown codes, is a `200` with a `result` tag.
#[utoipa::path(
    post,
    path = "/api/v1/qr/verify",
    request_body = VerifyQrBody,
    responses(
        (status = 200, description = "Presentation outcome", body = QrVerifyOutcomeSchema),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 429, description = "Rate limited", body = ErrorSchema),
        (status = 500, description = "Internal server error", body = ErrorSchema)
    ),
    tags = ["qr"],
    operation_id = "verifyQrToken"
)]
#[post("/qr/verify")]
pub async fn verify_qr(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<VerifyQrBody>,
) -> ApiResult<HttpResponse> {
    let user_id = session.require_user_id()?;
    state
        .throttle
        .admit(RateLimitPolicy::QR_VERIFY, &user_id.to_string())
        .await?;
    let request = parse_verify_body(payload.into_inner())?;

    let outcome = state.qr.verify(request).await?;
    Ok(HttpResponse::Ok()
        .insert_header(cache_control(NO_STORE))
        .json(outcome))
}

/// Issue a fresh code for one of the caller's vouchers, expiring older ones.
#[utoipa::path(
    post,
    path = "/api/v1/wallet/vouchers/{id}/qr",
    params(("id" = String, Path, description = "Voucher identifier")),
    responses(
        (
            status = 201,
            description = "Code issued",
            headers(("Cache-Control" = String, description = "Always no-store")),
            body = IssuedQrCodeSchema
        ),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 404, description = "Voucher not found", body = ErrorSchema),
        (status = 409, description = "Voucher already used", body = ErrorSchema),
        (status = 410, description = "Voucher expired", body = ErrorSchema),
        (status = 429, description = "Rate limited", body = ErrorSchema)
    ),
    tags = ["qr"],
    operation_id = "issueQrToken"
)]
#[post("/wallet/vouchers/{id}/qr")]
pub async fn issue_qr(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let user_id = session.require_user_id()?;
    let voucher_id: VoucherId = parse_id(&path, FieldName::new("id"))?;
    state
        .throttle
        .admit(RateLimitPolicy::QR_ISSUE, &user_id.to_string())
        .await?;

    let issued = state
        .qr
        .issue_token(IssueQrRequest {
            user_id,
            voucher_id,
        })
        .await?;
    Ok(HttpResponse::Created()
        .insert_header(cache_control(NO_STORE))
        .json(issued))
}
