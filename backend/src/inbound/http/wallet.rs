//! Wallet HTTP handlers: voucher cards, ledger history and the summary view.
//!
//! ```text
//! GET /api/v1/wallet/vouchers?status=<active|used|expired>&cursor=<voucher id>&limit=<1..=50>
//! GET /api/v1/wallet/ledger?cursor=<entry id>&limit=<1..=50>
//! GET /api/v1/wallet/summary
//! ```

use actix_web::{HttpResponse, get, web};
use chrono::{DateTime, Utc};
use pagination::{Page, PageLimit};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::domain::ports::{LedgerPageRequest, VoucherPageRequest};
use crate::domain::{
    Error, LedgerEntry, LedgerEntryId, LedgerEntryType, OfferId, RateLimitPolicy, UserId,
    VoucherCard, VoucherId, VoucherStatus,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::cache_control::{
    LEDGER_CACHE_CONTROL, SUMMARY_CACHE_CONTROL, VOUCHERS_CACHE_CONTROL, cache_control,
};
use crate::inbound::http::schemas::{ErrorSchema, WalletSummarySchema};
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, ValidationCode, field_error, parse_id};

/// Query parameters for the voucher listing.
#[derive(Debug, Deserialize, IntoParams)]
pub struct VoucherQueryParams {
    /// Only list vouchers in this state: `active`, `used` or `expired`.
    pub status: Option<String>,
    /// Identifier of the last voucher on the previous page.
    pub cursor: Option<String>,
    /// Page size, 1 to 50; defaults to 20.
    pub limit: Option<u32>,
}

/// Offer details shown on a voucher card.
#[derive(Debug, Serialize, ToSchema)]
pub struct VoucherOfferDto {
    #[schema(value_type = String, format = Uuid)]
    pub id: OfferId,
    pub title: String,
}

/// One voucher as exposed to clients.
#[derive(Debug, Serialize, ToSchema)]
pub struct VoucherCardDto {
    #[schema(value_type = String, format = Uuid)]
    pub id: VoucherId,
    pub offer: VoucherOfferDto,
    #[schema(value_type = String, example = "active")]
    pub status: VoucherStatus,
    pub expire_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used_at: Option<DateTime<Utc>>,
}

impl From<VoucherCard> for VoucherCardDto {
    fn from(card: VoucherCard) -> Self {
        Self {
            id: card.id,
            offer: VoucherOfferDto {
                id: card.offer_id,
                title: card.title,
            },
            status: card.status,
            expire_at: card.expire_at,
            used_at: card.used_at,
        }
    }
}

/// One page of voucher cards.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VoucherPageResponse {
    pub items: Vec<VoucherCardDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, format = Uuid)]
    pub next_cursor: Option<VoucherId>,
}

impl From<Page<VoucherCardDto, VoucherId>> for VoucherPageResponse {
    fn from(page: Page<VoucherCardDto, VoucherId>) -> Self {
        Self {
            items: page.items,
            next_cursor: page.next_cursor,
        }
    }
}

fn parse_limit(raw: Option<u32>) -> Result<PageLimit, Error> {
    PageLimit::from_query(raw).map_err(|err| {
        field_error(FieldName::new("limit"), ValidationCode::OutOfRange, err.to_string())
    })
}

fn parse_voucher_query(
    user_id: UserId,
    params: VoucherQueryParams,
) -> Result<VoucherPageRequest, Error> {
    let limit = parse_limit(params.limit)?;
    let status = params
        .status
        .as_deref()
        .map(|raw| {
            raw.parse::<VoucherStatus>().map_err(|_| {
                field_error(
                    FieldName::new("status"),
                    ValidationCode::InvalidChoice,
                    "status must be one of active, used, expired",
                )
            })
        })
        .transpose()?;
    let cursor = params
        .cursor
        .as_deref()
        .map(|raw| parse_id::<VoucherId>(raw, FieldName::new("cursor")))
        .transpose()?;
    Ok(VoucherPageRequest {
        user_id,
        status,
        cursor,
        limit,
    })
}

/// Query parameters for ledger history.
#[derive(Debug, Deserialize, IntoParams)]
pub struct LedgerQueryParams {
    /// Identifier of the last entry on the previous page.
    pub cursor: Option<String>,
    /// Page size, 1 to 50; defaults to 20.
    pub limit: Option<u32>,
}

/// One ledger row as exposed to clients.
#[derive(Debug, Serialize, ToSchema)]
pub struct LedgerEntryDto {
    #[schema(value_type = String, format = Uuid)]
    pub id: LedgerEntryId,
    #[serde(rename = "type")]
    #[schema(value_type = String, example = "earn")]
    pub entry_type: LedgerEntryType,
    pub amount: i64,
    pub balance_after: i64,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ref_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl From<LedgerEntry> for LedgerEntryDto {
    fn from(entry: LedgerEntry) -> Self {
        Self {
            id: entry.id,
            entry_type: entry.entry_type,
            amount: entry.amount,
            balance_after: entry.balance_after,
            created_at: entry.created_at,
            ref_id: entry.ref_id,
            description: entry.description,
        }
    }
}

/// One page of ledger history.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LedgerPageResponse {
    pub items: Vec<LedgerEntryDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, format = Uuid)]
    pub next_cursor: Option<LedgerEntryId>,
}

impl From<Page<LedgerEntryDto, LedgerEntryId>> for LedgerPageResponse {
    fn from(page: Page<LedgerEntryDto, LedgerEntryId>) -> Self {
        Self {
            items: page.items,
            next_cursor: page.next_cursor,
        }
    }
}

fn parse_ledger_query(
    user_id: UserId,
    params: LedgerQueryParams,
) -> Result<LedgerPageRequest, Error> {
    let limit = parse_limit(params.limit)?;
    let cursor = params
        .cursor
        .as_deref()
        .map(|raw| parse_id::<LedgerEntryId>(raw, FieldName::new("cursor")))
        .transpose()?;
    Ok(LedgerPageRequest {
        user_id,
        cursor,
        limit,
    })
}

/// Page through the caller's vouchers: active ones first, soonest expiry
/// leading.
#[utoipa::path(
    get,
    path = "/api/v1/wallet/vouchers",
    params(VoucherQueryParams),
    responses(
        (
            status = 200,
            description = "Voucher page",
            headers(("Cache-Control" = String, description = "private, max-age=10")),
            body = VoucherPageResponse
        ),
        (status = 400, description = "Invalid status, limit or cursor", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 429, description = "Rate limited", body = ErrorSchema)
    ),
    tags = ["wallet"],
    operation_id = "listWalletVouchers"
)]
#[get("/wallet/vouchers")]
pub async fn list_vouchers(
    state: web::Data<HttpState>,
    session: SessionContext,
    query: web::Query<VoucherQueryParams>,
) -> ApiResult<HttpResponse> {
    let user_id = session.require_user_id()?;
    state
        .throttle
        .admit(RateLimitPolicy::WALLET_VOUCHERS, &user_id.to_string())
        .await?;
    let request = parse_voucher_query(user_id, query.into_inner())?;

    let page = state.vouchers.list_vouchers(request).await?;
    Ok(HttpResponse::Ok()
        .insert_header(cache_control(VOUCHERS_CACHE_CONTROL))
        .json(VoucherPageResponse::from(page.map_items(VoucherCardDto::from))))
}

/// Page through the caller's ledger, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/wallet/ledger",
    params(LedgerQueryParams),
    responses(
        (
            status = 200,
            description = "Ledger page",
            headers(("Cache-Control" = String, description = "private, max-age=10")),
            body = LedgerPageResponse
        ),
        (status = 400, description = "Invalid limit or cursor", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 429, description = "Rate limited", body = ErrorSchema)
    ),
    tags = ["wallet"],
    operation_id = "listLedgerEntries"
)]
#[get("/wallet/ledger")]
pub async fn list_ledger(
    state: web::Data<HttpState>,
    session: SessionContext,
    query: web::Query<LedgerQueryParams>,
) -> ApiResult<HttpResponse> {
    let user_id = session.require_user_id()?;
    state
        .throttle
        .admit(RateLimitPolicy::WALLET_LEDGER, &user_id.to_string())
        .await?;
    let request = parse_ledger_query(user_id, query.into_inner())?;

    let page = state.ledger.list_entries(request).await?;
    Ok(HttpResponse::Ok()
        .insert_header(cache_control(LEDGER_CACHE_CONTROL))
        .json(LedgerPageResponse::from(page.map_items(LedgerEntryDto::from))))
}

/// Points, stamp progress, and voucher counts for the caller.
#[utoipa::path(
    get,
    path = "/api/v1/wallet/summary",
    responses(
        (
            status = 200,
            description = "Wallet summary",
            headers(("Cache-Control" = String, description = "private, max-age=30")),
            body = WalletSummarySchema
        ),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 429, description = "Rate limited", body = ErrorSchema)
    ),
    tags = ["wallet"],
    operation_id = "getWalletSummary"
)]
#[get("/wallet/summary")]
pub async fn wallet_summary(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<HttpResponse> {
    let user_id = session.require_user_id()?;
    state
        .throttle
        .admit(RateLimitPolicy::WALLET_SUMMARY, &user_id.to_string())
        .await?;

    let summary = state.wallet.summary(&user_id).await?;
    Ok(HttpResponse::Ok()
        .insert_header(cache_control(SUMMARY_CACHE_CONTROL))
        .json(summary))
}
