//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] registers every HTTP endpoint in the inbound layer, the schema
//! wrappers that describe domain types without coupling them to utoipa, and
//! the session cookie security scheme.
//!
//! The generated document is served by Swagger UI in debug builds and
//! exported via `cargo run --bin openapi-dump` for external tooling.

use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::inbound::http::offers::AcceptOfferResponse;
use crate::inbound::http::qr::VerifyQrBody;
use crate::inbound::http::schemas::{
    ErrorCodeSchema, ErrorSchema, IssuedQrCodeSchema, QrVerifyOutcomeSchema, StampCardSchema,
    VoucherCountsSchema, WalletSummarySchema,
};
use crate::inbound::http::wallet::{
    LedgerEntryDto, LedgerPageResponse, VoucherCardDto, VoucherOfferDto, VoucherPageResponse,
};

/// Enrich the generated document with the session cookie security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "SessionCookie",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                "session",
                "Session cookie carrying the authenticated user id.",
            ))),
        );
    }
}

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Voucher backend API",
        description = "Offer acceptance, QR redemption, and wallet views."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    security(("SessionCookie" = [])),
    paths(
        crate::inbound::http::offers::accept_offer,
        crate::inbound::http::qr::verify_qr,
        crate::inbound::http::qr::issue_qr,
        crate::inbound::http::wallet::list_vouchers,
        crate::inbound::http::wallet::list_ledger,
        crate::inbound::http::wallet::wallet_summary,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        ErrorSchema,
        ErrorCodeSchema,
        AcceptOfferResponse,
        VerifyQrBody,
        QrVerifyOutcomeSchema,
        IssuedQrCodeSchema,
        VoucherCardDto,
        VoucherOfferDto,
        VoucherPageResponse,
        LedgerEntryDto,
        LedgerPageResponse,
        WalletSummarySchema,
        StampCardSchema,
        VoucherCountsSchema,
    )),
    tags(
        (name = "offers", description = "Inbox offer acceptance"),
        (name = "qr", description = "QR issuance and redemption"),
        (name = "wallet", description = "Vouchers, ledger history and wallet summary"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;
