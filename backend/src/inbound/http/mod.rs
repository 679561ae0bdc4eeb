//! HTTP inbound adapter exposing REST endpoints.
//!
//! Every endpoint except the health probes lives under [`API_PREFIX`] and
//! is registered by [`configure_api`], which the server and the test apps
//! share.

use actix_web::web;

pub mod cache_control;
pub mod error;
pub mod health;
pub mod idempotency;
pub mod offers;
pub mod qr;
pub mod schemas;
pub mod session;
pub mod session_config;
pub mod state;
#[cfg(test)]
pub mod test_utils;
pub mod validation;
pub mod wallet;

pub use error::ApiResult;

/// Path prefix for the versioned API.
pub const API_PREFIX: &str = "/api/v1";

/// Register the versioned API handlers on a scope.
pub fn configure_api(cfg: &mut web::ServiceConfig) {
    cfg.service(offers::accept_offer)
        .service(qr::verify_qr)
        .service(qr::issue_qr)
        .service(wallet::list_vouchers)
        .service(wallet::list_ledger)
        .service(wallet::wallet_summary);
}
