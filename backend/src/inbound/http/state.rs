//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on domain ports (use-cases) and remain testable without I/O.

use std::sync::Arc;

use crate::domain::ports::{
    FixtureLedgerQuery, FixtureOfferAcceptanceCommand, FixtureQrRedemptionCommand,
    FixtureRequestThrottle, FixtureVoucherQuery, FixtureWalletSummaryQuery, LedgerQuery,
    OfferAcceptanceCommand, QrRedemptionCommand, RequestThrottle, VoucherQuery,
    WalletSummaryQuery,
};

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub offers: Arc<dyn OfferAcceptanceCommand>,
    pub qr: Arc<dyn QrRedemptionCommand>,
    pub ledger: Arc<dyn LedgerQuery>,
    pub vouchers: Arc<dyn VoucherQuery>,
    pub wallet: Arc<dyn WalletSummaryQuery>,
    pub throttle: Arc<dyn RequestThrottle>,
}

impl HttpState {
    /// State wired to fixture ports that perform no I/O.
    ///
    /// Individual ports can be replaced with struct update syntax.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    ///
    /// use voucher_backend::domain::ports::FixtureRequestThrottle;
    /// use voucher_backend::inbound::http::state::HttpState;
    ///
    /// let state = HttpState {
    ///     throttle: Arc::new(FixtureRequestThrottle),
    ///     ..HttpState::fixture()
    /// };
    /// let _offers = state.offers.clone();
    /// ```
    #[must_use]
    pub fn fixture() -> Self {
        Self {
            offers: Arc::new(FixtureOfferAcceptanceCommand),
            qr: Arc::new(FixtureQrRedemptionCommand),
            ledger: Arc::new(FixtureLedgerQuery),
            vouchers: Arc::new(FixtureVoucherQuery),
            wallet: Arc::new(FixtureWalletSummaryQuery),
            throttle: Arc::new(FixtureRequestThrottle),
        }
    }
}
