//! Shared cache-control policies for HTTP handlers.

/// Ledger pages may be reused by the owner's client for a short while.
pub const LEDGER_CACHE_CONTROL: &str = "private, max-age=10";

/// Voucher cards flip state on redemption, so they share the ledger policy.
pub const VOUCHERS_CACHE_CONTROL: &str = "private, max-age=10";

/// Wallet summaries change less often than the ledger tail.
pub const SUMMARY_CACHE_CONTROL: &str = "private, max-age=30";

/// Freshly issued codes must never be stored.
pub const NO_STORE: &str = "no-store";

/// Build a `Cache-Control` header tuple for the given policy.
pub const fn cache_control(policy: &'static str) -> (&'static str, &'static str) {
    ("Cache-Control", policy)
}
