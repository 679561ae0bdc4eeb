//! Voucher backend library.
//!
//! A transactional voucher engine: offers are accepted into vouchers exactly
//! once, vouchers are redeemed through short-lived QR codes, and every point
//! movement lands in an append-only ledger. The crate follows a hexagonal
//! layout:
//!
//! - [`domain`] holds the state machines, services, and port traits.
//! - [`inbound`] adapts HTTP requests onto the driving ports.
//! - [`outbound`] implements the driven ports against PostgreSQL, Redis, and
//!   process memory.

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

/// Public OpenAPI surface used by Swagger UI and tooling.
pub use doc::ApiDoc;
pub use domain::TraceId;
pub use middleware::Trace;
