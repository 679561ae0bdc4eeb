//! Test doubles shared by unit, integration and behaviour tests.
//!
//! Compiled for `cfg(test)` and behind the `test-support` feature so the
//! `tests/` crates can reuse them.

mod clock;
mod voucher_store;

pub use clock::MutableClock;
pub use voucher_store::{InMemoryVoucherStore, OfferSeed};
