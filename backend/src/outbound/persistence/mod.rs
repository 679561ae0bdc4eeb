//! PostgreSQL persistence adapters using Diesel ORM.
//!
//! Concrete implementations of the driven ports backed by PostgreSQL through
//! `diesel-async` and a `bb8` pool.
//!
//! - **Thin adapters**: row locking and writes live here; every decision is
//!   delegated to the pure plans in [`crate::domain`].
//! - **Internal models**: Diesel row structs (`models.rs`) and table
//!   definitions (`schema.rs`) never leave this module.
//! - **One transaction per port call**: each state machine runs inside a
//!   single `conn.transaction`, so any failure rolls everything back.
//! - **Typed errors**: pool, Diesel and decoding failures are mapped onto
//!   the port's error enum before they leave the adapter.
//!
//! # Example
//!
//! ```no_run
//! use voucher_backend::outbound::persistence::{DbPool, DieselLedgerRepository, PoolConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/voucher")).await?;
//! let ledger = DieselLedgerRepository::new(pool);
//! # let _ = ledger;
//! # Ok(())
//! # }
//! ```

mod diesel_error_mapping;
mod diesel_idempotency_store;
mod diesel_ledger_repository;
mod diesel_offer_repository;
mod diesel_qr_token_repository;
mod diesel_voucher_repository;
mod migrations;
mod models;
mod pool;
mod postgis_proximity_oracle;
mod schema;

pub use diesel_idempotency_store::DieselIdempotencyStore;
pub use diesel_ledger_repository::DieselLedgerRepository;
pub use diesel_offer_repository::DieselOfferRepository;
pub use diesel_qr_token_repository::DieselQrTokenRepository;
pub use diesel_voucher_repository::DieselVoucherRepository;
pub use migrations::{MIGRATIONS, MigrationError, run_pending_migrations};
pub use pool::{DbPool, PoolConfig, PoolError};
pub use postgis_proximity_oracle::PostgisProximityOracle;
