//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **persistence**: PostgreSQL repositories, the idempotency store and the
//!   PostGIS proximity oracle, all on Diesel.
//! - **cache**: Redis-backed rate-limit counters.
//! - **memory**: process-local counters and idempotency records for single
//!   instance deployments and tests.
//!
//! Adapters are thin translators between domain types and infrastructure
//! representations. They contain no business logic.

pub mod cache;
pub mod memory;
pub mod persistence;
