//! Shared mapping from pool, Diesel and row-decoding failures onto port
//! errors.
//!
//! Every repository error in the domain carries at least a `Connection` and
//! a `Query` variant; [`StoreFailure`] exposes those two constructors so the
//! mapping lives in one place. Database messages are logged at debug level
//! and replaced by fixed strings before they reach the domain.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::debug;

use crate::domain::LedgerRuleViolation;
use crate::domain::ports::{
    IdempotencyStoreError, LedgerRepositoryError, OfferRepositoryError, ProximityOracleError,
    QrTokenRepositoryError, VoucherRepositoryError,
};

use super::models::RowDecodeError;
use super::pool::PoolError;

/// Port errors with connection and query variants.
pub(crate) trait StoreFailure: Sized {
    fn connection_failure(message: String) -> Self;
    fn query_failure(message: String) -> Self;
}

macro_rules! impl_store_failure {
    ($($error:ty),+ $(,)?) => {
        $(
            impl StoreFailure for $error {
                fn connection_failure(message: String) -> Self {
                    Self::connection(message)
                }

                fn query_failure(message: String) -> Self {
                    Self::query(message)
                }
            }
        )+
    };
}

impl_store_failure!(
    IdempotencyStoreError,
    LedgerRepositoryError,
    OfferRepositoryError,
    ProximityOracleError,
    QrTokenRepositoryError,
    VoucherRepositoryError,
);

/// Failure inside a transaction body.
#[derive(Debug, thiserror::Error)]
pub(crate) enum TxError {
    #[error(transparent)]
    Diesel(#[from] DieselError),
    #[error(transparent)]
    Decode(#[from] RowDecodeError),
    #[error(transparent)]
    Rule(#[from] LedgerRuleViolation),
}

/// Map a checkout or build failure to a connection error.
pub(crate) fn map_pool_error<E: StoreFailure>(error: PoolError) -> E {
    match error {
        PoolError::Checkout { message } | PoolError::Build { message } => {
            E::connection_failure(message)
        }
    }
}

/// Map a Diesel failure, logging the database detail for `operation`.
pub(crate) fn map_diesel_error<E: StoreFailure>(error: DieselError, operation: &'static str) -> E {
    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), operation, "diesel operation failed");
        }
        _ => debug!(
            error_type = %std::any::type_name_of_val(&error),
            operation,
            "diesel operation failed"
        ),
    }

    match error {
        DieselError::NotFound => E::query_failure("record not found".to_owned()),
        DieselError::QueryBuilderError(_) => E::query_failure("database query error".to_owned()),
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            E::connection_failure("database connection error".to_owned())
        }
        DieselError::DatabaseError(DatabaseErrorKind::SerializationFailure, _) => {
            E::query_failure("transaction serialization failure".to_owned())
        }
        _ => E::query_failure(format!("database error during {operation}")),
    }
}

/// Map a failed transaction body.
pub(crate) fn map_tx_error<E: StoreFailure>(error: TxError, operation: &'static str) -> E {
    match error {
        TxError::Diesel(err) => map_diesel_error(err, operation),
        TxError::Decode(err) => E::query_failure(err.to_string()),
        TxError::Rule(violation) => {
            E::query_failure(format!("{operation} broke a ledger rule: {violation}"))
        }
    }
}

/// Whether `error` is a unique violation on `constraint`.
pub(crate) fn is_unique_violation(error: &DieselError, constraint: &str) -> bool {
    matches!(
        error,
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info)
            if info.constraint_name().is_none_or(|name| name == constraint)
    )
}
