//! Ledger history and append use cases.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use pagination::Page;
use serde_json::json;
use tracing::info;

use crate::domain::ports::{
    AppendOutcome, LedgerCommand, LedgerPage, LedgerPageRequest, LedgerQuery, LedgerRepository,
    LedgerRepositoryError,
};
use crate::domain::{Error, LedgerEntry, LedgerEntryDraft, LedgerEntryId};

pub(crate) fn map_ledger_error(error: LedgerRepositoryError) -> Error {
    match error {
        LedgerRepositoryError::Connection { message } => {
            Error::internal(format!("ledger repository unavailable: {message}"))
        }
        LedgerRepositoryError::Query { message } => {
            Error::internal(format!("ledger repository error: {message}"))
        }
        LedgerRepositoryError::UnknownCursor { cursor } => Error::invalid_param("unknown cursor")
            .with_details(json!({ "field": "cursor", "value": cursor, "code": "unknown_cursor" })),
    }
}

/// Service implementing [`LedgerQuery`] and [`LedgerCommand`].
pub struct LedgerService<R> {
    ledger: Arc<R>,
    clock: Arc<dyn Clock>,
}

impl<R> Clone for LedgerService<R> {
    fn clone(&self) -> Self {
        Self {
            ledger: Arc::clone(&self.ledger),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<R> LedgerService<R> {
    /// Create the service.
    pub fn new(ledger: Arc<R>, clock: Arc<dyn Clock>) -> Self {
        Self { ledger, clock }
    }
}

#[async_trait]
impl<R> LedgerQuery for LedgerService<R>
where
    R: LedgerRepository,
{
    async fn list_entries(&self, request: LedgerPageRequest) -> Result<LedgerPage, Error> {
        let rows = self
            .ledger
            .list(&request.user_id, request.cursor, request.limit)
            .await
            .map_err(map_ledger_error)?;
        Ok(Page::from_overfetch(rows, request.limit, |entry: &LedgerEntry| {
            entry.id
        }))
    }
}

#[async_trait]
impl<R> LedgerCommand for LedgerService<R>
where
    R: LedgerRepository,
{
    async fn append_entry(&self, draft: LedgerEntryDraft) -> Result<LedgerEntry, Error> {
        let outcome = self
            .ledger
            .append(&draft, LedgerEntryId::random(), self.clock.utc())
            .await
            .map_err(map_ledger_error)?;
        match outcome {
            AppendOutcome::Appended(entry) => {
                info!(
                    user_id = %entry.user_id,
                    entry_type = %entry.entry_type,
                    amount = entry.amount,
                    balance_after = entry.balance_after,
                    "ledger entry appended"
                );
                Ok(entry)
            }
            AppendOutcome::Rejected(violation) => Err(violation.into()),
        }
    }
}
