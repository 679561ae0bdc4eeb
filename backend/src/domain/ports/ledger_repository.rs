//! Port for the append-only points ledger.
//!
//! Appends for one user must be serialised (an advisory lock in the
//! PostgreSQL adapter) so each row's `balance_after` extends the previous
//! row's balance.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pagination::PageLimit;

use crate::domain::{LedgerEntry, LedgerEntryDraft, LedgerEntryId, LedgerRuleViolation, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by ledger repository adapters.
    pub enum LedgerRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } => "ledger repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "ledger repository query failed: {message}",
        /// The cursor does not name one of the user's entries.
        UnknownCursor { cursor: String } => "unknown ledger cursor: {cursor}",
    }
}

/// Result of an append attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppendOutcome {
    /// The entry was written.
    Appended(LedgerEntry),
    /// The entry would break a balance rule; nothing was written.
    Rejected(LedgerRuleViolation),
}

/// Port for ledger reads and appends.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LedgerRepository: Send + Sync {
    /// Append `draft` on top of the user's latest balance.
    async fn append(
        &self,
        draft: &LedgerEntryDraft,
        id: LedgerEntryId,
        now: DateTime<Utc>,
    ) -> Result<AppendOutcome, LedgerRepositoryError>;

    /// Balance after the user's newest entry, zero when there is none.
    async fn latest_balance(&self, user_id: &UserId) -> Result<i64, LedgerRepositoryError>;

    /// Entries newest first, starting after `cursor`.
    ///
    /// Returns up to `limit.overfetch()` rows so callers can tell whether a
    /// further page exists.
    async fn list(
        &self,
        user_id: &UserId,
        cursor: Option<LedgerEntryId>,
        limit: PageLimit,
    ) -> Result<Vec<LedgerEntry>, LedgerRepositoryError>;
}
