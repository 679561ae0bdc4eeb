//! Driving ports for ledger history and appends.

use async_trait::async_trait;
use pagination::{Page, PageLimit};

use crate::domain::{Error, LedgerEntry, LedgerEntryDraft, LedgerEntryId, UserId};

/// Request for one page of ledger history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerPageRequest {
    /// Ledger owner.
    pub user_id: UserId,
    /// Last entry of the previous page.
    pub cursor: Option<LedgerEntryId>,
    /// Page size.
    pub limit: PageLimit,
}

/// One page of ledger history, newest first.
pub type LedgerPage = Page<LedgerEntry, LedgerEntryId>;

/// Ledger history reads.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LedgerQuery: Send + Sync {
    /// Fetch one page.
    async fn list_entries(&self, request: LedgerPageRequest) -> Result<LedgerPage, Error>;
}

/// Ledger writes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LedgerCommand: Send + Sync {
    /// Append a validated entry.
    async fn append_entry(&self, draft: LedgerEntryDraft) -> Result<LedgerEntry, Error>;
}

/// Fixture query returning an empty history.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureLedgerQuery;

#[async_trait]
impl LedgerQuery for FixtureLedgerQuery {
    async fn list_entries(&self, _request: LedgerPageRequest) -> Result<LedgerPage, Error> {
        Ok(Page::empty())
    }
}
