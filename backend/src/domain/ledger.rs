//! Append-only points ledger.
//!
//! Balances are never stored on their own: each row carries
//! `balance_after`, and for one user's rows in append order
//! `balance_after[i] = balance_after[i-1] + amount[i]` with a starting
//! balance of zero. Adapters serialise appends per user, call
//! [`LedgerEntryDraft::apply`] with the latest balance inside the same
//! transaction, and never stamp an entry earlier than its predecessor, so
//! `(created_at, append order)` is the history order.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use super::{Error, LedgerEntryId, UserId};

/// Kind of balance movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerEntryType {
    /// Points earned, e.g. on voucher redemption.
    Earn,
    /// Points spent; amounts are negative.
    Spend,
    /// Bonus points granted.
    Reward,
}

impl LedgerEntryType {
    /// Storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Earn => "earn",
            Self::Spend => "spend",
            Self::Reward => "reward",
        }
    }

    const fn is_debit(self) -> bool {
        matches!(self, Self::Spend)
    }
}

impl fmt::Display for LedgerEntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LedgerEntryType {
    type Err = LedgerRuleViolation;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "earn" => Ok(Self::Earn),
            "spend" => Ok(Self::Spend),
            "reward" => Ok(Self::Reward),
            other => Err(LedgerRuleViolation::UnknownType(other.to_owned())),
        }
    }
}

/// Rules an append can break.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerRuleViolation {
    /// Zero-value movements are not recorded.
    #[error("amount must not be zero")]
    ZeroAmount,
    /// The amount sign does not match the entry type.
    #[error("{entry_type} amounts must be {expected}")]
    WrongSign {
        /// Type of the rejected entry.
        entry_type: LedgerEntryType,
        /// Required sign.
        expected: &'static str,
    },
    /// A spend would take the balance below zero.
    #[error("insufficient balance: {balance} available, {requested} requested")]
    InsufficientBalance {
        /// Current balance.
        balance: i64,
        /// Points the spend asked for.
        requested: i64,
    },
    /// The balance would overflow.
    #[error("balance overflow")]
    Overflow,
    /// Stored type text was not recognised.
    #[error("unknown ledger entry type: {0}")]
    UnknownType(String),
}

impl From<LedgerRuleViolation> for Error {
    fn from(violation: LedgerRuleViolation) -> Self {
        match &violation {
            LedgerRuleViolation::InsufficientBalance { balance, requested } => {
                Self::conflict(violation.to_string())
                    .with_details(json!({ "balance": balance, "requested": requested }))
            }
            LedgerRuleViolation::UnknownType(_) => Self::internal(violation.to_string()),
            LedgerRuleViolation::ZeroAmount
            | LedgerRuleViolation::WrongSign { .. }
            | LedgerRuleViolation::Overflow => Self::invalid_param(violation.to_string())
                .with_details(json!({ "field": "amount", "code": "invalid_amount" })),
        }
    }
}

/// A validated request to append one ledger row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntryDraft {
    user_id: UserId,
    entry_type: LedgerEntryType,
    amount: i64,
    ref_id: Option<Uuid>,
    description: Option<String>,
}

impl LedgerEntryDraft {
    /// Validate the amount sign for `entry_type`.
    ///
    /// # Errors
    /// Returns [`LedgerRuleViolation`] for zero amounts or a sign that does
    /// not match the type (spend is negative, earn and reward positive).
    pub fn new(
        user_id: UserId,
        entry_type: LedgerEntryType,
        amount: i64,
    ) -> Result<Self, LedgerRuleViolation> {
        if amount == 0 {
            return Err(LedgerRuleViolation::ZeroAmount);
        }
        if entry_type.is_debit() != amount.is_negative() {
            return Err(LedgerRuleViolation::WrongSign {
                entry_type,
                expected: if entry_type.is_debit() {
                    "negative"
                } else {
                    "positive"
                },
            });
        }
        Ok(Self {
            user_id,
            entry_type,
            amount,
            ref_id: None,
            description: None,
        })
    }

    /// Link the entry to the record that caused it.
    #[must_use]
    pub const fn with_ref_id(mut self, ref_id: Uuid) -> Self {
        self.ref_id = Some(ref_id);
        self
    }

    /// Attach a human-readable description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Owning user.
    #[must_use]
    pub const fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Entry type.
    #[must_use]
    pub const fn entry_type(&self) -> LedgerEntryType {
        self.entry_type
    }

    /// Signed amount.
    #[must_use]
    pub const fn amount(&self) -> i64 {
        self.amount
    }

    /// Balance after applying this draft on top of `previous`.
    ///
    /// # Errors
    /// Returns [`LedgerRuleViolation::InsufficientBalance`] when a spend
    /// exceeds the balance, or [`LedgerRuleViolation::Overflow`].
    pub fn apply(&self, previous: i64) -> Result<i64, LedgerRuleViolation> {
        let next = previous
            .checked_add(self.amount)
            .ok_or(LedgerRuleViolation::Overflow)?;
        if self.entry_type.is_debit() && next < 0 {
            return Err(LedgerRuleViolation::InsufficientBalance {
                balance: previous,
                requested: self.amount.saturating_neg(),
            });
        }
        Ok(next)
    }

    /// Materialise the row once the balance is known.
    #[must_use]
    pub fn into_entry(
        self,
        id: LedgerEntryId,
        balance_after: i64,
        created_at: DateTime<Utc>,
    ) -> LedgerEntry {
        LedgerEntry {
            id,
            user_id: self.user_id,
            entry_type: self.entry_type,
            amount: self.amount,
            balance_after,
            created_at,
            ref_id: self.ref_id,
            description: self.description,
        }
    }
}

/// An immutable ledger row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    /// Row identifier and pagination cursor.
    pub id: LedgerEntryId,
    /// Owning user.
    pub user_id: UserId,
    /// Movement kind.
    pub entry_type: LedgerEntryType,
    /// Signed amount.
    pub amount: i64,
    /// Balance once this row is applied.
    pub balance_after: i64,
    /// Append instant.
    pub created_at: DateTime<Utc>,
    /// Record that caused the movement.
    pub ref_id: Option<Uuid>,
    /// Optional human-readable description.
    pub description: Option<String>,
}
