//! In-memory transactional store for the voucher ports.
//!
//! Every port call takes the single state lock for its whole duration, which
//! gives the same all-or-nothing behaviour as the PostgreSQL transactions
//! and serialises concurrent calls the way row locks do. The decision logic
//! is the same pure plans the Diesel adapters use.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pagination::PageLimit;

use crate::domain::ports::{
    AcceptanceAttempt, AcceptanceOutcome, AppendOutcome, LedgerRepository, LedgerRepositoryError,
    OfferRepository, OfferRepositoryError, ProximityOracle, ProximityOracleError,
    QrTokenRepository, QrTokenRepositoryError, RedemptionAttempt, RedemptionTarget, TokenIssue,
    TokenIssueOutcome, VoucherRepository, VoucherRepositoryError,
};
use crate::domain::{
    AcceptancePlan, AcceptedOffer, GeoPoint, InboxStatus, LedgerEntry, LedgerEntryDraft,
    LedgerEntryId, LedgerEntryType, OfferId, QrToken, QrTokenId, QrTokenStatus, QrVerifyOutcome,
    RedemptionPlan, TokenHash, UserId, Voucher, VoucherCard, VoucherId, VoucherStats,
    VoucherStatus, plan_acceptance, plan_issue, plan_redemption,
};

/// Offer row used to seed the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OfferSeed {
    /// Offer identifier.
    pub id: OfferId,
    /// Headline shown on wallet cards.
    pub title: &'static str,
    /// End of the offer; vouchers inherit it as their expiry.
    pub end_at: DateTime<Utc>,
    /// Points credited on redemption.
    pub reward_points: i64,
}

#[derive(Debug, Default)]
struct StoreState {
    offers: HashMap<OfferId, OfferSeed>,
    inbox: HashMap<(UserId, OfferId), InboxStatus>,
    vouchers: HashMap<VoucherId, Voucher>,
    tokens: HashMap<QrTokenId, QrToken>,
    ledger: Vec<LedgerEntry>,
    distances: HashMap<OfferId, f64>,
}

impl StoreState {
    fn voucher_for(&self, user_id: UserId, offer_id: OfferId) -> Option<&Voucher> {
        self.vouchers
            .values()
            .find(|voucher| voucher.user_id == user_id && voucher.offer_id == offer_id)
    }

    fn active_count(&self, user_id: UserId, now: DateTime<Utc>) -> u64 {
        let count = self
            .vouchers
            .values()
            .filter(|voucher| {
                voucher.user_id == user_id
                    && voucher.status == VoucherStatus::Active
                    && voucher.expire_at >= now
            })
            .count();
        u64::try_from(count).unwrap_or(u64::MAX)
    }

    /// Latest entry for `user_id`. Entries are pushed in append order, which
    /// plays the part of the `seq` column.
    fn latest(&self, user_id: UserId) -> Option<&LedgerEntry> {
        self.ledger.iter().rev().find(|entry| entry.user_id == user_id)
    }

    fn balance(&self, user_id: UserId) -> i64 {
        self.latest(user_id).map_or(0, |entry| entry.balance_after)
    }

    fn append(
        &mut self,
        draft: LedgerEntryDraft,
        id: LedgerEntryId,
        now: DateTime<Utc>,
    ) -> AppendOutcome {
        let (previous, created_at) = match self.latest(*draft.user_id()) {
            Some(latest) => (latest.balance_after, now.max(latest.created_at)),
            None => (0, now),
        };
        match draft.apply(previous) {
            Ok(balance_after) => {
                let entry = draft.into_entry(id, balance_after, created_at);
                self.ledger.push(entry.clone());
                AppendOutcome::Appended(entry)
            }
            Err(violation) => AppendOutcome::Rejected(violation),
        }
    }

    fn set_token_status(&mut self, token_id: QrTokenId, status: QrTokenStatus) {
        if let Some(token) = self.tokens.get_mut(&token_id) {
            token.status = status;
        }
    }

    fn expire_voucher(&mut self, voucher_id: VoucherId) {
        if let Some(voucher) = self
            .vouchers
            .get_mut(&voucher_id)
            .filter(|voucher| voucher.status == VoucherStatus::Active)
        {
            voucher.status = VoucherStatus::Expired;
        }
    }
}

/// Process-local implementation of the offer, QR token, ledger and voucher
/// repositories plus the proximity oracle.
#[derive(Debug, Default)]
pub struct InMemoryVoucherStore {
    state: Mutex<StoreState>,
}

impl InMemoryVoucherStore {
    fn state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register an offer.
    pub fn seed_offer(&self, offer: OfferSeed) {
        self.state().offers.insert(offer.id, offer);
    }

    /// Deliver `offer_id` to the user's inbox in state `new`.
    pub fn deliver(&self, user_id: UserId, offer_id: OfferId) {
        self.state()
            .inbox
            .insert((user_id, offer_id), InboxStatus::New);
    }

    /// Overwrite an inbox entry's status.
    pub fn set_inbox_status(&self, user_id: UserId, offer_id: OfferId, status: InboxStatus) {
        self.state().inbox.insert((user_id, offer_id), status);
    }

    /// Store a voucher row as is.
    pub fn seed_voucher(&self, voucher: Voucher) {
        self.state().vouchers.insert(voucher.id, voucher);
    }

    /// Store a token row as is.
    pub fn seed_token(&self, token: QrToken) {
        self.state().tokens.insert(token.id, token);
    }

    /// Place the offer `meters` away from every caller.
    pub fn set_distance(&self, offer_id: OfferId, meters: f64) {
        self.state().distances.insert(offer_id, meters);
    }

    /// Inbox status for a pair, if delivered.
    pub fn inbox_status(&self, user_id: UserId, offer_id: OfferId) -> Option<InboxStatus> {
        self.state().inbox.get(&(user_id, offer_id)).copied()
    }

    /// Voucher by id.
    pub fn voucher(&self, voucher_id: VoucherId) -> Option<Voucher> {
        self.state().vouchers.get(&voucher_id).cloned()
    }

    /// Every voucher the user holds.
    pub fn vouchers_of(&self, user_id: UserId) -> Vec<Voucher> {
        self.state()
            .vouchers
            .values()
            .filter(|voucher| voucher.user_id == user_id)
            .cloned()
            .collect()
    }

    /// Token by id.
    pub fn token(&self, token_id: QrTokenId) -> Option<QrToken> {
        self.state().tokens.get(&token_id).cloned()
    }

    /// Tokens issued for a voucher.
    pub fn tokens_of(&self, voucher_id: VoucherId) -> Vec<QrToken> {
        self.state()
            .tokens
            .values()
            .filter(|token| token.voucher_id == voucher_id)
            .cloned()
            .collect()
    }

    /// The user's ledger in append order.
    pub fn ledger_of(&self, user_id: UserId) -> Vec<LedgerEntry> {
        self.state()
            .ledger
            .iter()
            .filter(|entry| entry.user_id == user_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl OfferRepository for InMemoryVoucherStore {
    async fn accept(
        &self,
        attempt: &AcceptanceAttempt,
    ) -> Result<AcceptanceOutcome, OfferRepositoryError> {
        let mut state = self.state();
        let key = (attempt.user_id, attempt.offer_id);
        let Some(status) = state.inbox.get(&key).copied() else {
            return Ok(AcceptanceOutcome::NotInInbox);
        };
        let end_at = state
            .offers
            .get(&attempt.offer_id)
            .map(|offer| offer.end_at)
            .ok_or_else(|| OfferRepositoryError::query("offer row missing"))?;

        match plan_acceptance(status, end_at, attempt.now) {
            AcceptancePlan::AlreadyAccepted => Ok(AcceptanceOutcome::AlreadyAccepted {
                voucher_id: state
                    .voucher_for(attempt.user_id, attempt.offer_id)
                    .map(|voucher| voucher.id),
            }),
            AcceptancePlan::OfferExpired => Ok(AcceptanceOutcome::OfferExpired { end_at }),
            AcceptancePlan::IssueVoucher => {
                if let Some(existing) = state.voucher_for(attempt.user_id, attempt.offer_id) {
                    return Ok(AcceptanceOutcome::AlreadyAccepted {
                        voucher_id: Some(existing.id),
                    });
                }
                state.vouchers.insert(
                    attempt.voucher_id,
                    Voucher {
                        id: attempt.voucher_id,
                        user_id: attempt.user_id,
                        offer_id: attempt.offer_id,
                        status: VoucherStatus::Active,
                        expire_at: end_at,
                        used_at: None,
                    },
                );
                state.inbox.insert(key, InboxStatus::Accepted);
                Ok(AcceptanceOutcome::Accepted(AcceptedOffer {
                    voucher_id: attempt.voucher_id,
                    wallet_count: state.active_count(attempt.user_id, attempt.now),
                }))
            }
        }
    }
}

fn token_by_hash<'a>(state: &'a StoreState, hash: &TokenHash) -> Option<&'a QrToken> {
    state.tokens.values().find(|token| &token.code_hash == hash)
}

#[async_trait]
impl QrTokenRepository for InMemoryVoucherStore {
    async fn find_target(
        &self,
        code_hash: &TokenHash,
    ) -> Result<Option<RedemptionTarget>, QrTokenRepositoryError> {
        let state = self.state();
        Ok(token_by_hash(&state, code_hash).and_then(|token| {
            state
                .vouchers
                .get(&token.voucher_id)
                .map(|voucher| RedemptionTarget {
                    voucher_id: voucher.id,
                    offer_id: voucher.offer_id,
                })
        }))
    }

    async fn redeem(
        &self,
        attempt: &RedemptionAttempt,
    ) -> Result<Option<QrVerifyOutcome>, QrTokenRepositoryError> {
        let mut state = self.state();
        let Some(token) = token_by_hash(&state, &attempt.code_hash).cloned() else {
            return Ok(None);
        };
        let voucher = state
            .vouchers
            .get(&token.voucher_id)
            .cloned()
            .ok_or_else(|| QrTokenRepositoryError::query("voucher row missing"))?;

        let plan = plan_redemption(&token, &voucher, attempt.within_range, attempt.now);
        match plan {
            RedemptionPlan::Report(_) => {}
            RedemptionPlan::ExpireToken { expire_voucher, .. } => {
                state.set_token_status(token.id, QrTokenStatus::Expired);
                if expire_voucher {
                    state.expire_voucher(voucher.id);
                }
            }
            RedemptionPlan::ExpireVoucher { .. } => {
                state.expire_voucher(voucher.id);
                state.set_token_status(token.id, QrTokenStatus::Expired);
            }
            RedemptionPlan::Redeem { used_at, .. } => {
                let reward_points = state
                    .offers
                    .get(&voucher.offer_id)
                    .map_or(0, |offer| offer.reward_points);
                if reward_points > 0 {
                    let draft =
                        LedgerEntryDraft::new(voucher.user_id, LedgerEntryType::Earn, reward_points)
                            .map_err(|err| QrTokenRepositoryError::query(err.to_string()))?
                            .with_ref_id(*voucher.id.as_uuid())
                            .with_description("voucher redeemed");
                    if let AppendOutcome::Rejected(violation) =
                        state.append(draft, LedgerEntryId::random(), used_at)
                    {
                        return Err(QrTokenRepositoryError::query(violation.to_string()));
                    }
                }
                if let Some(row) = state.vouchers.get_mut(&voucher.id) {
                    row.status = VoucherStatus::Used;
                    row.used_at = Some(used_at);
                }
                state.set_token_status(token.id, QrTokenStatus::Used);
            }
        }
        Ok(Some(plan.outcome()))
    }

    async fn issue(&self, issue: &TokenIssue) -> Result<TokenIssueOutcome, QrTokenRepositoryError> {
        let mut state = self.state();
        let Some(voucher) = state
            .vouchers
            .get(&issue.voucher_id)
            .filter(|voucher| voucher.user_id == issue.user_id)
            .cloned()
        else {
            return Ok(TokenIssueOutcome::VoucherNotFound);
        };
        if let Err(rejection) = plan_issue(&voucher, issue.now) {
            return Ok(TokenIssueOutcome::Rejected(rejection));
        }

        for token in state.tokens.values_mut() {
            if token.voucher_id == issue.voucher_id && token.status == QrTokenStatus::Active {
                token.status = QrTokenStatus::Expired;
            }
        }
        let token = QrToken {
            id: issue.token_id,
            voucher_id: issue.voucher_id,
            code_hash: issue.code_hash.clone(),
            ttl_sec: issue.ttl_sec,
            status: QrTokenStatus::Active,
            created_at: issue.now,
        };
        state.tokens.insert(token.id, token.clone());
        Ok(TokenIssueOutcome::Issued(token))
    }
}

#[async_trait]
impl LedgerRepository for InMemoryVoucherStore {
    async fn append(
        &self,
        draft: &LedgerEntryDraft,
        id: LedgerEntryId,
        now: DateTime<Utc>,
    ) -> Result<AppendOutcome, LedgerRepositoryError> {
        Ok(self.state().append(draft.clone(), id, now))
    }

    async fn latest_balance(&self, user_id: &UserId) -> Result<i64, LedgerRepositoryError> {
        Ok(self.state().balance(*user_id))
    }

    async fn list(
        &self,
        user_id: &UserId,
        cursor: Option<LedgerEntryId>,
        limit: PageLimit,
    ) -> Result<Vec<LedgerEntry>, LedgerRepositoryError> {
        let state = self.state();
        let mut entries: Vec<(usize, &LedgerEntry)> = state
            .ledger
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.user_id == *user_id)
            .collect();
        entries.sort_by(|(a_seq, a), (b_seq, b)| {
            (b.created_at, b_seq).cmp(&(a.created_at, a_seq))
        });

        let anchor = match cursor {
            Some(cursor) => {
                let anchor = entries
                    .iter()
                    .find(|(_, entry)| entry.id == cursor)
                    .map(|(seq, entry)| (entry.created_at, *seq))
                    .ok_or_else(|| LedgerRepositoryError::unknown_cursor(cursor.to_string()))?;
                Some(anchor)
            }
            None => None,
        };

        let take = usize::try_from(limit.overfetch()).unwrap_or(usize::MAX);
        Ok(entries
            .into_iter()
            .filter(|(seq, entry)| anchor.is_none_or(|anchor| (entry.created_at, *seq) < anchor))
            .take(take)
            .map(|(_, entry)| entry.clone())
            .collect())
    }
}

#[async_trait]
impl VoucherRepository for InMemoryVoucherStore {
    async fn stats(
        &self,
        user_id: &UserId,
        now: DateTime<Utc>,
        horizon_end: DateTime<Utc>,
    ) -> Result<VoucherStats, VoucherRepositoryError> {
        let state = self.state();
        let mut stats = VoucherStats::default();
        for voucher in state.vouchers.values().filter(|v| v.user_id == *user_id) {
            match voucher.status {
                VoucherStatus::Used => stats.used += 1,
                VoucherStatus::Active if voucher.expire_at >= now => {
                    stats.active += 1;
                    if voucher.expire_at <= horizon_end {
                        stats.expiring += 1;
                    }
                    stats.nearest_expire_at = Some(
                        stats
                            .nearest_expire_at
                            .map_or(voucher.expire_at, |nearest| nearest.min(voucher.expire_at)),
                    );
                }
                VoucherStatus::Active | VoucherStatus::Expired => {}
            }
        }
        Ok(stats)
    }

    async fn expire_overdue(&self, now: DateTime<Utc>) -> Result<u64, VoucherRepositoryError> {
        let mut state = self.state();
        let overdue: Vec<VoucherId> = state
            .vouchers
            .values()
            .filter(|voucher| voucher.status == VoucherStatus::Active && voucher.expire_at < now)
            .map(|voucher| voucher.id)
            .collect();
        for voucher_id in &overdue {
            state.expire_voucher(*voucher_id);
        }
        for token in state.tokens.values_mut() {
            if overdue.contains(&token.voucher_id) && token.status == QrTokenStatus::Active {
                token.status = QrTokenStatus::Expired;
            }
        }
        Ok(u64::try_from(overdue.len()).unwrap_or(u64::MAX))
    }

    async fn list(
        &self,
        user_id: &UserId,
        status: Option<VoucherStatus>,
        cursor: Option<VoucherId>,
        limit: PageLimit,
    ) -> Result<Vec<VoucherCard>, VoucherRepositoryError> {
        let state = self.state();
        let mut cards = state
            .vouchers
            .values()
            .filter(|voucher| voucher.user_id == *user_id)
            .map(|voucher| {
                let offer = state
                    .offers
                    .get(&voucher.offer_id)
                    .ok_or_else(|| VoucherRepositoryError::query("offer row missing"))?;
                Ok(VoucherCard {
                    id: voucher.id,
                    offer_id: voucher.offer_id,
                    title: offer.title.to_owned(),
                    status: voucher.status,
                    expire_at: voucher.expire_at,
                    used_at: voucher.used_at,
                })
            })
            .collect::<Result<Vec<_>, VoucherRepositoryError>>()?;
        cards.sort_by_key(VoucherCard::list_key);

        let anchor = cursor
            .map(|cursor| {
                cards
                    .iter()
                    .find(|card| card.id == cursor)
                    .map(VoucherCard::list_key)
                    .ok_or_else(|| VoucherRepositoryError::unknown_cursor(cursor.to_string()))
            })
            .transpose()?;

        let take = usize::try_from(limit.overfetch()).unwrap_or(usize::MAX);
        Ok(cards
            .into_iter()
            .filter(|card| status.is_none_or(|status| card.status == status))
            .filter(|card| anchor.is_none_or(|anchor| card.list_key() > anchor))
            .take(take)
            .collect())
    }
}

#[async_trait]
impl ProximityOracle for InMemoryVoucherStore {
    async fn distance_meters(
        &self,
        offer_id: &OfferId,
        _point: GeoPoint,
    ) -> Result<Option<f64>, ProximityOracleError> {
        Ok(self.state().distances.get(offer_id).copied())
    }
}
