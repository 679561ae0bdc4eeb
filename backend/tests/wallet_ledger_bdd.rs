//! Behaviour tests for the points ledger and the wallet summary.

#[expect(
    dead_code,
    reason = "The shared world wires services other suites exercise."
)]
#[path = "support/voucher_world.rs"]
mod voucher_world;

use std::cell::{Cell, RefCell};
use std::time::Duration;

use chrono::TimeDelta;
use mockable::Clock;
use pagination::PageLimit;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

use voucher_backend::domain::ports::{
    LedgerCommand, LedgerPage, LedgerPageRequest, LedgerQuery, WalletSummaryQuery,
};
use voucher_backend::domain::{
    Error, LedgerEntryDraft, LedgerEntryType, MaintenanceReport, OfferId, WalletSummary,
};
use voucher_backend::test_support::OfferSeed;
use voucher_world::VoucherWorld;

struct WalletWorld {
    base: VoucherWorld,
    summary: Cell<Option<WalletSummary>>,
    page: RefCell<Option<LedgerPage>>,
    page_limit: Cell<Option<PageLimit>>,
    append_error: RefCell<Option<Error>>,
    report: Cell<Option<MaintenanceReport>>,
}

impl WalletWorld {
    fn append(&self, entry_type: LedgerEntryType, amount: i64) {
        let draft = LedgerEntryDraft::new(self.base.user, entry_type, amount).expect("valid draft");
        let result = self.base.block_on(self.base.ledger.append_entry(draft));
        *self.append_error.borrow_mut() = result.err();
        self.base.advance(Duration::from_secs(60));
    }

    fn request_summary(&self) -> WalletSummary {
        self.base
            .block_on(self.base.wallet.summary(&self.base.user))
            .expect("summary")
    }

    fn fetch_page(&self, limit: PageLimit, cursor: Option<voucher_backend::domain::LedgerEntryId>) {
        let request = LedgerPageRequest {
            user_id: self.base.user,
            cursor,
            limit,
        };
        let page = self
            .base
            .block_on(self.base.ledger.list_entries(request))
            .expect("ledger page");
        *self.page.borrow_mut() = Some(page);
    }

    fn current_summary(&self) -> WalletSummary {
        self.summary.get().expect("summary was requested")
    }
}

#[fixture]
fn world() -> WalletWorld {
    WalletWorld {
        base: VoucherWorld::new(),
        summary: Cell::new(None),
        page: RefCell::new(None),
        page_limit: Cell::new(None),
        append_error: RefCell::new(None),
        report: Cell::new(None),
    }
}

#[given("a user with an empty wallet")]
fn a_user_with_an_empty_wallet(world: &WalletWorld) {
    assert!(world.base.store.ledger_of(world.base.user).is_empty());
}

#[given("a user with {count} ledger entries")]
fn a_user_with_ledger_entries(world: &WalletWorld, count: i64) {
    for amount in 1..=count {
        world.append(LedgerEntryType::Earn, amount);
    }
}

#[given("the user accepted an offer ending in {hours} hours")]
fn the_user_accepted_an_offer(world: &WalletWorld, hours: i64) {
    let offer_id = OfferId::random();
    world.base.store.seed_offer(OfferSeed {
        id: offer_id,
        title: "Free coffee",
        end_at: world.base.clock.utc() + TimeDelta::hours(hours),
        reward_points: 0,
    });
    world.base.store.deliver(world.base.user, offer_id);
    world
        .base
        .block_on(world.base.offers.accept(world.base.user, offer_id))
        .expect("offer accepted");
}

#[when("the wallet summary is requested")]
fn the_wallet_summary_is_requested(world: &WalletWorld) {
    world.summary.set(Some(world.request_summary()));
}

#[when("the user earns {amount} points")]
fn the_user_earns(world: &WalletWorld, amount: i64) {
    world.append(LedgerEntryType::Earn, amount);
}

#[when("the user spends {amount} points")]
fn the_user_spends(world: &WalletWorld, amount: i64) {
    world.append(LedgerEntryType::Spend, -amount);
}

#[when("the user is rewarded {amount} points")]
fn the_user_is_rewarded(world: &WalletWorld, amount: i64) {
    world.append(LedgerEntryType::Reward, amount);
}

#[when("the first ledger page of {limit} entries is requested")]
fn the_first_ledger_page_is_requested(world: &WalletWorld, limit: u32) {
    let limit = PageLimit::from_query(Some(limit)).expect("valid limit");
    world.page_limit.set(Some(limit));
    world.fetch_page(limit, None);
}

#[when("the next ledger page is requested")]
fn the_next_ledger_page_is_requested(world: &WalletWorld) {
    let cursor = world
        .page
        .borrow()
        .as_ref()
        .and_then(|page| page.next_cursor)
        .expect("a next cursor");
    let limit = world.page_limit.get().expect("first page requested");
    world.fetch_page(limit, Some(cursor));
}

#[when("{hours} hours pass")]
fn hours_pass(world: &WalletWorld, hours: u64) {
    world.base.advance(Duration::from_secs(hours * 3600));
}

#[when("maintenance runs")]
fn maintenance_runs(world: &WalletWorld) {
    let report = world.base.block_on(world.base.maintenance.run_once());
    world.report.set(Some(report));
}

#[then("the summary shows {points} points")]
fn the_summary_shows_points(world: &WalletWorld, points: i64) {
    assert_eq!(world.current_summary().points, points);
}

#[then("the wallet summary shows {points} points")]
fn the_wallet_summary_shows_points(world: &WalletWorld, points: i64) {
    assert_eq!(world.request_summary().points, points);
}

#[then("the stamp card shows {count} stamps with {remaining} to the next reward")]
fn the_stamp_card_shows(world: &WalletWorld, count: u64, remaining: u64) {
    let stamps = world.current_summary().stamps;
    assert_eq!(stamps.count, count);
    assert_eq!(stamps.next_reward_in, remaining);
}

#[then("the summary shows {active} active and {expiring} expiring vouchers")]
fn the_summary_shows_vouchers(world: &WalletWorld, active: u64, expiring: u64) {
    let vouchers = world.current_summary().vouchers;
    assert_eq!(vouchers.active, active);
    assert_eq!(vouchers.expiring, expiring);
}

#[then("the latest balance is {points} points")]
fn the_latest_balance_is(world: &WalletWorld, points: i64) {
    let ledger = world.base.store.ledger_of(world.base.user);
    assert_eq!(ledger.last().map(|entry| entry.balance_after), Some(points));
}

#[then("the ledger append fails with {code}")]
fn the_ledger_append_fails_with(world: &WalletWorld, code: String) {
    let error = world.append_error.borrow();
    let error = error.as_ref().expect("append was rejected");
    assert_eq!(error.code().as_str(), code.trim_matches('"'));
}

#[then("the page holds {count} entries, newest first")]
fn the_page_holds_entries(world: &WalletWorld, count: usize) {
    let page = world.page.borrow();
    let page = page.as_ref().expect("page was requested");
    assert_eq!(page.items.len(), count);
    assert!(
        page.items
            .windows(2)
            .all(|pair| matches!(pair, [newer, older] if newer.created_at >= older.created_at))
    );
}

#[then("the page has a next cursor")]
fn the_page_has_a_next_cursor(world: &WalletWorld) {
    let page = world.page.borrow();
    assert!(page.as_ref().is_some_and(|page| page.next_cursor.is_some()));
}

#[then("the page has no next cursor")]
fn the_page_has_no_next_cursor(world: &WalletWorld) {
    let page = world.page.borrow();
    assert!(page.as_ref().is_some_and(|page| page.next_cursor.is_none()));
}

#[then("{count} voucher was expired by maintenance")]
fn vouchers_expired_by_maintenance(world: &WalletWorld, count: u64) {
    let report = world.report.get().expect("maintenance ran");
    assert_eq!(report.vouchers_expired, count);
}

#[scenario(
    path = "tests/features/wallet_ledger.feature",
    name = "An empty wallet has no points and a fresh stamp card"
)]
fn empty_wallet(world: WalletWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/wallet_ledger.feature",
    name = "Ledger entries keep a running balance"
)]
fn running_balance(world: WalletWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/wallet_ledger.feature",
    name = "Spending more than the balance is rejected"
)]
fn overspend_rejected(world: WalletWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/wallet_ledger.feature",
    name = "Ledger pages run newest first with a cursor"
)]
fn ledger_pagination(world: WalletWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/wallet_ledger.feature",
    name = "Vouchers near their end count as expiring"
)]
fn expiring_vouchers(world: WalletWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/wallet_ledger.feature",
    name = "Maintenance expires vouchers past their end"
)]
fn maintenance_expires_vouchers(world: WalletWorld) {
    let _ = world;
}
