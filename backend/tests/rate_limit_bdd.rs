//! Behaviour tests for fixed-window request budgets.

#[expect(
    dead_code,
    reason = "The shared world wires services other suites exercise."
)]
#[path = "support/voucher_world.rs"]
mod voucher_world;

use std::cell::{Cell, RefCell};
use std::time::Duration;

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

use voucher_backend::domain::ports::RequestThrottle;
use voucher_backend::domain::{Error, ErrorCode, MaintenanceReport, RateLimitPolicy};
use voucher_world::VoucherWorld;

const OTHER_USER: &str = "22222222-2222-2222-2222-222222222222";

struct RateLimitWorld {
    base: VoucherWorld,
    outcomes: RefCell<Vec<Result<(), Error>>>,
    report: Cell<Option<MaintenanceReport>>,
}

impl RateLimitWorld {
    fn identity(&self) -> String {
        self.base.user.to_string()
    }

    fn make_requests(&self, policy: RateLimitPolicy, identity: &str, count: u32) {
        self.outcomes.borrow_mut().clear();
        for _ in 0..count {
            let outcome = self.base.block_on(self.base.limiter.admit(policy, identity));
            self.outcomes.borrow_mut().push(outcome);
        }
    }
}

#[fixture]
fn world() -> RateLimitWorld {
    RateLimitWorld {
        base: VoucherWorld::new(),
        outcomes: RefCell::new(Vec::new()),
        report: Cell::new(None),
    }
}

#[given("a limiter with the offer acceptance policy")]
fn a_limiter_with_the_offer_acceptance_policy(world: &RateLimitWorld) {
    assert!(world.outcomes.borrow().is_empty());
    assert_eq!(RateLimitPolicy::OFFER_ACCEPT.limit(), 10);
}

#[given("the user has exhausted the offer acceptance budget")]
fn the_user_has_exhausted_the_budget(world: &RateLimitWorld) {
    let identity = world.identity();
    world.make_requests(RateLimitPolicy::OFFER_ACCEPT, &identity, 11);
    assert!(
        world
            .outcomes
            .borrow()
            .last()
            .is_some_and(Result::is_err)
    );
}

#[when("the user makes {count} offer acceptance requests")]
fn the_user_makes_offer_requests(world: &RateLimitWorld, count: u32) {
    let identity = world.identity();
    world.make_requests(RateLimitPolicy::OFFER_ACCEPT, &identity, count);
}

#[when("the user makes {count} wallet summary requests")]
fn the_user_makes_summary_requests(world: &RateLimitWorld, count: u32) {
    let identity = world.identity();
    world.make_requests(RateLimitPolicy::WALLET_SUMMARY, &identity, count);
}

#[when("another user makes {count} offer acceptance requests")]
fn another_user_makes_requests(world: &RateLimitWorld, count: u32) {
    world.make_requests(RateLimitPolicy::OFFER_ACCEPT, OTHER_USER, count);
}

#[when("{seconds} seconds pass")]
fn seconds_pass(world: &RateLimitWorld, seconds: u64) {
    world.base.advance(Duration::from_secs(seconds));
}

#[when("maintenance runs")]
fn maintenance_runs(world: &RateLimitWorld) {
    let report = world.base.block_on(world.base.maintenance.run_once());
    world.report.set(Some(report));
}

#[then("every request was admitted")]
fn every_request_was_admitted(world: &RateLimitWorld) {
    let outcomes = world.outcomes.borrow();
    assert!(!outcomes.is_empty());
    assert!(outcomes.iter().all(Result::is_ok), "outcomes: {outcomes:?}");
}

#[then("the last request is rate limited")]
fn the_last_request_is_rate_limited(world: &RateLimitWorld) {
    let outcomes = world.outcomes.borrow();
    let (last, earlier) = outcomes.split_last().expect("requests were made");
    assert!(earlier.iter().all(Result::is_ok));
    let error = last.as_ref().expect_err("over budget");
    assert_eq!(error.code(), ErrorCode::RateLimited);
}

#[then("the retry hint is {seconds} seconds")]
fn the_retry_hint_is(world: &RateLimitWorld, seconds: u64) {
    let outcomes = world.outcomes.borrow();
    let error = outcomes
        .last()
        .expect("requests were made")
        .as_ref()
        .expect_err("over budget");
    assert_eq!(error.retry_after_secs(), Some(seconds));
}

#[then("{count} rate limit counter was purged")]
fn counters_were_purged(world: &RateLimitWorld, count: u64) {
    let report = world.report.get().expect("maintenance ran");
    assert_eq!(report.counters_purged, count);
}

#[scenario(
    path = "tests/features/rate_limit.feature",
    name = "Requests within the budget are admitted"
)]
fn requests_within_budget(world: RateLimitWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/rate_limit.feature",
    name = "The request after the budget is rejected"
)]
fn request_after_budget(world: RateLimitWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/rate_limit.feature",
    name = "A new window restores the budget"
)]
fn new_window_restores_budget(world: RateLimitWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/rate_limit.feature",
    name = "Budgets are tracked per identity"
)]
fn budgets_per_identity(world: RateLimitWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/rate_limit.feature",
    name = "Budgets are tracked per scope"
)]
fn budgets_per_scope(world: RateLimitWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/rate_limit.feature",
    name = "Maintenance drops counters from ended windows"
)]
fn maintenance_drops_counters(world: RateLimitWorld) {
    let _ = world;
}
