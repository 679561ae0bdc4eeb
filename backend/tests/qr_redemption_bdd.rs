//! Behaviour tests for QR code issue and redemption.

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

use voucher_backend::domain::ports::{
    IssueQrRequest, IssuedQrCode, QrRedemptionCommand, VerifyQrRequest,
};
use voucher_backend::domain::{
    Error, GeoPoint, PresentedCode, QrVerifyOutcome, VoucherId, VoucherStatus,
};
use voucher_world::VoucherWorld;

const SHOP_LAT: f64 = 52.520_008;
const SHOP_LNG: f64 = 13.404_954;

struct QrWorld {
    base: VoucherWorld,
    voucher: Cell<Option<VoucherId>>,
    codes: RefCell<Vec<IssuedQrCode>>,
    outcome: Cell<Option<QrVerifyOutcome>>,
    issue_error: RefCell<Option<Error>>,
}

impl QrWorld {
    fn voucher_id(&self) -> VoucherId {
        self.voucher.get().expect("voucher was seeded")
    }

    fn voucher_status(&self) -> VoucherStatus {
        self.base
            .store
            .voucher(self.voucher_id())
            .expect("voucher row")
            .status
    }

    fn issue(&self) -> Result<IssuedQrCode, Error> {
        let request = IssueQrRequest {
            user_id: self.base.user,
            voucher_id: self.voucher_id(),
        };
        self.base.block_on(self.base.qr.issue_token(request))
    }

    fn scan(&self, raw: String, location: Option<GeoPoint>) {
        let request = VerifyQrRequest {
            code: PresentedCode::new(raw).expect("well-formed code"),
            location,
        };
        let outcome = self
            .base
            .block_on(self.base.qr.verify(request))
            .expect("verification succeeds");
        self.outcome.set(Some(outcome));
    }

    fn scan_code_at(&self, index: usize, location: Option<GeoPoint>) {
        let raw = self
            .codes
            .borrow()
            .get(index)
            .expect("code was issued")
            .code
            .clone();
        self.scan(raw, location);
    }

    fn latest_code_index(&self) -> usize {
        self.codes
            .borrow()
            .len()
            .checked_sub(1)
            .expect("a code was issued")
    }

    fn last_outcome(&self) -> QrVerifyOutcome {
        self.outcome.get().expect("a code was scanned")
    }
}

#[fixture]
fn world() -> QrWorld {
    QrWorld {
        base: VoucherWorld::new(),
        voucher: Cell::new(None),
        codes: RefCell::new(Vec::new()),
        outcome: Cell::new(None),
        issue_error: RefCell::new(None),
    }
}

#[given("the user holds a voucher for an offer ending in {hours} hours worth {points} points")]
fn the_user_holds_a_voucher(world: &QrWorld, hours: i64, points: i64) {
    world.base.deliver_offer(hours, points);
    let accepted = world
        .base
        .block_on(world.base.offers.accept(world.base.user, world.base.offer))
        .expect("offer accepted");
    world.voucher.set(Some(accepted.voucher_id));
}

#[given("a QR code was issued for the voucher")]
fn a_qr_code_was_issued(world: &QrWorld) {
    let issued = world.issue().expect("code issued");
    world.codes.borrow_mut().push(issued);
}

#[given("the offer's place is {meters} metres from the scanner")]
fn the_offers_place_is(world: &QrWorld, meters: f64) {
    world.base.store.set_distance(world.base.offer, meters);
}

#[when("{amount} seconds pass")]
fn seconds_pass(world: &QrWorld, amount: u64) {
    world.base.advance(Duration::from_secs(amount));
}

#[when("{amount} hours pass")]
fn hours_pass(world: &QrWorld, amount: u64) {
    world.base.advance(Duration::from_secs(amount * 3600));
}

#[when("the code is scanned")]
fn the_code_is_scanned(world: &QrWorld) {
    world.scan_code_at(world.latest_code_index(), None);
}

#[when("the code is scanned at the shop's coordinates")]
fn the_code_is_scanned_at_the_shop(world: &QrWorld) {
    let point = GeoPoint::new(SHOP_LAT, SHOP_LNG).expect("valid coordinates");
    world.scan_code_at(world.latest_code_index(), Some(point));
}

#[when("the previous code is scanned")]
fn the_previous_code_is_scanned(world: &QrWorld) {
    world.scan_code_at(0, None);
}

#[when("an unknown code is scanned")]
fn an_unknown_code_is_scanned(world: &QrWorld) {
    world.scan(PresentedCode::generate().expose().to_owned(), None);
}

#[when("a new code is requested for the voucher")]
fn a_new_code_is_requested(world: &QrWorld) {
    let error = world.issue().expect_err("issue rejected");
    *world.issue_error.borrow_mut() = Some(error);
}

#[then("the scan reports success")]
fn the_scan_reports_success(world: &QrWorld) {
    assert_eq!(
        world.last_outcome(),
        QrVerifyOutcome::Success {
            voucher_id: world.voucher_id()
        }
    );
}

#[then("the scan reports already used")]
fn the_scan_reports_already_used(world: &QrWorld) {
    assert!(matches!(
        world.last_outcome(),
        QrVerifyOutcome::AlreadyUsed { used_at: Some(_) }
    ));
}

#[then("the scan reports expired")]
fn the_scan_reports_expired(world: &QrWorld) {
    assert!(matches!(
        world.last_outcome(),
        QrVerifyOutcome::Expired { .. }
    ));
}

#[then("the scan reports invalid")]
fn the_scan_reports_invalid(world: &QrWorld) {
    assert_eq!(world.last_outcome(), QrVerifyOutcome::Invalid);
}

#[then("the voucher is used")]
fn the_voucher_is_used(world: &QrWorld) {
    assert_eq!(world.voucher_status(), VoucherStatus::Used);
}

#[then("the voucher is active")]
fn the_voucher_is_active(world: &QrWorld) {
    assert_eq!(world.voucher_status(), VoucherStatus::Active);
}

#[then("the voucher is expired")]
fn the_voucher_is_expired(world: &QrWorld) {
    assert_eq!(world.voucher_status(), VoucherStatus::Expired);
}

#[then("the user's balance is {points} points")]
fn the_users_balance_is(world: &QrWorld, points: i64) {
    let ledger = world.base.store.ledger_of(world.base.user);
    assert_eq!(ledger.len(), 1, "one credit per redemption");
    assert_eq!(ledger.last().map(|entry| entry.balance_after), Some(points));
}

#[then("the issue request fails with {code}")]
fn the_issue_request_fails_with(world: &QrWorld, code: String) {
    let error = world.issue_error.borrow();
    let error = error.as_ref().expect("issue was rejected");
    assert_eq!(error.code().as_str(), code.trim_matches('"'));
}

#[scenario(
    path = "tests/features/qr_redemption.feature",
    name = "A fresh code redeems the voucher"
)]
fn fresh_code_redeems(world: QrWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/qr_redemption.feature",
    name = "Scanning a redeemed code reports it as used"
)]
fn redeemed_code_reports_used(world: QrWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/qr_redemption.feature",
    name = "An unknown code is invalid"
)]
fn unknown_code_invalid(world: QrWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/qr_redemption.feature",
    name = "A code past its lifetime expires without touching the voucher"
)]
fn code_past_lifetime(world: QrWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/qr_redemption.feature",
    name = "A voucher past its end expires on scan"
)]
fn voucher_past_end(world: QrWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/qr_redemption.feature",
    name = "A scan too far from the place is invalid"
)]
fn scan_too_far(world: QrWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/qr_redemption.feature",
    name = "A scan within range redeems the voucher"
)]
fn scan_within_range(world: QrWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/qr_redemption.feature",
    name = "Issuing a new code supersedes the previous one"
)]
fn new_code_supersedes(world: QrWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/qr_redemption.feature",
    name = "A redeemed voucher cannot receive a new code"
)]
fn redeemed_voucher_rejects_issue(world: QrWorld) {
    let _ = world;
}
