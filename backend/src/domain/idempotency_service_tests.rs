//! Tests for claim-first idempotent execution.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::TimeZone;
use rstest::{fixture, rstest};
use serde_json::json;
use uuid::Uuid;

use super::*;
use crate::domain::ports::MockIdempotencyStore;
use crate::domain::{ErrorCode, IdempotencyKey, IdempotencyScope, PayloadHash, UserId};
use crate::test_support::MutableClock;

#[fixture]
fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 2, 1, 10, 0, 0)
        .single()
        .expect("valid time")
}

#[fixture]
fn query() -> IdempotencyLookupQuery {
    IdempotencyLookupQuery::new(
        IdempotencyKey::from_uuid(Uuid::from_u128(42)),
        UserId::from_uuid(Uuid::from_u128(1)),
        IdempotencyScope::OfferAccept,
        PayloadHash::from_bytes([5; 32]),
    )
}

fn service(
    store: MockIdempotencyStore,
    now: DateTime<Utc>,
) -> IdempotencyService<MockIdempotencyStore> {
    IdempotencyService::new(
        Arc::new(store),
        IdempotencyConfig::default(),
        Arc::new(MutableClock::new(now)),
    )
}

fn completed(
    query: &IdempotencyLookupQuery,
    now: DateTime<Utc>,
    body: serde_json::Value,
) -> IdempotencyRecord {
    let mut record = IdempotencyRecord::claim(query, now, TimeDelta::seconds(60));
    record.state = IdempotencyState::Completed(StoredResponse::new(201, body));
    record.expires_at = now + TimeDelta::hours(24);
    record
}

#[rstest]
#[tokio::test]
async fn miss_runs_operation_and_stores_response(
    now: DateTime<Utc>,
    query: IdempotencyLookupQuery,
) {
    let mut store = MockIdempotencyStore::new();
    store.expect_find().times(1).return_once(|_, _| Ok(None));
    store.expect_claim().times(1).return_once(|_| Ok(()));
    store
        .expect_complete()
        .withf(move |_, response, expires_at| {
            response.status() == 201 && *expires_at == now + TimeDelta::hours(24)
        })
        .times(1)
        .return_once(|_, _, _| Ok(()));
    store.expect_release().never();

    let reply = service(store, now)
        .execute(query, || async { Ok(StoredResponse::new(201, json!({"ok": true}))) })
        .await
        .expect("fresh execution");

    assert!(!reply.replayed);
    assert_eq!(reply.response.body(), &json!({"ok": true}));
}

#[rstest]
#[tokio::test]
async fn completed_record_is_replayed_without_running(
    now: DateTime<Utc>,
    query: IdempotencyLookupQuery,
) {
    let record = completed(&query, now, json!({"voucher_id": "v"}));
    let mut store = MockIdempotencyStore::new();
    store.expect_find().return_once(move |_, _| Ok(Some(record)));
    store.expect_claim().never();

    let runs = AtomicUsize::new(0);
    let reply = service(store, now)
        .execute(query, || async {
            runs.fetch_add(1, Ordering::SeqCst);
            Ok(StoredResponse::new(201, json!({})))
        })
        .await
        .expect("replay");

    assert!(reply.replayed);
    assert_eq!(reply.response.body(), &json!({"voucher_id": "v"}));
    assert_eq!(runs.load(Ordering::SeqCst), 0);
}

#[rstest]
#[tokio::test]
async fn different_payload_under_same_key_conflicts(
    now: DateTime<Utc>,
    query: IdempotencyLookupQuery,
) {
    let other = IdempotencyLookupQuery {
        payload_hash: PayloadHash::from_bytes([6; 32]),
        ..query
    };
    let record = completed(&other, now, json!({}));
    let mut store = MockIdempotencyStore::new();
    store.expect_find().return_once(move |_, _| Ok(Some(record)));

    let error = service(store, now)
        .execute(query, || async { Ok(StoredResponse::new(201, json!({}))) })
        .await
        .expect_err("conflict");

    assert_eq!(error.code(), ErrorCode::Conflict);
}

#[rstest]
#[tokio::test]
async fn failed_operation_releases_claim(now: DateTime<Utc>, query: IdempotencyLookupQuery) {
    let mut store = MockIdempotencyStore::new();
    store.expect_find().return_once(|_, _| Ok(None));
    store.expect_claim().return_once(|_| Ok(()));
    store.expect_release().times(1).return_once(|_| Ok(()));
    store.expect_complete().never();

    let error = service(store, now)
        .execute(query, || async { Err(Error::not_found("offer is not in your inbox")) })
        .await
        .expect_err("operation error propagates");

    assert_eq!(error.code(), ErrorCode::NotFound);
}

#[rstest]
#[tokio::test]
async fn terminal_business_error_is_cached(now: DateTime<Utc>, query: IdempotencyLookupQuery) {
    let mut store = MockIdempotencyStore::new();
    store.expect_find().return_once(|_, _| Ok(None));
    store.expect_claim().return_once(|_| Ok(()));
    store
        .expect_complete()
        .withf(|_, response, _| response.status() == 410)
        .times(1)
        .return_once(|_, _, _| Ok(()));
    store.expect_release().never();

    let reply = service(store, now)
        .execute(query, || async { Err(Error::expired("offer has ended")) })
        .await
        .expect("cached as a response");

    assert_eq!(reply.response.status(), 410);
    assert_eq!(reply.response.body()["code"], json!("expired"));
    assert!(reply.response.body().get("traceId").is_none());
}

#[rstest]
#[tokio::test]
async fn claim_race_loser_replays_winner(now: DateTime<Utc>, query: IdempotencyLookupQuery) {
    let record = completed(&query, now, json!({"voucher_id": "w"}));
    let mut store = MockIdempotencyStore::new();
    let mut seq = mockall::Sequence::new();
    store
        .expect_find()
        .times(1)
        .in_sequence(&mut seq)
        .return_once(|_, _| Ok(None));
    store.expect_claim().return_once(|_| {
        Err(IdempotencyStoreError::duplicate_key("offer_accept"))
    });
    store
        .expect_find()
        .times(1)
        .in_sequence(&mut seq)
        .return_once(move |_, _| Ok(Some(record)));

    let reply = service(store, now)
        .execute(query, || async { Ok(StoredResponse::new(201, json!({}))) })
        .await
        .expect("winner replayed");

    assert!(reply.replayed);
    assert_eq!(reply.response.body(), &json!({"voucher_id": "w"}));
}

#[rstest]
#[tokio::test]
async fn winner_still_running_after_polling_is_a_conflict(
    now: DateTime<Utc>,
    query: IdempotencyLookupQuery,
) {
    let in_progress = IdempotencyRecord::claim(&query, now, TimeDelta::seconds(60));
    let mut store = MockIdempotencyStore::new();
    store
        .expect_find()
        .times(DUPLICATE_RACE_MAX_RETRIES + 1)
        .returning(move |_, _| Ok(Some(in_progress.clone())));
    store.expect_claim().never();

    let error = service(store, now)
        .execute(query, || async { Ok(StoredResponse::new(201, json!({}))) })
        .await
        .expect_err("still in progress");

    assert_eq!(error.code(), ErrorCode::Conflict);
    assert_eq!(error.message(), IN_PROGRESS_MESSAGE);
}

#[rstest]
#[tokio::test]
async fn store_outage_is_a_server_error(now: DateTime<Utc>, query: IdempotencyLookupQuery) {
    let mut store = MockIdempotencyStore::new();
    store
        .expect_find()
        .return_once(|_, _| Err(IdempotencyStoreError::connection("pool timed out")));

    let error = service(store, now)
        .execute(query, || async { Ok(StoredResponse::new(201, json!({}))) })
        .await
        .expect_err("store failure");

    assert_eq!(error.code(), ErrorCode::ServerError);
}
