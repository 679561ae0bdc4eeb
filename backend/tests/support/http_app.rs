//! Actix test app serving the versioned API over in-memory adapters.

use std::sync::Arc;

use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::body::MessageBody;
use actix_web::cookie::{Cookie, Key};
use actix_web::dev::{Service, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpResponse, web};
use actix_web::test as actix_test;
use chrono::{TimeDelta, TimeZone, Utc};
use mockable::Clock;
use uuid::Uuid;

use voucher_backend::Trace;
use voucher_backend::domain::{
    Error, FixedWindowRateLimiter, IdempotencyConfig, IdempotencyService, LedgerService,
    OfferAcceptanceService, OfferId, QrRedemptionConfig, QrRedemptionService, UserId,
    WalletSummaryService, WalletVoucherService,
};
use voucher_backend::inbound::http::session::SessionContext;
use voucher_backend::inbound::http::state::HttpState;
use voucher_backend::inbound::http::validation::{json_config, path_config, query_config};
use voucher_backend::inbound::http::{API_PREFIX, configure_api};
use voucher_backend::outbound::memory::{InMemoryIdempotencyStore, InMemoryRateLimitStore};
use voucher_backend::test_support::{InMemoryVoucherStore, MutableClock, OfferSeed};

pub(crate) struct Backend {
    pub(crate) state: HttpState,
    pub(crate) store: Arc<InMemoryVoucherStore>,
    pub(crate) clock: Arc<MutableClock>,
    pub(crate) user: UserId,
    pub(crate) offer: OfferId,
}

/// Wire every service over fresh in-memory adapters and deliver one offer,
/// worth `reward_points`, to the test user.
pub(crate) fn backend(reward_points: i64) -> Backend {
    let start = Utc
        .with_ymd_and_hms(2026, 4, 2, 8, 0, 0)
        .single()
        .expect("valid start");
    let clock = Arc::new(MutableClock::new(start));
    let dyn_clock: Arc<dyn Clock> = clock.clone();
    let store = Arc::new(InMemoryVoucherStore::default());
    let idempotency = IdempotencyService::new(
        Arc::new(InMemoryIdempotencyStore::default()),
        IdempotencyConfig::default(),
        dyn_clock.clone(),
    );
    let user = UserId::from_uuid(Uuid::from_u128(0x11));
    let offer = OfferId::from_uuid(Uuid::from_u128(0x22));
    store.seed_offer(OfferSeed {
        id: offer,
        title: "Free coffee",
        end_at: start + TimeDelta::hours(24),
        reward_points,
    });
    store.deliver(user, offer);

    let state = HttpState {
        offers: Arc::new(OfferAcceptanceService::new(
            store.clone(),
            idempotency,
            dyn_clock.clone(),
        )),
        qr: Arc::new(QrRedemptionService::new(
            store.clone(),
            store.clone(),
            QrRedemptionConfig::default(),
            dyn_clock.clone(),
        )),
        vouchers: Arc::new(WalletVoucherService::new(store.clone())),
        ledger: Arc::new(LedgerService::new(store.clone(), dyn_clock.clone())),
        wallet: Arc::new(WalletSummaryService::new(
            store.clone(),
            store.clone(),
            dyn_clock.clone(),
        )),
        throttle: Arc::new(FixedWindowRateLimiter::new(
            Arc::new(InMemoryRateLimitStore::default()),
            dyn_clock,
        )),
    };

    Backend {
        state,
        store,
        clock,
        user,
        offer,
    }
}

async fn login_as(session: SessionContext, path: web::Path<String>) -> Result<HttpResponse, Error> {
    let user_id: UserId = path
        .parse()
        .map_err(|_| Error::invalid_param("user id must be a UUID"))?;
    session.persist_user(&user_id)?;
    Ok(HttpResponse::NoContent().finish())
}

/// App serving the API plus `POST /test/login/{user_id}`.
pub(crate) fn app(
    state: HttpState,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let session = SessionMiddleware::builder(CookieSessionStore::default(), Key::generate())
        .cookie_name("session".to_owned())
        .cookie_secure(false)
        .build();
    App::new()
        .app_data(web::Data::new(state))
        .app_data(json_config())
        .app_data(query_config())
        .app_data(path_config())
        .service(web::scope(API_PREFIX).configure(configure_api))
        .route("/test/login/{user_id}", web::post().to(login_as))
        .wrap(session)
        .wrap(Trace)
}

/// Log `user` in and return the session cookie.
pub(crate) async fn login<S, B>(app: &S, user: &UserId) -> Cookie<'static>
where
    S: Service<actix_http::Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
{
    let res = actix_test::call_service(
        app,
        actix_test::TestRequest::post()
            .uri(&format!("/test/login/{user}"))
            .to_request(),
    )
    .await;
    res.response()
        .cookies()
        .find(|cookie| cookie.name() == "session")
        .map(Cookie::into_owned)
        .expect("session cookie set")
}
