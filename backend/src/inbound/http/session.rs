//! Cookie session access for handlers.
//!
//! Sessions are minted by an external login flow. The API only reads the
//! `user_id` the signed cookie carries; a missing or unparsable id is the
//! same as being logged out and surfaces as `401 unauthorized`.

use actix_session::Session;
use actix_web::{FromRequest, HttpRequest, dev::Payload};
use futures_util::future::LocalBoxFuture;

use crate::domain::{Error, UserId};

pub(crate) const USER_ID_KEY: &str = "user_id";

/// Extractor wrapping the Actix session with user-id accessors.
#[derive(Clone)]
pub struct SessionContext(Session);

impl SessionContext {
    /// Wrap an Actix session.
    pub fn new(session: Session) -> Self {
        Self(session)
    }

    /// Store `user_id` in the session cookie.
    ///
    /// Deployments that front the API with their own login endpoint call
    /// this once the user has authenticated.
    pub fn persist_user(&self, user_id: &UserId) -> Result<(), Error> {
        self.0
            .insert(USER_ID_KEY, user_id.to_string())
            .map_err(|error| Error::internal(format!("failed to persist session: {error}")))
    }

    /// The user id carried by the cookie, or `None` when absent or tampered.
    pub fn user_id(&self) -> Result<Option<UserId>, Error> {
        let raw = self
            .0
            .get::<String>(USER_ID_KEY)
            .map_err(|error| Error::internal(format!("failed to read session: {error}")))?;
        Ok(raw.and_then(|value| decode_user_id(&value)))
    }

    /// The authenticated user, or `401 unauthorized`.
    pub fn require_user_id(&self) -> Result<UserId, Error> {
        self.user_id()?
            .ok_or_else(|| Error::unauthorized("login required"))
    }
}

fn decode_user_id(raw: &str) -> Option<UserId> {
    raw.parse::<UserId>()
        .inspect_err(|error| tracing::warn!(%error, "discarding malformed user id in session"))
        .ok()
}

impl FromRequest for SessionContext {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let session = Session::from_request(req, payload);
        Box::pin(async move { session.await.map(Self::new) })
    }
}
