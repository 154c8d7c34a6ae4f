//! Bearer token authentication for HTTP handlers.
//!
//! [`AuthenticatedUser`] is an extractor: listing it first among a
//! handler's arguments rejects unauthenticated requests with `401` before
//! the body is parsed or any port is called.

use actix_web::http::header::{AUTHORIZATION, HeaderMap};
use actix_web::{FromRequest, HttpRequest, dev::Payload, web};
use futures_util::future::LocalBoxFuture;
use tracing::warn;

use crate::domain::{Error, UserId};

use super::state::HttpState;

const BEARER_PREFIX: &str = "Bearer ";

/// Identity of the caller, resolved from the `Authorization` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser(UserId);

impl AuthenticatedUser {
    /// The authenticated user's id.
    #[must_use]
    pub const fn user_id(&self) -> &UserId {
        &self.0
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let prefix = value.get(..BEARER_PREFIX.len())?;
    if !prefix.eq_ignore_ascii_case(BEARER_PREFIX) {
        return None;
    }
    let token = value.get(BEARER_PREFIX.len()..)?.trim();
    (!token.is_empty()).then(|| token.to_owned())
}

impl FromRequest for AuthenticatedUser {
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let state = req.app_data::<web::Data<HttpState>>().cloned();
        let token = bearer_token(req.headers());
        Box::pin(async move {
            let Some(state) = state else {
                return Err(Error::internal("authenticator is not configured"));
            };
            let Some(token) = token else {
                return Err(Error::unauthorized("missing bearer token"));
            };
            match state.authenticator.authenticate(&token).await {
                Ok(Some(user_id)) => Ok(Self(user_id)),
                Ok(None) => Err(Error::unauthorized("invalid bearer token")),
                Err(error) => {
                    warn!(%error, "authenticator failed");
                    Err(Error::service_unavailable("authentication is unavailable"))
                }
            }
        })
    }
}
