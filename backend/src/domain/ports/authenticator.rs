//! Driven port resolving bearer credentials to a user identity.
//!
//! Token issuance lives with an external identity provider; the sync API only
//! needs to turn a presented token into the [`UserId`] that scopes every
//! query.

use async_trait::async_trait;

use crate::domain::UserId;

use super::define_port_error;

define_port_error! {
    /// Errors raised by authenticator adapters.
    pub enum AuthenticatorError {
        /// The identity provider could not be reached.
        Unavailable { message: String } =>
            "identity provider unavailable: {message}",
    }
}

/// Resolve an access token to the user it was issued for.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Return the owning user, or `None` for unknown or revoked tokens.
    async fn authenticate(&self, token: &str) -> Result<Option<UserId>, AuthenticatorError>;
}

/// Authenticator that accepts every token as one fixed user.
///
/// Useful in handler tests where identity is not under test.
#[derive(Debug, Clone, Copy)]
pub struct FixtureAuthenticator(pub UserId);

#[async_trait]
impl Authenticator for FixtureAuthenticator {
    async fn authenticate(&self, _token: &str) -> Result<Option<UserId>, AuthenticatorError> {
        Ok(Some(self.0))
    }
}
