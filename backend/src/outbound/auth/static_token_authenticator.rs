//! Authenticator backed by a fixed token table.
//!
//! The table is configured as `token=user-uuid` pairs separated by commas,
//! for deployments where an upstream gateway issues tokens out of band.

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::debug;

use crate::domain::ports::{Authenticator, AuthenticatorError};
use crate::domain::{UserId, UserIdError};

/// Errors raised while parsing a token table.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenMapError {
    /// An entry is not of the form `token=user-uuid`.
    #[error("token entry {position} is not of the form token=user-id")]
    Malformed { position: usize },
    /// An entry names an invalid user id.
    #[error("token entry {position} has an invalid user id: {source}")]
    InvalidUser {
        position: usize,
        #[source]
        source: UserIdError,
    },
    /// The same token appears twice.
    #[error("token entry {position} repeats an earlier token")]
    Duplicate { position: usize },
}

/// Resolves bearer tokens against an in-process table.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenAuthenticator {
    tokens: HashMap<String, UserId>,
}

impl StaticTokenAuthenticator {
    /// Build from explicit pairs.
    pub fn from_pairs<I, T>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (T, UserId)>,
        T: Into<String>,
    {
        Self {
            tokens: pairs
                .into_iter()
                .map(|(token, user)| (token.into(), user))
                .collect(),
        }
    }

    /// Parse a `token=user-uuid,...` table. Blank entries are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`TokenMapError`] naming the first bad entry.
    pub fn parse(table: &str) -> Result<Self, TokenMapError> {
        let mut tokens = HashMap::new();
        for (position, entry) in table.split(',').map(str::trim).enumerate() {
            if entry.is_empty() {
                continue;
            }
            let Some((raw_token, user)) = entry.split_once('=') else {
                return Err(TokenMapError::Malformed { position });
            };
            let token = raw_token.trim();
            if token.is_empty() {
                return Err(TokenMapError::Malformed { position });
            }
            let user_id = UserId::new(user.trim())
                .map_err(|source| TokenMapError::InvalidUser { position, source })?;
            if tokens.insert(token.to_owned(), user_id).is_some() {
                return Err(TokenMapError::Duplicate { position });
            }
        }
        Ok(Self { tokens })
    }

    /// Number of configured tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Whether no tokens are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[async_trait]
impl Authenticator for StaticTokenAuthenticator {
    async fn authenticate(&self, token: &str) -> Result<Option<UserId>, AuthenticatorError> {
        let user = self.tokens.get(token).copied();
        if user.is_none() {
            debug!("bearer token not recognised");
        }
        Ok(user)
    }
}
