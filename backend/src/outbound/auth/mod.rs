//! Authenticator adapters.

mod static_token_authenticator;

pub use static_token_authenticator::{StaticTokenAuthenticator, TokenMapError};
