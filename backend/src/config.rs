//! Application settings loaded via OrthoConfig.
//!
//! Values come from `SPENDSYNC_*` environment variables, command-line flags,
//! or a configuration file, in OrthoConfig's usual precedence.

use std::net::SocketAddr;

use ortho_config::OrthoConfig;
use serde::Deserialize;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;

/// Errors raised while interpreting loaded settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// `bind_addr` is not a `host:port` socket address.
    #[error("invalid bind address {value:?}: {source}")]
    BindAddr {
        value: String,
        #[source]
        source: std::net::AddrParseError,
    },
}

/// Runtime settings for the sync server.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "SPENDSYNC")]
pub struct AppSettings {
    /// Socket address to listen on.
    pub bind_addr: Option<String>,
    /// PostgreSQL connection string; the in-memory store is used when absent.
    pub database_url: Option<String>,
    /// Upper bound on pooled database connections.
    pub db_max_connections: Option<u32>,
    /// Bearer tokens as comma-separated `token=user-uuid` pairs.
    pub auth_tokens: Option<String>,
}

impl AppSettings {
    /// Parsed listen address, falling back to `0.0.0.0:8080`.
    pub fn bind_addr(&self) -> Result<SocketAddr, SettingsError> {
        let raw = self.bind_addr.as_deref().unwrap_or(DEFAULT_BIND_ADDR);
        raw.trim().parse().map_err(|source| SettingsError::BindAddr {
            value: raw.to_owned(),
            source,
        })
    }

    /// Database URL, treating a blank value as unset.
    #[must_use]
    pub fn database_url(&self) -> Option<&str> {
        self.database_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    #[must_use]
    pub fn db_max_connections(&self) -> u32 {
        self.db_max_connections
            .filter(|size| *size > 0)
            .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS)
    }

    /// Raw token table; empty when unset.
    #[must_use]
    pub fn auth_tokens(&self) -> &str {
        self.auth_tokens.as_deref().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for settings parsing.

    use super::*;
    use std::ffi::OsString;

    use env_lock::lock_env;
    use rstest::rstest;

    const VARS: [&str; 4] = [
        "SPENDSYNC_BIND_ADDR",
        "SPENDSYNC_DATABASE_URL",
        "SPENDSYNC_DB_MAX_CONNECTIONS",
        "SPENDSYNC_AUTH_TOKENS",
    ];

    fn load_from_empty_args() -> AppSettings {
        AppSettings::load_from_iter([OsString::from("spendsync")]).expect("config should load")
    }

    #[rstest]
    fn defaults_apply_when_nothing_is_set() {
        let _guard = lock_env(VARS.map(|name| (name, None::<String>)));

        let settings = load_from_empty_args();

        assert_eq!(
            settings.bind_addr().expect("default address"),
            SocketAddr::from(([0, 0, 0, 0], 8080))
        );
        assert_eq!(settings.database_url(), None);
        assert_eq!(settings.db_max_connections(), DEFAULT_DB_MAX_CONNECTIONS);
        assert_eq!(settings.auth_tokens(), "");
    }

    #[rstest]
    fn environment_overrides_are_respected() {
        let _guard = lock_env([
            ("SPENDSYNC_BIND_ADDR", Some("127.0.0.1:9000".to_owned())),
            (
                "SPENDSYNC_DATABASE_URL",
                Some("postgres://sync@localhost/spendsync".to_owned()),
            ),
            ("SPENDSYNC_DB_MAX_CONNECTIONS", Some("4".to_owned())),
            (
                "SPENDSYNC_AUTH_TOKENS",
                Some("abc=3fa85f64-5717-4562-b3fc-2c963f66afa6".to_owned()),
            ),
        ]);

        let settings = load_from_empty_args();

        assert_eq!(
            settings.bind_addr().expect("address"),
            SocketAddr::from(([127, 0, 0, 1], 9000))
        );
        assert_eq!(
            settings.database_url(),
            Some("postgres://sync@localhost/spendsync")
        );
        assert_eq!(settings.db_max_connections(), 4);
        assert_eq!(
            settings.auth_tokens(),
            "abc=3fa85f64-5717-4562-b3fc-2c963f66afa6"
        );
    }

    #[rstest]
    #[case(Some("   "), None)]
    #[case(Some("postgres://db"), Some("postgres://db"))]
    fn blank_database_url_counts_as_unset(
        #[case] raw: Option<&str>,
        #[case] expected: Option<&str>,
    ) {
        let settings = AppSettings {
            bind_addr: None,
            database_url: raw.map(str::to_owned),
            db_max_connections: Some(0),
            auth_tokens: None,
        };

        assert_eq!(settings.database_url(), expected);
        assert_eq!(settings.db_max_connections(), DEFAULT_DB_MAX_CONNECTIONS);
    }

    #[rstest]
    fn malformed_bind_address_is_reported() {
        let settings = AppSettings {
            bind_addr: Some("not-an-address".to_owned()),
            database_url: None,
            db_max_connections: None,
            auth_tokens: None,
        };

        let error = settings.bind_addr().expect_err("invalid address");

        assert!(error.to_string().contains("not-an-address"));
    }
}
