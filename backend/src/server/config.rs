//! HTTP server configuration object and helpers.

use std::net::SocketAddr;
use std::sync::Arc;

use spendsync::domain::ports::Authenticator;
use spendsync::outbound::persistence::DbPool;

/// Builder-style configuration for creating the HTTP server.
pub struct ServerConfig {
    pub(crate) bind_addr: SocketAddr,
    pub(crate) authenticator: Arc<dyn Authenticator>,
    pub(crate) db_pool: Option<DbPool>,
}

impl ServerConfig {
    /// Construct a server configuration listening on `bind_addr`.
    #[must_use]
    pub fn new(bind_addr: SocketAddr, authenticator: Arc<dyn Authenticator>) -> Self {
        Self {
            bind_addr,
            authenticator,
            db_pool: None,
        }
    }

    /// Attach a database connection pool.
    ///
    /// Without one the server keeps expenses in process memory.
    #[must_use]
    pub fn with_db_pool(mut self, pool: DbPool) -> Self {
        self.db_pool = Some(pool);
        self
    }
}
