//! Expense sync backend library.
//!
//! Offline-first clients push batches of created, edited, and deleted
//! expenses and pull incremental or full exports. The crate is laid out
//! hexagonally: [`domain`] holds types, services, and ports; [`inbound`]
//! adapts HTTP requests; [`outbound`] implements the store and
//! authenticator ports.

pub mod config;
pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

/// Public OpenAPI surface used by Swagger UI and tooling.
pub use doc::ApiDoc;
pub use middleware::Trace;
