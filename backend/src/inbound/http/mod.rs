//! HTTP inbound adapter exposing the sync REST endpoints.

pub mod auth;
pub mod error;
pub mod health;
pub mod snapshots;
pub mod state;
pub mod sync;
pub mod validation;

pub use error::ApiResult;
