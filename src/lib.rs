//! Request-authentication gate for axum services.
//!
//! Reads an opaque token from `X-Auth-Token`, authorizes it with a cache-aside
//! protocol (cache first, identity authority on miss, cache on success) and
//! either hands the `Token` to downstream handlers or answers 401.
//!
//! ```ignore
//! let gate = Arc::new(TokenGate::new(validator, cache, GatePolicy::default()));
//! let protected = middleware::auth::keystone::apply(protected, gate);
//! ```
pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod services;
pub mod state;
