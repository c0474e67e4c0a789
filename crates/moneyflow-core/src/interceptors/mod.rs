//! Interceptors installed in the client's RPC pipeline.
//!
//! - `AuthInterceptor`: bearer token and forced logout
//! - `CacheInterceptor`: response caching with per-key single-flight,
//!   built on the `KeyedLocks` guard registry

pub mod auth;
pub mod cache;
pub mod guard;

pub use auth::AuthInterceptor;
pub use cache::CacheInterceptor;
pub use guard::{KeyGuard, KeyedLocks};
