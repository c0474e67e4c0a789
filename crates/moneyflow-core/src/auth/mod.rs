//! Authentication state for the RPC client.
//!
//! `Session` keeps the bearer token persisted to disk and publishes an
//! observable `AuthState`. The token is attached to outgoing calls by
//! `interceptors::AuthInterceptor`.

pub mod session;

pub use session::{AuthState, Session, SessionData};
