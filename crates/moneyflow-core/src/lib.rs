//! moneyflow-core: client library for the moneyflow personal finance backend.
//!
//! The RPC stack is a [`rpc::Pipeline`] of interceptors in front of a
//! Connect-over-HTTP transport. [`interceptors::CacheInterceptor`] serves
//! read-mostly lookups from bounded TTL caches and collapses concurrent
//! identical calls into one; [`interceptors::AuthInterceptor`] attaches the
//! session token. [`api::ApiClient`] wires these together and exposes typed
//! operations.

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod interceptors;
pub mod models;
pub mod rpc;
pub mod rules;
pub mod snippets;
pub mod utils;

pub use api::ApiClient;
pub use config::Config;
