//! Client for the moneyflow backend services.
//!
//! This module provides the `ApiClient`, which wires the session, response
//! caches and interceptors into one RPC pipeline and exposes typed methods
//! for tags, categories, currencies, accounts, transactions, rules,
//! scheduled rules and service tokens.

pub mod client;

pub use client::ApiClient;
