//! In-memory response caching.
//!
//! This module provides the `TtlCache` container and the `CacheRegistry`
//! holding the two cache profiles used by the RPC pipeline:
//! - `default`: five minute lifetime for reference data
//! - `short-lived`: one second lifetime for interaction-scoped data
//!
//! Write operations invalidate a whole profile; there is no per-entity
//! invalidation.

pub mod registry;
pub mod ttl;

pub use registry::{CacheProfile, CacheRegistry};
pub use ttl::TtlCache;
