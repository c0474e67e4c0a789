use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::KeyedLocks;
use crate::cache::CacheRegistry;
use crate::rpc::{Interceptor, Next, RpcRequest, RpcResult};

/// Serves allow-listed read methods from the response cache and collapses
/// concurrent identical calls into a single backend request.
///
/// Non-cacheable and streaming calls pass straight through. Failed calls
/// are never cached, and the per-key guard is released on every exit path,
/// so callers that were waiting simply retry against the backend.
pub struct CacheInterceptor {
    caches: Arc<CacheRegistry>,
    locks: KeyedLocks,
}

impl CacheInterceptor {
    pub fn new(caches: Arc<CacheRegistry>) -> Self {
        Self {
            caches,
            locks: KeyedLocks::new(),
        }
    }

    /// Keys with a live guard (held or awaited).
    pub fn in_flight(&self) -> usize {
        self.locks.len()
    }
}

#[async_trait]
impl Interceptor for CacheInterceptor {
    async fn intercept(&self, request: RpcRequest, next: Next<'_>) -> RpcResult<Value> {
        let profile = match request.method.cache_profile() {
            Some(profile) if !request.streaming => profile,
            _ => return next.run(request).await,
        };
        let cache = self.caches.get(profile);
        let key = request.cache_key();

        if let Some(hit) = cache.get(&key) {
            debug!(method = %request.method, profile = %profile, "Cache hit");
            return Ok(hit);
        }

        let _guard = self.locks.acquire(&key).await;

        // Another caller may have filled the entry while we waited
        if let Some(hit) = cache.get(&key) {
            debug!(method = %request.method, profile = %profile, "Cache hit after wait");
            return Ok(hit);
        }

        debug!(method = %request.method, profile = %profile, "Cache miss");
        let method = request.method;
        let generation = cache.generation();
        let response = next.run(request).await?;

        if !cache.set_if_generation(key, response.clone(), generation) {
            debug!(method = %method, profile = %profile, "Cache cleared during call, response not stored");
        }
        Ok(response)
    }
}
