use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::{RpcRequest, RpcResult};

/// Performs the actual network call at the end of the pipeline.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn call(&self, request: RpcRequest) -> RpcResult<Value>;
}

/// Wraps every outgoing call; must invoke `next` to continue the chain.
#[async_trait]
pub trait Interceptor: Send + Sync {
    async fn intercept(&self, request: RpcRequest, next: Next<'_>) -> RpcResult<Value>;
}

/// The remainder of the pipeline after the current interceptor.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    interceptors: &'a [Arc<dyn Interceptor>],
    transport: &'a dyn Transport,
}

impl<'a> Next<'a> {
    pub async fn run(self, request: RpcRequest) -> RpcResult<Value> {
        match self.interceptors.split_first() {
            Some((head, rest)) => {
                let next = Next {
                    interceptors: rest,
                    transport: self.transport,
                };
                head.intercept(request, next).await
            }
            None => self.transport.call(request).await,
        }
    }
}

/// Ordered interceptor chain ending in a transport.
pub struct Pipeline {
    interceptors: Vec<Arc<dyn Interceptor>>,
    transport: Arc<dyn Transport>,
}

impl Pipeline {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            interceptors: Vec::new(),
            transport,
        }
    }

    /// Append an interceptor; earlier interceptors run first.
    #[must_use]
    pub fn with(mut self, interceptor: impl Interceptor + 'static) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    pub async fn call(&self, request: RpcRequest) -> RpcResult<Value> {
        let next = Next {
            interceptors: &self.interceptors,
            transport: self.transport.as_ref(),
        };
        next.run(request).await
    }
}
