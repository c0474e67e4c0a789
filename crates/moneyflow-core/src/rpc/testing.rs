//! In-process transport double for pipeline and client tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::{Code, RpcError, RpcMethod, RpcRequest, RpcResult, Transport};

pub(crate) struct FakeTransport {
    default_response: Value,
    responses: Mutex<HashMap<RpcMethod, Value>>,
    failures: Mutex<VecDeque<Code>>,
    failing_calls: Mutex<HashMap<usize, Code>>,
    delay: Duration,
    calls: AtomicUsize,
    requests: Mutex<Vec<RpcRequest>>,
}

impl FakeTransport {
    pub(crate) fn new(default_response: Value) -> Self {
        Self {
            default_response,
            responses: Mutex::new(HashMap::new()),
            failures: Mutex::new(VecDeque::new()),
            failing_calls: Mutex::new(HashMap::new()),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Simulated network latency per call.
    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn respond(&self, method: RpcMethod, response: Value) {
        self.responses.lock().unwrap().insert(method, response);
    }

    /// The next call fails with `code`; queued failures are consumed in order.
    pub(crate) fn fail_next(&self, code: Code) {
        self.failures.lock().unwrap().push_back(code);
    }

    /// The `n`th call overall (1-based) fails with `code`.
    pub(crate) fn fail_call(&self, n: usize, code: Code) {
        self.failing_calls.lock().unwrap().insert(n, code);
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn calls_to(&self, method: RpcMethod) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.method == method)
            .count()
    }

    pub(crate) fn last_request(&self) -> Option<RpcRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn call(&self, request: RpcRequest) -> RpcResult<Value> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let method = request.method;
        self.requests.lock().unwrap().push(request);
        let failure = self
            .failing_calls
            .lock()
            .unwrap()
            .remove(&n)
            .or_else(|| self.failures.lock().unwrap().pop_front());

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        if let Some(code) = failure {
            return Err(RpcError::status(code, format!("call {} failed", n)));
        }
        let response = self.responses.lock().unwrap().get(&method).cloned();
        Ok(response.unwrap_or_else(|| self.default_response.clone()))
    }
}
