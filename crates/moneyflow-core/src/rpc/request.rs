use std::collections::BTreeMap;

use serde_json::Value;

use super::RpcMethod;

/// Outgoing call descriptor as seen by interceptors and the transport.
#[derive(Debug, Clone)]
pub struct RpcRequest {
    pub endpoint: String,
    pub method: RpcMethod,
    pub payload: Value,
    pub streaming: bool,
    /// Request headers, lower-case names
    pub metadata: BTreeMap<String, String>,
}

impl RpcRequest {
    pub fn new(endpoint: impl Into<String>, method: RpcMethod, payload: Value) -> Self {
        Self {
            endpoint: endpoint.into(),
            method,
            payload,
            streaming: method.is_streaming(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn url(&self) -> String {
        format!("{}/{}", self.endpoint.trim_end_matches('/'), self.method.path())
    }

    /// Deterministic key over endpoint, method and payload.
    ///
    /// Metadata is deliberately not part of the key.
    pub fn cache_key(&self) -> String {
        let mut key = self.url();
        key.push('|');
        write_canonical(&self.payload, &mut key);
        key
    }
}

/// Serialize JSON with object keys sorted, independent of map ordering.
fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut pairs: Vec<_> = map.iter().collect();
            pairs.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (k, v)) in pairs.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                // Escaping a string key cannot fail
                out.push_str(&Value::String(k.clone()).to_string());
                out.push(':');
                write_canonical(v, out);
            }
            out.push('}');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}
