//! Connect-over-HTTP transport.
//!
//! Unary calls POST a JSON body and read a JSON body back. Server-streaming
//! calls use the `application/connect+json` envelope framing; the collected
//! messages are returned as a JSON array.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::error::ErrorBody;
use super::{RpcError, RpcRequest, RpcResult, Transport};

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

const CONNECT_PROTOCOL_VERSION: &str = "1";
const UNARY_CONTENT_TYPE: &str = "application/json";
const STREAM_CONTENT_TYPE: &str = "application/connect+json";

/// Envelope flag bits
const FLAG_COMPRESSED: u8 = 0b01;
const FLAG_END_STREAM: u8 = 0b10;

/// Envelope header: one flag byte plus a big-endian u32 length.
const ENVELOPE_HEADER_LEN: usize = 5;

/// Transport backed by a shared reqwest client.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

#[derive(Debug, Deserialize)]
struct EndStream {
    error: Option<ErrorBody>,
}

#[derive(Debug, PartialEq)]
pub(crate) struct Frame<'a> {
    pub end_stream: bool,
    pub payload: &'a [u8],
}

impl HttpTransport {
    pub fn new() -> RpcResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self { client })
    }

    fn headers(request: &RpcRequest, content_type: &'static str) -> RpcResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
        headers.insert(
            HeaderName::from_static("connect-protocol-version"),
            HeaderValue::from_static(CONNECT_PROTOCOL_VERSION),
        );
        for (name, value) in &request.metadata {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| RpcError::InvalidMetadata(format!("{}: {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| RpcError::InvalidMetadata(format!("{}: {}", name, e)))?;
            headers.insert(name, value);
        }
        Ok(headers)
    }

    /// POST with exponential backoff on HTTP 429.
    async fn post(
        &self,
        request: &RpcRequest,
        content_type: &'static str,
        body: Vec<u8>,
    ) -> RpcResult<reqwest::Response> {
        let url = request.url();
        let headers = Self::headers(request, content_type)?;
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            let response = self
                .client
                .post(&url)
                .headers(headers.clone())
                .body(body.clone())
                .send()
                .await?;

            let status = response.status();
            if status.is_success() {
                return Ok(response);
            }
            if status == StatusCode::TOO_MANY_REQUESTS && retries < MAX_RATE_LIMIT_RETRIES {
                retries += 1;
                warn!(url = %url, retry = retries, backoff_ms = backoff_ms, "Rate limited, backing off");
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                backoff_ms *= 2;
                continue;
            }
            let body = response.text().await.unwrap_or_default();
            return Err(RpcError::from_status(status, &body));
        }
    }

    async fn call_unary(&self, request: &RpcRequest) -> RpcResult<Value> {
        let body = serde_json::to_vec(&request.payload)?;
        let response = self.post(request, UNARY_CONTENT_TYPE, body).await?;
        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Ok(Value::Object(Default::default()));
        }
        serde_json::from_slice(&bytes).map_err(|e| {
            RpcError::InvalidResponse(format!("{}: {}", request.method, e))
        })
    }

    async fn call_streaming(&self, request: &RpcRequest) -> RpcResult<Value> {
        let payload = serde_json::to_vec(&request.payload)?;
        let response = self
            .post(request, STREAM_CONTENT_TYPE, encode_envelope(0, &payload))
            .await?;
        let bytes = response.bytes().await?;

        let mut messages = Vec::new();
        for frame in decode_envelopes(&bytes)? {
            if frame.end_stream {
                let end: EndStream = serde_json::from_slice(frame.payload)
                    .map_err(|e| RpcError::InvalidResponse(format!("end of stream: {}", e)))?;
                if let Some(error) = end.error {
                    return Err(RpcError::from_error_body(error));
                }
                debug!(method = %request.method, messages = messages.len(), "Stream finished");
                return Ok(Value::Array(messages));
            }
            let message = serde_json::from_slice(frame.payload)
                .map_err(|e| RpcError::InvalidResponse(format!("{}: {}", request.method, e)))?;
            messages.push(message);
        }
        Err(RpcError::InvalidResponse(format!(
            "{}: stream ended without end-of-stream frame",
            request.method
        )))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn call(&self, request: RpcRequest) -> RpcResult<Value> {
        debug!(method = %request.method, streaming = request.streaming, "Sending request");
        if request.streaming {
            self.call_streaming(&request).await
        } else {
            self.call_unary(&request).await
        }
    }
}

pub(crate) fn encode_envelope(flags: u8, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(ENVELOPE_HEADER_LEN + payload.len());
    out.push(flags);
    out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    out.extend_from_slice(payload);
    out
}

pub(crate) fn decode_envelopes(mut bytes: &[u8]) -> RpcResult<Vec<Frame<'_>>> {
    let mut frames = Vec::new();
    while !bytes.is_empty() {
        if bytes.len() < ENVELOPE_HEADER_LEN {
            return Err(RpcError::InvalidResponse("truncated envelope header".to_string()));
        }
        let flags = bytes[0];
        let len = u32::from_be_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]) as usize;
        if flags & FLAG_COMPRESSED != 0 {
            return Err(RpcError::Unsupported("compressed stream message".to_string()));
        }
        let rest = &bytes[ENVELOPE_HEADER_LEN..];
        if rest.len() < len {
            return Err(RpcError::InvalidResponse(format!(
                "envelope declares {} bytes, {} available",
                len,
                rest.len()
            )));
        }
        frames.push(Frame {
            end_stream: flags & FLAG_END_STREAM != 0,
            payload: &rest[..len],
        });
        bytes = &rest[len..];
    }
    Ok(frames)
}
