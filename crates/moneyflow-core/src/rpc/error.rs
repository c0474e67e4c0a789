use std::fmt;

use serde::Deserialize;
use thiserror::Error;

/// Connect status codes, named as they appear on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Code {
    Canceled,
    Unknown,
    InvalidArgument,
    DeadlineExceeded,
    NotFound,
    AlreadyExists,
    PermissionDenied,
    ResourceExhausted,
    FailedPrecondition,
    Aborted,
    OutOfRange,
    Unimplemented,
    Internal,
    Unavailable,
    DataLoss,
    Unauthenticated,
}

impl Code {
    pub fn as_str(&self) -> &'static str {
        match self {
            Code::Canceled => "canceled",
            Code::Unknown => "unknown",
            Code::InvalidArgument => "invalid_argument",
            Code::DeadlineExceeded => "deadline_exceeded",
            Code::NotFound => "not_found",
            Code::AlreadyExists => "already_exists",
            Code::PermissionDenied => "permission_denied",
            Code::ResourceExhausted => "resource_exhausted",
            Code::FailedPrecondition => "failed_precondition",
            Code::Aborted => "aborted",
            Code::OutOfRange => "out_of_range",
            Code::Unimplemented => "unimplemented",
            Code::Internal => "internal",
            Code::Unavailable => "unavailable",
            Code::DataLoss => "data_loss",
            Code::Unauthenticated => "unauthenticated",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let code = match name {
            "canceled" => Code::Canceled,
            "unknown" => Code::Unknown,
            "invalid_argument" => Code::InvalidArgument,
            "deadline_exceeded" => Code::DeadlineExceeded,
            "not_found" => Code::NotFound,
            "already_exists" => Code::AlreadyExists,
            "permission_denied" => Code::PermissionDenied,
            "resource_exhausted" => Code::ResourceExhausted,
            "failed_precondition" => Code::FailedPrecondition,
            "aborted" => Code::Aborted,
            "out_of_range" => Code::OutOfRange,
            "unimplemented" => Code::Unimplemented,
            "internal" => Code::Internal,
            "unavailable" => Code::Unavailable,
            "data_loss" => Code::DataLoss,
            "unauthenticated" => Code::Unauthenticated,
            _ => return None,
        };
        Some(code)
    }

    /// Code implied by an HTTP status when the body carries none.
    pub fn from_http_status(status: u16) -> Self {
        match status {
            400 => Code::Internal,
            401 => Code::Unauthenticated,
            403 => Code::PermissionDenied,
            404 => Code::Unimplemented,
            429 | 502 | 503 | 504 => Code::Unavailable,
            _ => Code::Unknown,
        }
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum RpcError {
    #[error("{code}: {message}")]
    Status { code: Code, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid request metadata: {0}")]
    InvalidMetadata(String),

    #[error("Invalid request payload: {0}")]
    InvalidRequest(#[from] serde_json::Error),

    #[error("Unsupported response: {0}")]
    Unsupported(String),
}

pub type RpcResult<T> = std::result::Result<T, RpcError>;

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub code: Option<String>,
    pub message: Option<String>,
}

impl RpcError {
    pub fn status(code: Code, message: impl Into<String>) -> Self {
        RpcError::Status {
            code,
            message: message.into(),
        }
    }

    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
    }

    /// Build an error from a non-success HTTP response.
    ///
    /// Connect servers send `{"code": .., "message": ..}`; anything else is
    /// mapped from the HTTP status.
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
            if let Some(code) = parsed.code.as_deref().and_then(Code::from_name) {
                return RpcError::status(code, parsed.message.unwrap_or_default());
            }
        }
        let code = Code::from_http_status(status.as_u16());
        RpcError::status(code, format!("HTTP {}: {}", status, Self::truncate_body(body)))
    }

    pub(crate) fn from_error_body(body: ErrorBody) -> Self {
        let code = body
            .code
            .as_deref()
            .and_then(Code::from_name)
            .unwrap_or(Code::Unknown);
        RpcError::status(code, body.message.unwrap_or_default())
    }

    pub fn code(&self) -> Code {
        match self {
            RpcError::Status { code, .. } => *code,
            RpcError::Network(e) if e.is_timeout() => Code::DeadlineExceeded,
            RpcError::Network(_) => Code::Unavailable,
            RpcError::InvalidResponse(_) | RpcError::Unsupported(_) => Code::Internal,
            RpcError::InvalidMetadata(_) | RpcError::InvalidRequest(_) => Code::InvalidArgument,
        }
    }

    pub fn is_unauthenticated(&self) -> bool {
        self.code() == Code::Unauthenticated
    }
}
