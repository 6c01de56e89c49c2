//! Remote gateway port - abstracts the backend HTTP API
//!
//! The gateway is stateless apart from static configuration and is shared by
//! every concurrent caller. It never retries; retry policy belongs to callers.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One backend call: method, path under the base URL, optional JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayRequest {
    pub method: HttpMethod,
    pub path: String,
    pub body: Option<Value>,
}

impl GatewayRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            path: path.into(),
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: HttpMethod::Post,
            path: path.into(),
            body: Some(body),
        }
    }

    pub fn put(path: impl Into<String>, body: Option<Value>) -> Self {
        Self {
            method: HttpMethod::Put,
            path: path.into(),
            body,
        }
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Delete,
            path: path.into(),
            body: None,
        }
    }
}

/// Typed failure of a gateway call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// The backend answered with status >= 400.
    #[error("backend returned {status}: {message}")]
    Status { status: u16, message: String },

    /// The request never produced a response (connect error, timeout, ...).
    #[error("transport failure: {0}")]
    Transport(String),

    /// The response body could not be decoded into the expected shape.
    #[error("invalid response payload: {0}")]
    Decode(String),
}

impl GatewayError {
    pub fn status(&self) -> Option<u16> {
        match self {
            GatewayError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// The backend reports the resource already exists.
    ///
    /// Some handlers answer 409, others 400 with an "already exists" message.
    pub fn is_already_exists(&self) -> bool {
        match self {
            GatewayError::Status { status, message } => {
                *status == 409 || message.to_ascii_lowercase().contains("already exist")
            }
            _ => false,
        }
    }
}

/// Remote gateway port
///
/// Implementations attach authentication, perform the HTTP exchange and map
/// every status >= 400 to [`GatewayError::Status`]. A successful response with
/// an empty body is returned as `Value::Null`.
#[async_trait]
pub trait GatewayPort: Send + Sync {
    async fn call(&self, request: GatewayRequest) -> Result<Value, GatewayError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn already_exists_detected_from_status_or_message() {
        let conflict = GatewayError::Status {
            status: 409,
            message: "conflict".into(),
        };
        let bad_request = GatewayError::Status {
            status: 400,
            message: "Contest rules already exist for this project".into(),
        };
        let other = GatewayError::Status {
            status: 400,
            message: "missing field".into(),
        };
        assert!(conflict.is_already_exists());
        assert!(bad_request.is_already_exists());
        assert!(!other.is_already_exists());
        assert!(!GatewayError::Transport("reset".into()).is_already_exists());
    }

    #[test]
    fn not_found_only_for_404() {
        let nf = GatewayError::Status {
            status: 404,
            message: "Not Found".into(),
        };
        assert!(nf.is_not_found());
        assert!(!GatewayError::Decode("x".into()).is_not_found());
    }
}
