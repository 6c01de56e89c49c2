//! `reqwest` implementation of the gateway port.
//!
//! 后端 HTTP 网关适配器

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};

use sc_core::ports::{GatewayError, GatewayPort, GatewayRequest, HttpMethod};
use sc_core::ConsoleConfig;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Backend gateway over HTTP.
///
/// Holds only static configuration; a single instance is shared by every
/// concurrent caller. Calls are never retried here.
pub struct HttpGateway {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpGateway {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Transport(format!("http client init failed: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        })
    }

    pub fn from_config(config: &ConsoleConfig) -> Result<Self, GatewayError> {
        Self::new(
            config.api_base_url.clone(),
            config.api_key.clone(),
            config.http_timeout,
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

fn method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Delete => Method::DELETE,
    }
}

#[async_trait]
impl GatewayPort for HttpGateway {
    async fn call(&self, request: GatewayRequest) -> Result<Value, GatewayError> {
        let url = self.url(&request.path);
        debug!(method = %request.method, %url, "gateway request");

        let mut builder = self.client.request(method(request.method), &url);
        if let Some(key) = &self.api_key {
            builder = builder.header(API_KEY_HEADER, key);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            warn!(method = %request.method, %url, error = %e, "gateway transport failure");
            GatewayError::Transport(e.to_string())
        })?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        if status.as_u16() >= 400 {
            let message = error_message(status, &text);
            debug!(status = status.as_u16(), %message, "gateway error response");
            return Err(GatewayError::Status {
                status: status.as_u16(),
                message,
            });
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| GatewayError::Decode(e.to_string()))
    }
}

/// Best human-readable message for an error response.
///
/// Prefers the `message`, `error` or `detail` field of a JSON body, then the
/// raw body, then the canonical status reason.
pub(crate) fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
        for field in ["message", "error", "detail"] {
            if let Some(Value::String(message)) = map.get(field) {
                if !message.trim().is_empty() {
                    return message.clone();
                }
            }
        }
    }
    let trimmed = body.trim();
    if !trimmed.is_empty() {
        return trimmed.to_string();
    }
    status
        .canonical_reason()
        .unwrap_or("request failed")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn gateway(server: &mockito::ServerGuard, key: Option<&str>) -> HttpGateway {
        HttpGateway::new(server.url(), key.map(str::to_string), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn sends_api_key_and_decodes_json() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/health")
            .match_header("x-api-key", "secret")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"status":"ok"}"#)
            .create_async()
            .await;

        let value = gateway(&server, Some("secret"))
            .call(GatewayRequest::get("/health"))
            .await
            .unwrap();

        assert_eq!(value, json!({"status": "ok"}));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn omits_api_key_when_not_configured() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/buckets/list")
            .match_header("x-api-key", mockito::Matcher::Missing)
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        gateway(&server, None)
            .call(GatewayRequest::get("/buckets/list"))
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn posts_json_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/winners/select")
            .match_body(mockito::Matcher::Json(json!({
                "bucket_name": "acme",
                "project_name": "0007",
                "number_of_winners": 3
            })))
            .with_status(201)
            .with_body("")
            .create_async()
            .await;

        let value = gateway(&server, None)
            .call(GatewayRequest::post(
                "/winners/select",
                json!({"bucket_name": "acme", "project_name": "0007", "number_of_winners": 3}),
            ))
            .await
            .unwrap();

        assert_eq!(value, Value::Null);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn error_status_uses_json_message_field() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/contest-rules/acme/0007")
            .with_status(409)
            .with_body(r#"{"error":"Contest rules already exist"}"#)
            .create_async()
            .await;

        let err = gateway(&server, None)
            .call(GatewayRequest::post("/contest-rules/acme/0007", json!({})))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            GatewayError::Status {
                status: 409,
                message: "Contest rules already exist".into()
            }
        );
        assert!(err.is_already_exists());
    }

    #[tokio::test]
    async fn error_status_without_body_uses_reason_phrase() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/data/status/acme/0007")
            .with_status(404)
            .create_async()
            .await;

        let err = gateway(&server, None)
            .call(GatewayRequest::get("/data/status/acme/0007"))
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(
            err,
            GatewayError::Status {
                status: 404,
                message: "Not Found".into()
            }
        );
    }

    #[tokio::test]
    async fn invalid_json_is_a_decode_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/health")
            .with_status(200)
            .with_body("<html>")
            .create_async()
            .await;

        let err = gateway(&server, None)
            .call(GatewayRequest::get("/health"))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Decode(_)));
    }

    #[tokio::test]
    async fn unreachable_backend_is_a_transport_error() {
        let gateway =
            HttpGateway::new("http://127.0.0.1:9", None, Duration::from_secs(2)).unwrap();
        let err = gateway
            .call(GatewayRequest::get("/health"))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Transport(_)));
    }

    #[test]
    fn trailing_slash_in_base_url_is_ignored() {
        let gateway =
            HttpGateway::new("http://api.local/", None, Duration::from_secs(1)).unwrap();
        assert_eq!(gateway.url("/health"), "http://api.local/health");
        assert_eq!(gateway.url("health"), "http://api.local/health");
    }

    #[test]
    fn plain_text_error_body_is_kept() {
        assert_eq!(
            error_message(StatusCode::BAD_GATEWAY, "upstream down\n"),
            "upstream down"
        );
    }
}
