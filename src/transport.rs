//! HTTP transport seam
//!
//! The session and license components talk to the service only through the
//! [`Transport`] trait. `ReqwestTransport` is the production implementation;
//! tests substitute a recording mock.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::time::Duration;

use crate::error::{KeyAuthError, KeyAuthResult, TransportError};
use crate::settings::ApiSettings;
use crate::utils::logging::mask_secret;

/// HTTP methods used by the KeyAuth protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// One request to the service, relative to the configured base URL
#[derive(Clone, PartialEq)]
pub struct ApiRequest {
    pub method: HttpMethod,
    pub path: &'static str,
    pub body: Option<Value>,
    /// Bearer token for the `Authorization` header
    pub bearer: Option<String>,
}

impl ApiRequest {
    #[must_use]
    pub fn post(path: &'static str, body: Value) -> Self {
        Self {
            method: HttpMethod::Post,
            path,
            body: Some(body),
            bearer: None,
        }
    }

    #[must_use]
    pub fn get(path: &'static str) -> Self {
        Self {
            method: HttpMethod::Get,
            path,
            body: None,
            bearer: None,
        }
    }

    #[must_use]
    pub fn with_bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }
}

// Bodies may hold passwords and tokens; only their shape is printed.
impl fmt::Debug for ApiRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let body_fields: Option<Vec<&String>> = self
            .body
            .as_ref()
            .and_then(Value::as_object)
            .map(|object| object.keys().collect());
        f.debug_struct("ApiRequest")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("body_fields", &body_fields)
            .field("bearer", &self.bearer.as_deref().map(mask_secret))
            .finish()
    }
}

/// Status and raw body of a received response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    #[must_use]
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    #[must_use]
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }

    #[must_use]
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status)
    }

    /// Decode a success body
    ///
    /// # Errors
    ///
    /// Returns `KeyAuthError::MalformedResponse` if the body does not match `T`.
    pub fn json<T: DeserializeOwned>(&self) -> KeyAuthResult<T> {
        serde_json::from_str(&self.body).map_err(|e| {
            KeyAuthError::MalformedResponse(format!("HTTP {} body did not decode: {e}", self.status))
        })
    }

    /// Human-readable error detail from a `{"detail": ...}` body
    ///
    /// `detail` may be a string or a list of validation objects carrying `msg`.
    /// Falls back to the trimmed raw body, or `None` if that is empty.
    #[must_use]
    pub fn detail(&self) -> Option<String> {
        let from_json = serde_json::from_str::<Value>(&self.body)
            .ok()
            .and_then(|value| value.get("detail").cloned())
            .and_then(|detail| match detail {
                Value::String(text) => Some(text),
                Value::Array(items) => {
                    let messages: Vec<String> = items
                        .iter()
                        .filter_map(|item| item.get("msg").and_then(Value::as_str))
                        .map(String::from)
                        .collect();
                    (!messages.is_empty()).then(|| messages.join("; "))
                }
                Value::Null => None,
                other => Some(other.to_string()),
            });

        from_json.or_else(|| {
            let raw = self.body.trim();
            (!raw.is_empty()).then(|| raw.to_string())
        })
    }

    /// Map a 5xx response to `KeyAuthError::Server`
    #[must_use]
    pub fn server_error(&self) -> KeyAuthError {
        KeyAuthError::Server {
            status: self.status,
            message: self
                .detail()
                .unwrap_or_else(|| "no error detail".to_string()),
        }
    }

    /// Error for a status outside the 2xx/4xx/5xx ranges the protocol defines
    #[must_use]
    pub fn unexpected_status(&self) -> KeyAuthError {
        KeyAuthError::MalformedResponse(format!("unexpected HTTP status {}", self.status))
    }
}

/// Request/response facility used to reach the KeyAuth service
///
/// Implementations must resolve every call: a request that produces no response
/// within the transport's timeout returns `TransportError::Timeout`.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one request and return whatever status the service answered with
    ///
    /// # Errors
    ///
    /// Returns a `TransportError` only when no response was received.
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError>;
}

/// `reqwest`-backed transport with a per-request timeout
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl ReqwestTransport {
    /// Build a transport from API settings
    ///
    /// # Errors
    ///
    /// Returns `KeyAuthError::Configuration` if the base URL is not an absolute
    /// http(s) URL or the HTTP client cannot be built.
    pub fn new(settings: &ApiSettings) -> KeyAuthResult<Self> {
        let parsed = url::Url::parse(&settings.base_url).map_err(|e| {
            KeyAuthError::Configuration(format!("invalid base_url {:?}: {e}", settings.base_url))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(KeyAuthError::Configuration(format!(
                "base_url must use http or https, got {}",
                parsed.scheme()
            )));
        }

        let timeout = settings.timeout();
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(settings.connect_timeout().min(timeout))
            .user_agent(settings.user_agent.clone())
            .build()
            .map_err(|e| KeyAuthError::Configuration(format!("HTTP client setup failed: {e}")))?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    /// Build the endpoint URL by appending the request path to the base URL
    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn classify(&self, err: &reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout(self.timeout)
        } else if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else {
            TransportError::Request(err.to_string())
        }
    }
}

impl fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReqwestTransport")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let url = self.endpoint(request.path);
        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(&url),
            HttpMethod::Post => self.client.post(&url),
        };
        builder = builder.header(reqwest::header::ACCEPT, "application/json");
        if let Some(token) = request.bearer.as_deref() {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = request.body.as_ref() {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| self.classify(&e))?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| self.classify(&e))?;

        Ok(ApiResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classes() {
        assert!(ApiResponse::new(200, "{}").is_success());
        assert!(ApiResponse::new(404, "").is_client_error());
        assert!(ApiResponse::new(503, "").is_server_error());
        assert!(!ApiResponse::new(302, "").is_success());
    }

    #[test]
    fn test_detail_string_and_list() {
        let plain = ApiResponse::new(404, r#"{"detail":"License key not found"}"#);
        assert_eq!(plain.detail().as_deref(), Some("License key not found"));

        let validation = ApiResponse::new(
            422,
            r#"{"detail":[{"loc":["query","license_key"],"msg":"field required","type":"value_error.missing"}]}"#,
        );
        assert_eq!(validation.detail().as_deref(), Some("field required"));

        let raw = ApiResponse::new(502, "Bad Gateway\n");
        assert_eq!(raw.detail().as_deref(), Some("Bad Gateway"));

        assert!(ApiResponse::new(500, "  ").detail().is_none());
    }

    #[test]
    fn test_json_decode_failure_is_malformed() {
        let response = ApiResponse::new(200, "<html>not json</html>");
        let err = response.json::<Value>().unwrap_err();
        assert!(matches!(err, KeyAuthError::MalformedResponse(_)));
    }

    #[test]
    fn test_server_error_mapping() {
        match ApiResponse::new(503, r#"{"detail":"maintenance"}"#).server_error() {
            KeyAuthError::Server { status, message } => {
                assert_eq!(status, 503);
                assert_eq!(message, "maintenance");
            }
            other => panic!("expected server error, got {other:?}"),
        }
    }

    #[test]
    fn test_request_debug_hides_secrets() {
        let request = ApiRequest::post(
            "/auth/login",
            serde_json::json!({"username": "alice", "password": "hunter2"}),
        )
        .with_bearer("secret-token-value");
        let debug = format!("{request:?}");
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("secret-token-value"));
        assert!(debug.contains("password"));
    }

    #[test]
    fn test_rejects_invalid_base_url() {
        let settings = ApiSettings {
            base_url: "not a url".to_string(),
            ..ApiSettings::default()
        };
        assert!(matches!(
            ReqwestTransport::new(&settings),
            Err(KeyAuthError::Configuration(_))
        ));

        let settings = ApiSettings {
            base_url: "ftp://licenses.example.com".to_string(),
            ..ApiSettings::default()
        };
        assert!(matches!(
            ReqwestTransport::new(&settings),
            Err(KeyAuthError::Configuration(_))
        ));
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let settings = ApiSettings {
            base_url: "https://licenses.example.com/api/".to_string(),
            ..ApiSettings::default()
        };
        let transport = ReqwestTransport::new(&settings).unwrap();
        assert_eq!(
            transport.endpoint("/license/validate"),
            "https://licenses.example.com/api/license/validate"
        );
    }
}
