//! HTTP transport for vCenter REST calls
//!
//! Every call resolves to a [`Response`]: server rejections keep their status
//! and body, and calls that never got a response come back with status 0.

use super::error::VsphereError;
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::{Certificate, Client, Method};
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Per-request timeout unless configured otherwise
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Sanitize response body for logging
/// Truncates long responses and strips control characters
pub fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let mut end = MAX_LOG_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... [truncated, {} bytes total]", &body[..end], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| c.is_control(), "")
}

/// Response body, decoded as JSON when the server says it is JSON
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedBody {
    Json(Value),
    Text(String),
}

impl ParsedBody {
    fn parse(content_type: &str, raw: &[u8]) -> Self {
        if content_type.contains("application/json") {
            if let Ok(value) = serde_json::from_slice(raw) {
                return Self::Json(value);
            }
        }
        Self::Text(String::from_utf8_lossy(raw).into_owned())
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Text(_) => None,
        }
    }

    /// Convert into a JSON value; text bodies become a JSON string
    pub fn into_value(self) -> Value {
        match self {
            Self::Json(value) => value,
            Self::Text(text) => Value::String(text),
        }
    }

    /// Short, log-safe rendering of the body
    pub fn excerpt(&self) -> String {
        sanitize_for_log(&self.to_string())
    }
}

impl fmt::Display for ParsedBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(value) => write!(f, "{value}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}

/// Uniform result of a single HTTP call
#[derive(Debug, Clone)]
pub struct Response {
    /// HTTP status, or 0 when no response was received
    pub status: u16,
    pub body: ParsedBody,
    pub headers: HeaderMap,
}

impl Response {
    fn transport_failure(reason: String) -> Self {
        Self {
            status: 0,
            body: ParsedBody::Text(reason),
            headers: HeaderMap::new(),
        }
    }

    pub fn is_transport_failure(&self) -> bool {
        self.status == 0
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// First value of a header (name lookup is case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// All values of a repeated header such as `set-cookie`
    pub fn header_values<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
    }
}

/// Transport settings
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub timeout: Duration,
    /// Skip certificate verification (lab vCenters with self-signed certs)
    pub accept_invalid_certs: bool,
    /// PEM trust anchor; when set, certificates are always verified
    pub ca_cert: Option<PathBuf>,
    /// Accept `http://` URLs; only test harnesses need this
    pub allow_plain_http: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_REQUEST_TIMEOUT,
            accept_invalid_certs: true,
            ca_cert: None,
            allow_plain_http: false,
        }
    }
}

/// HTTP client wrapper for vCenter API calls
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    allow_plain_http: bool,
}

impl HttpTransport {
    /// Create a new HTTP transport
    pub fn new(config: &TransportConfig) -> Result<Self, VsphereError> {
        let mut builder = Client::builder()
            .user_agent(concat!("vcmac/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout);

        if let Some(path) = &config.ca_cert {
            let pem = std::fs::read(path).map_err(|e| {
                VsphereError::ClientBuild(format!("reading CA certificate {}: {}", path.display(), e))
            })?;
            let cert = Certificate::from_pem(&pem)
                .map_err(|e| VsphereError::ClientBuild(format!("parsing CA certificate: {}", e)))?;
            builder = builder.add_root_certificate(cert);
        } else if config.accept_invalid_certs {
            tracing::debug!("TLS certificate verification disabled");
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder
            .build()
            .map_err(|e| VsphereError::ClientBuild(e.to_string()))?;

        Ok(Self {
            client,
            allow_plain_http: config.allow_plain_http,
        })
    }

    /// Perform one HTTP call
    ///
    /// Only malformed requests (bad URL, unsupported method) are errors. Non-2xx
    /// answers and network failures are both returned as a [`Response`].
    pub async fn send(
        &self,
        method: Method,
        url: &str,
        headers: &HeaderMap,
        body: Option<&Value>,
    ) -> Result<Response, VsphereError> {
        if method != Method::GET && method != Method::POST {
            return Err(VsphereError::UnsupportedMethod(method.to_string()));
        }
        let url = self.validate_url(url)?;

        tracing::debug!("{} {}", method, url);

        let mut request = self.client.request(method, url).headers(headers.clone());
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => {
                let reason = describe_failure(&err);
                tracing::warn!("Transport failure: {}", reason);
                return Ok(Response::transport_failure(reason));
            }
        };

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();

        let raw = match response.bytes().await {
            Ok(raw) => raw,
            Err(err) => {
                let reason = describe_failure(&err);
                tracing::warn!("Failed to read response body: {}", reason);
                return Ok(Response::transport_failure(reason));
            }
        };

        let body = ParsedBody::parse(&content_type, &raw);
        if !(200..300).contains(&status) {
            tracing::debug!("API error: {} - {}", status, body.excerpt());
        }

        Ok(Response {
            status,
            body,
            headers,
        })
    }

    fn validate_url(&self, raw: &str) -> Result<Url, VsphereError> {
        let url = Url::parse(raw).map_err(|e| VsphereError::InvalidUrl(format!("{}: {}", raw, e)))?;
        match url.scheme() {
            "https" => Ok(url),
            "http" if self.allow_plain_http => Ok(url),
            scheme => Err(VsphereError::InvalidUrl(format!(
                "{}: scheme '{}' not allowed",
                raw, scheme
            ))),
        }
    }
}

/// Flatten a reqwest error and its sources into one line
fn describe_failure(err: &reqwest::Error) -> String {
    let kind = if err.is_timeout() {
        "timed out"
    } else if err.is_connect() {
        "connection failed"
    } else {
        "request failed"
    };

    let mut reason = format!("{}: {}", kind, err);
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        reason.push_str(": ");
        reason.push_str(&cause.to_string());
        source = cause.source();
    }
    reason
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sanitize_truncates_long_bodies() {
        let body = "x".repeat(500);
        let sanitized = sanitize_for_log(&body);
        assert!(sanitized.starts_with(&"x".repeat(200)));
        assert!(sanitized.contains("[truncated, 500 bytes total]"));
    }

    #[test]
    fn test_sanitize_respects_char_boundaries() {
        let body = "é".repeat(150);
        let sanitized = sanitize_for_log(&body);
        assert!(sanitized.contains("[truncated, 300 bytes total]"));
    }

    #[test]
    fn test_sanitize_strips_control_characters() {
        assert_eq!(sanitize_for_log("line1\nline2\r\t"), "line1line2");
    }

    #[test]
    fn test_parse_json_body() {
        let body = ParsedBody::parse("application/json; charset=utf-8", br#"{"value":"abc"}"#);
        assert_eq!(body, ParsedBody::Json(json!({"value": "abc"})));
    }

    #[test]
    fn test_parse_falls_back_to_text() {
        let body = ParsedBody::parse("text/html", b"<html>nope</html>");
        assert_eq!(body, ParsedBody::Text("<html>nope</html>".to_string()));

        let broken = ParsedBody::parse("application/json", b"{not json");
        assert_eq!(broken, ParsedBody::Text("{not json".to_string()));
    }

    #[test]
    fn test_into_value() {
        assert_eq!(ParsedBody::Text("hi".into()).into_value(), json!("hi"));
        assert_eq!(ParsedBody::Json(json!([1])).into_value(), json!([1]));
    }

    #[tokio::test]
    async fn test_rejects_plain_http_by_default() {
        let transport = HttpTransport::new(&TransportConfig::default()).unwrap();
        let err = transport
            .send(Method::GET, "http://vcenter.local/rest/vcenter/vm", &HeaderMap::new(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, VsphereError::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn test_rejects_relative_url() {
        let transport = HttpTransport::new(&TransportConfig::default()).unwrap();
        let err = transport
            .send(Method::GET, "/rest/vcenter/vm", &HeaderMap::new(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, VsphereError::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn test_rejects_unsupported_method() {
        let transport = HttpTransport::new(&TransportConfig::default()).unwrap();
        let err = transport
            .send(Method::DELETE, "https://vcenter.local/api/session", &HeaderMap::new(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, VsphereError::UnsupportedMethod(_)));
    }
}
