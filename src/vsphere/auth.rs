//! vCenter Authentication
//!
//! Exchanges basic credentials for a session token. The legacy `/rest`
//! generation is tried first, then the current `/api` generation, which may
//! hand the token back in the body, a response header, or a cookie.

use super::error::{Attempt, VsphereError};
use super::http::{HttpTransport, ParsedBody, Response};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, SET_COOKIE};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Legacy generation session endpoint
pub const LEGACY_SESSION_PATH: &str = "/rest/com/vmware/cis/session";

/// Current generation session endpoint
pub const CURRENT_SESSION_PATH: &str = "/api/session";

/// Header (and cookie) name carrying the session token
pub const SESSION_HEADER: &str = "vmware-api-session-id";

/// vCenter API generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Generation {
    /// Path-versioned surface under `/rest`
    Legacy,
    /// Unversioned surface under `/api`
    Current,
}

impl Generation {
    pub fn path_prefix(&self) -> &'static str {
        match self {
            Self::Legacy => "/rest",
            Self::Current => "/api",
        }
    }

    /// Short label used in diagnostics
    pub fn label(&self) -> &'static str {
        match self {
            Self::Legacy => "REST",
            Self::Current => "API",
        }
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Legacy => f.write_str("legacy"),
            Self::Current => f.write_str("current"),
        }
    }
}

/// Strip scheme and path from a user-supplied host, leaving `host[:port]`
pub fn sanitize_host(raw: &str) -> String {
    let trimmed = raw.trim();
    let without_scheme = ["https://", "http://"]
        .iter()
        .find_map(|scheme| {
            trimmed
                .get(..scheme.len())
                .filter(|prefix| prefix.eq_ignore_ascii_case(scheme))
                .map(|_| &trimmed[scheme.len()..])
        })
        .unwrap_or(trimmed);

    without_scheme
        .split('/')
        .next()
        .unwrap_or_default()
        .to_string()
}

/// vCenter login credentials
///
/// SECURITY: never persisted; `Debug` redacts the secret.
#[derive(Clone)]
pub struct Credentials {
    host: String,
    username: String,
    secret: String,
}

impl Credentials {
    pub fn new(host: &str, username: &str, secret: &str) -> Self {
        Self {
            host: sanitize_host(host),
            username: username.trim().to_string(),
            secret: secret.to_string(),
        }
    }

    /// Bare hostname or IP (with optional port)
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// `https://<host>`
    pub fn base_url(&self) -> String {
        format!("https://{}", self.host)
    }

    fn basic_auth_header(&self) -> Result<HeaderValue, VsphereError> {
        let encoded = STANDARD.encode(format!("{}:{}", self.username, self.secret));
        let mut value = HeaderValue::from_str(&format!("Basic {}", encoded))
            .map_err(|_| VsphereError::InvalidHeader("authorization"))?;
        value.set_sensitive(true);
        Ok(value)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Authenticated session, attached to every subsequent request
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    token: String,
    generation: Generation,
}

impl Session {
    pub fn new(token: impl Into<String>, generation: Generation) -> Self {
        Self {
            token: token.into(),
            generation,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Generation whose login endpoint issued the token
    pub fn generation(&self) -> Generation {
        self.generation
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &"<redacted>")
            .field("generation", &self.generation)
            .finish()
    }
}

/// Negotiates a session against whichever API generation accepts the credentials
#[derive(Clone)]
pub struct SessionNegotiator {
    transport: HttpTransport,
    base_url: String,
}

impl SessionNegotiator {
    pub fn new(transport: HttpTransport, base_url: &str) -> Self {
        Self {
            transport,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Exchange credentials for a session token
    pub async fn negotiate(&self, credentials: &Credentials) -> Result<Session, VsphereError> {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, credentials.basic_auth_header()?);

        let legacy_url = format!("{}{}", self.base_url, LEGACY_SESSION_PATH);
        let legacy = self
            .transport
            .send(Method::POST, &legacy_url, &headers, None)
            .await?;

        if is_login_accepted(legacy.status) {
            if let Some(token) = body_value_token(&legacy.body) {
                tracing::info!("Session established via {} endpoint", Generation::Legacy.label());
                return Ok(Session::new(token, Generation::Legacy));
            }
            // Some proxies strip bodies; the current generation may still work
            tracing::debug!("Legacy login accepted but carried no token");
        } else {
            tracing::debug!("Legacy login returned {}", legacy.status);
        }

        let current_url = format!("{}{}", self.base_url, CURRENT_SESSION_PATH);
        let current = self
            .transport
            .send(Method::POST, &current_url, &headers, None)
            .await?;

        if is_login_accepted(current.status) {
            if let Some(token) = current_session_token(&current) {
                tracing::info!("Session established via {} endpoint", Generation::Current.label());
                return Ok(Session::new(token, Generation::Current));
            }
            tracing::debug!("Current login accepted but no token found in body, header or cookie");
        }

        tracing::error!(
            "Login failed: legacy status {}, current status {}",
            legacy.status,
            current.status
        );
        Err(VsphereError::Authentication {
            legacy: Attempt::new(Generation::Legacy, &legacy_url, &legacy),
            current: Attempt::new(Generation::Current, &current_url, &current),
        })
    }
}

fn is_login_accepted(status: u16) -> bool {
    status == 200 || status == 201
}

/// Token from a `{"value": "<token>"}` body
fn body_value_token(body: &ParsedBody) -> Option<String> {
    body.as_json()?
        .as_object()?
        .get("value")?
        .as_str()
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

/// Token from a current-generation login: body, then header, then cookie
fn current_session_token(response: &Response) -> Option<String> {
    body_value_token(&response.body)
        .or_else(|| {
            // The current generation answers with a bare JSON string
            response
                .body
                .as_json()
                .and_then(|v| v.as_str())
                .filter(|token| !token.is_empty())
                .map(str::to_string)
        })
        .or_else(|| {
            response
                .header(SESSION_HEADER)
                .map(str::trim)
                .filter(|token| !token.is_empty())
                .map(str::to_string)
        })
        .or_else(|| {
            response
                .header_values(SET_COOKIE.as_str())
                .find_map(session_id_from_cookie)
        })
}

/// Extract `vmware-api-session-id=<value>` (up to the next `;`) from a cookie header
pub fn session_id_from_cookie(cookie: &str) -> Option<String> {
    let needle = format!("{}=", SESSION_HEADER);
    let start = cookie.to_ascii_lowercase().find(&needle)? + needle.len();
    let value = cookie[start..].split(';').next().unwrap_or_default().trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderName;
    use serde_json::json;

    fn response(status: u16, body: ParsedBody, headers: &[(&str, &str)]) -> Response {
        let mut map = HeaderMap::new();
        for (name, value) in headers {
            map.append(
                HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        Response {
            status,
            body,
            headers: map,
        }
    }

    #[test]
    fn test_sanitize_host() {
        assert_eq!(sanitize_host("vcenter.lab.local"), "vcenter.lab.local");
        assert_eq!(sanitize_host("https://vcenter.lab.local/ui/"), "vcenter.lab.local");
        assert_eq!(sanitize_host("HTTP://10.0.0.5:8443/sdk"), "10.0.0.5:8443");
        assert_eq!(sanitize_host("  10.0.0.5  "), "10.0.0.5");
        assert_eq!(sanitize_host(""), "");
    }

    #[test]
    fn test_credentials_debug_redacts_secret() {
        let creds = Credentials::new("https://vc/", "admin", "hunter2");
        let debug = format!("{:?}", creds);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("<redacted>"));
        assert_eq!(creds.base_url(), "https://vc");
    }

    #[test]
    fn test_basic_auth_header() {
        let creds = Credentials::new("vc", "user", "pass");
        let header = creds.basic_auth_header().unwrap();
        assert_eq!(header.to_str().unwrap(), "Basic dXNlcjpwYXNz");
        assert!(header.is_sensitive());
    }

    #[test]
    fn test_session_debug_redacts_token() {
        let session = Session::new("secret-token", Generation::Current);
        assert!(!format!("{:?}", session).contains("secret-token"));
    }

    #[test]
    fn test_session_id_from_cookie() {
        assert_eq!(
            session_id_from_cookie("vmware-api-session-id=abc123;Path=/api;Secure;HttpOnly"),
            Some("abc123".to_string())
        );
        assert_eq!(
            session_id_from_cookie("other=1; VMWARE-API-SESSION-ID=XyZ; Path=/"),
            Some("XyZ".to_string())
        );
        assert_eq!(session_id_from_cookie("vmware-api-session-id=;Path=/"), None);
        assert_eq!(session_id_from_cookie("JSESSIONID=foo"), None);
    }

    #[test]
    fn test_body_value_token() {
        assert_eq!(
            body_value_token(&ParsedBody::Json(json!({"value": "tok"}))),
            Some("tok".to_string())
        );
        assert_eq!(body_value_token(&ParsedBody::Json(json!({"value": ""}))), None);
        assert_eq!(body_value_token(&ParsedBody::Text("tok".into())), None);
    }

    #[test]
    fn test_current_token_precedence() {
        let all = response(
            201,
            ParsedBody::Json(json!({"value": "from-body"})),
            &[
                ("vmware-api-session-id", "from-header"),
                ("set-cookie", "vmware-api-session-id=from-cookie; Path=/"),
            ],
        );
        assert_eq!(current_session_token(&all), Some("from-body".to_string()));

        let bare = response(201, ParsedBody::Json(json!("bare-token")), &[]);
        assert_eq!(current_session_token(&bare), Some("bare-token".to_string()));

        let header_only = response(
            201,
            ParsedBody::Text(String::new()),
            &[
                ("Vmware-Api-Session-Id", "from-header"),
                ("set-cookie", "vmware-api-session-id=from-cookie; Path=/"),
            ],
        );
        assert_eq!(current_session_token(&header_only), Some("from-header".to_string()));

        let cookie_only = response(
            200,
            ParsedBody::Text(String::new()),
            &[
                ("set-cookie", "lang=en; Path=/"),
                ("set-cookie", "vmware-api-session-id=from-cookie; Path=/"),
            ],
        );
        assert_eq!(current_session_token(&cookie_only), Some("from-cookie".to_string()));

        let nothing = response(200, ParsedBody::Text(String::new()), &[]);
        assert_eq!(current_session_token(&nothing), None);
    }

    #[test]
    fn test_generation_labels() {
        assert_eq!(Generation::Legacy.path_prefix(), "/rest");
        assert_eq!(Generation::Current.path_prefix(), "/api");
        assert_eq!(Generation::Legacy.to_string(), "legacy");
        assert_eq!(Generation::Current.label(), "API");
    }
}
