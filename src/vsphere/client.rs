//! vCenter Client
//!
//! Session-bound client for reading inventory resources. Every resource is
//! requested from the legacy generation first and from the current generation
//! when the legacy one does not answer 200.

use super::auth::{Credentials, Generation, Session, SessionNegotiator, SESSION_HEADER};
use super::error::{Attempt, VsphereError};
use super::http::HttpTransport;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, COOKIE};
use reqwest::Method;
use serde_json::Value;

/// Main vCenter client
#[derive(Clone)]
pub struct VsphereClient {
    transport: HttpTransport,
    base_url: String,
    session: Session,
    headers: HeaderMap,
}

impl VsphereClient {
    /// Create a client for an already negotiated session
    pub fn new(transport: HttpTransport, base_url: &str, session: Session) -> Result<Self, VsphereError> {
        let headers = session_headers(&session)?;

        Ok(Self {
            transport,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
            headers,
        })
    }

    /// Negotiate a session against `base_url` and return a ready client
    pub async fn connect(
        transport: HttpTransport,
        base_url: &str,
        credentials: &Credentials,
    ) -> Result<Self, VsphereError> {
        let session = SessionNegotiator::new(transport.clone(), base_url)
            .negotiate(credentials)
            .await?;
        Self::new(transport, base_url, session)
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// GET a resource from the legacy path, falling back to the current path
    pub async fn fetch_any(
        &self,
        legacy_path: &str,
        current_path: &str,
    ) -> Result<(Generation, Value), VsphereError> {
        let legacy_url = self.url(legacy_path);
        let legacy = self
            .transport
            .send(Method::GET, &legacy_url, &self.headers, None)
            .await?;
        if legacy.status == 200 {
            return Ok((Generation::Legacy, legacy.body.into_value()));
        }

        let current_url = self.url(current_path);
        let current = self
            .transport
            .send(Method::GET, &current_url, &self.headers, None)
            .await?;
        if current.status == 200 {
            return Ok((Generation::Current, current.body.into_value()));
        }

        Err(VsphereError::Fetch {
            legacy: Attempt::new(Generation::Legacy, &legacy_url, &legacy),
            current: Attempt::new(Generation::Current, &current_url, &current),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // =========================================================================
    // Inventory resources
    // =========================================================================

    /// List all VMs
    pub async fn list_vms(&self) -> Result<(Generation, Value), VsphereError> {
        let (legacy, current) = generation_paths("/vcenter/vm");
        self.fetch_any(&legacy, &current).await
    }

    /// List the ethernet adapters of one VM
    pub async fn list_ethernet(&self, vm_id: &str) -> Result<(Generation, Value), VsphereError> {
        let (legacy, current) = generation_paths(&ethernet_suffix(vm_id));
        self.fetch_any(&legacy, &current).await
    }

    /// Get one ethernet adapter of one VM
    pub async fn get_ethernet(
        &self,
        vm_id: &str,
        nic_id: &str,
    ) -> Result<(Generation, Value), VsphereError> {
        let suffix = format!("{}/{}", ethernet_suffix(vm_id), urlencoding::encode(nic_id));
        let (legacy, current) = generation_paths(&suffix);
        self.fetch_any(&legacy, &current).await
    }
}

/// Session token as both a custom header and a cookie; generations honor different carriers
fn session_headers(session: &Session) -> Result<HeaderMap, VsphereError> {
    let mut token = HeaderValue::from_str(session.token())
        .map_err(|_| VsphereError::InvalidHeader(SESSION_HEADER))?;
    token.set_sensitive(true);

    let mut cookie = HeaderValue::from_str(&format!("{}={}", SESSION_HEADER, session.token()))
        .map_err(|_| VsphereError::InvalidHeader("cookie"))?;
    cookie.set_sensitive(true);

    let mut headers = HeaderMap::new();
    headers.insert(HeaderName::from_static(SESSION_HEADER), token);
    headers.insert(COOKIE, cookie);
    Ok(headers)
}

/// Legacy and current paths for the same resource suffix
pub fn generation_paths(suffix: &str) -> (String, String) {
    (
        format!("{}{}", Generation::Legacy.path_prefix(), suffix),
        format!("{}{}", Generation::Current.path_prefix(), suffix),
    )
}

fn ethernet_suffix(vm_id: &str) -> String {
    format!("/vcenter/vm/{}/hardware/ethernet", urlencoding::encode(vm_id))
}
