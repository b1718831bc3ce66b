//! Error types for vCenter operations
//!
//! Fatal failures carry one [`Attempt`] per API generation so the operator can
//! see what each surface answered.
//! SECURITY: Error messages MUST NOT contain passwords or session tokens.

use super::auth::Generation;
use super::http::Response;
use std::fmt;
use std::time::Duration;

/// Outcome of one call against one API generation, kept for diagnostics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    pub generation: Generation,
    pub url: String,
    /// HTTP status, or 0 when no response was received
    pub status: u16,
    /// Sanitized, truncated response body
    pub body: String,
}

impl Attempt {
    pub fn new(generation: Generation, url: &str, response: &Response) -> Self {
        Self {
            generation,
            url: url.to_string(),
            status: response.status,
            body: response.body.excerpt(),
        }
    }

    /// True when no response was obtained at all (DNS, TLS, connect, timeout)
    pub fn is_transport_failure(&self) -> bool {
        self.status == 0
    }
}

impl fmt::Display for Attempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<7} {} -> {}: {}",
            self.generation.label(),
            self.url,
            self.status,
            self.body
        )
    }
}

/// Errors from vCenter operations
#[derive(Debug, thiserror::Error)]
pub enum VsphereError {
    #[error("Login failed on both API generations\n  {legacy}\n  {current}")]
    Authentication { legacy: Attempt, current: Attempt },

    #[error("Fetch failed on both API generations\n  {legacy}\n  {current}")]
    Fetch { legacy: Attempt, current: Attempt },

    #[error("Invalid request URL: {0}")]
    InvalidUrl(String),

    #[error("Unsupported HTTP method: {0}")]
    UnsupportedMethod(String),

    #[error("Invalid header value for {0}")]
    InvalidHeader(&'static str),

    #[error("Failed to create HTTP client: {0}")]
    ClientBuild(String),

    #[error("Deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),
}

impl VsphereError {
    /// Status codes of both generation attempts, legacy first
    pub fn attempt_statuses(&self) -> Option<(u16, u16)> {
        match self {
            Self::Authentication { legacy, current } | Self::Fetch { legacy, current } => {
                Some((legacy.status, current.status))
            }
            _ => None,
        }
    }
}

/// Format a vCenter error for display, with a troubleshooting hint where one applies
pub fn format_vsphere_error(error: &VsphereError) -> String {
    let hint = match error.attempt_statuses() {
        Some((0, 0)) => Some(
            "Could not reach the host. Check the hostname, that HTTPS 443 is open, \
             and the TLS settings (--verify-tls / --ca-cert / --insecure).",
        ),
        Some((401, _)) | Some((_, 401)) => {
            Some("Credentials were rejected. Check the username and password.")
        }
        Some((403, _)) | Some((_, 403)) => {
            Some("Permission denied. The account may lack read access to the inventory.")
        }
        Some((404, 404)) => Some("Neither API surface exists. Ensure the host is vCenter, not ESXi."),
        _ => None,
    };

    match (error, hint) {
        (VsphereError::Authentication { .. }, Some(hint)) => format!("{error}\nTip: {hint}"),
        (VsphereError::Authentication { .. }, None) => format!(
            "{error}\nTip: ensure host is vCenter (not ESXi), credentials are correct, \
             and proxy/SSL allow HTTPS 443."
        ),
        (_, Some(hint)) => format!("{error}\nTip: {hint}"),
        (_, None) => error.to_string(),
    }
}
