//! vCenter API interaction module
//!
//! This module provides the core functionality for talking to a vCenter server,
//! which exposes the same resources under two API generations: the legacy
//! `/rest` surface and the current `/api` surface.
//!
//! # Module Structure
//!
//! - [`http`] - Single-call HTTP transport with uniform result shape
//! - [`auth`] - Credentials and session negotiation across both generations
//! - [`client`] - Session-bound client that fetches resources with generation fallback
//! - [`error`] - Error types carrying per-generation attempt diagnostics
//!
//! # Example
//!
//! ```ignore
//! use vcmac::vsphere::{Credentials, HttpTransport, TransportConfig, VsphereClient};
//!
//! async fn example() -> anyhow::Result<()> {
//!     let credentials = Credentials::new("vcenter.lab.local", "administrator@vsphere.local", "secret");
//!     let transport = HttpTransport::new(&TransportConfig::default())?;
//!     let client = VsphereClient::connect(transport, &credentials.base_url(), &credentials).await?;
//!     let (generation, vms) = client.list_vms().await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod error;
pub mod http;

pub use auth::{Credentials, Generation, Session, SessionNegotiator};
pub use client::VsphereClient;
pub use error::{format_vsphere_error, Attempt, VsphereError};
pub use http::{HttpTransport, ParsedBody, Response, TransportConfig};
