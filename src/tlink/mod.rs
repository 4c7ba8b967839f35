//! TLINK cloud API integration module
//!
//! - `client`: HTTP client (token exchange, device listing)
//! - `credential`: bearer token lifecycle
//! - `models`: wire payloads

pub mod client;
pub mod credential;
pub mod models;

pub use client::{TlinkAccount, TlinkClient};
pub use credential::{Credential, CredentialManager};

use async_trait::async_trait;

use crate::error::TransportError;

/// Raw access to the two endpoints the sync engine uses
///
/// Both calls return the response body untouched; an empty body is a
/// `TransportError::EmptyBody`.
#[async_trait]
pub trait TelemetryApi: Send + Sync {
    /// Password-grant token exchange
    async fn request_token(&self) -> Result<String, TransportError>;

    /// One page of the device/sensor listing
    async fn request_device_page(
        &self,
        token: &str,
        user_id: i64,
        page: u32,
        page_size: u32,
    ) -> Result<String, TransportError>;
}
