//! TLINK HTTP client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use url::Url;

use super::models::ListingRequest;
use super::TelemetryApi;
use crate::config::ApiConfig;
use crate::error::TransportError;

const TOKEN_PATH: &str = "/oauth/token";
const LISTING_PATH: &str = "/api/device/getDeviceSensorDatas";
const APP_ID_HEADER: &str = "tlinkAppId";

/// Account used for the password grant
#[derive(Debug, Clone)]
pub struct TlinkAccount {
    pub username: String,
    pub password: String,
    pub client_id: String,
    pub secret: String,
}

pub struct TlinkClient {
    http_client: Client,
    account: TlinkAccount,
    token_url: Url,
    listing_url: Url,
}

impl TlinkClient {
    pub fn new(api: &ApiConfig, account: TlinkAccount) -> anyhow::Result<Self> {
        let base = Url::parse(&api.base_url)?;
        let http_client = Client::builder()
            .timeout(Duration::from_secs(api.timeout_secs))
            .build()?;

        Ok(Self {
            http_client,
            account,
            token_url: base.join(TOKEN_PATH)?,
            listing_url: base.join(LISTING_PATH)?,
        })
    }
}

async fn read_body(resp: Response) -> Result<String, TransportError> {
    let status = resp.status();
    let body = resp
        .text()
        .await
        .map_err(|e| TransportError::Request(e.to_string()))?;

    tracing::debug!("[TlinkClient] HTTP {} ({} bytes)", status, body.len());

    if body.is_empty() {
        return Err(TransportError::EmptyBody);
    }
    Ok(body)
}

#[async_trait]
impl TelemetryApi for TlinkClient {
    async fn request_token(&self) -> Result<String, TransportError> {
        let params = [
            ("grant_type", "password"),
            ("username", self.account.username.as_str()),
            ("password", self.account.password.as_str()),
        ];

        let resp = self
            .http_client
            .post(self.token_url.clone())
            .basic_auth(&self.account.client_id, Some(&self.account.secret))
            .form(&params)
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        read_body(resp).await
    }

    async fn request_device_page(
        &self,
        token: &str,
        user_id: i64,
        page: u32,
        page_size: u32,
    ) -> Result<String, TransportError> {
        let body = ListingRequest {
            user_id,
            curr_page: page,
            page_size,
        };

        let resp = self
            .http_client
            .post(self.listing_url.clone())
            .bearer_auth(token)
            .header(APP_ID_HEADER, &self.account.client_id)
            .json(&body)
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        read_body(resp).await
    }
}
