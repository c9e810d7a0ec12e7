//! HTTP client for the portal REST API

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::{PortalError, Result};
use crate::models::{
    CompanyRecord, CompanyResponse, OtpLoginRequest, OtpLoginResponse, Session, TokenCheckResponse,
};
use crate::subscription::CompanyApi;

/// OTP verification (login) endpoint
pub const OTP_LOGIN_PATH: &str = "/auth/verify-otp";
/// Bearer token check endpoint
pub const VERIFY_TOKEN_PATH: &str = "/auth/verify-token";
/// Company record endpoint
pub const COMPANY_FETCH_PATH: &str = "/company/get-company";

/// Client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the portal API (e.g. "https://api.crewdeck.example/api")
    pub base_url: String,
    /// Request timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000/api".to_string(),
            timeout_ms: 15_000,
        }
    }
}

/// HTTP client for the portal API.
///
/// Every data call that comes back 401/403 is reported on the unauthorized
/// channel (when one is attached) so the auth context can re-validate the
/// token. The token check itself never reports.
#[derive(Clone)]
pub struct PortalClient {
    config: ClientConfig,
    http: Client,
    unauthorized: Option<mpsc::UnboundedSender<u16>>,
}

impl PortalClient {
    /// Create a new portal client
    pub fn new(config: ClientConfig) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );

        let http = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(Self {
            config: ClientConfig {
                base_url: config.base_url.trim_end_matches('/').to_string(),
                ..config
            },
            http,
            unauthorized: None,
        })
    }

    /// Report 401/403 statuses of data calls on `tx`.
    pub fn with_unauthorized_notifier(mut self, tx: mpsc::UnboundedSender<u16>) -> Self {
        self.unauthorized = Some(tx);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    /// Submit an OTP and turn the answer into a session.
    pub async fn otp_login(&self, request: &OtpLoginRequest) -> Result<Session> {
        request.validate()?;

        let response = self
            .http
            .post(self.url(OTP_LOGIN_PATH))
            .json(request)
            .send()
            .await?;

        // A rejected OTP is not a reason to re-validate anything.
        let body: OtpLoginResponse = self.handle_response(response, false).await?;
        body.into_session()
    }

    /// Ask the server whether `token` is still accepted.
    pub async fn verify_token(&self, token: &str) -> Result<TokenCheckResponse> {
        let response = self
            .http
            .get(self.url(VERIFY_TOKEN_PATH))
            .bearer_auth(token)
            .send()
            .await?;

        self.handle_response(response, false).await
    }

    /// Fetch the company record (first entry of `data`).
    pub async fn fetch_company(&self, token: &str, company_id: &str) -> Result<Option<CompanyRecord>> {
        let response = self
            .http
            .post(self.url(COMPANY_FETCH_PATH))
            .bearer_auth(token)
            .json(&json!({ "company_id": company_id }))
            .send()
            .await?;

        let body: CompanyResponse = self.handle_response(response, true).await?;
        Ok(body.data.into_iter().next())
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
        notify: bool,
    ) -> Result<T> {
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            if notify {
                self.report_unauthorized(status.as_u16());
            }
            return Err(PortalError::Unauthorized {
                status: status.as_u16(),
            });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PortalError::Server {
                status: status.as_u16(),
                message: body,
            });
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(PortalError::from)
    }

    fn report_unauthorized(&self, status: u16) {
        match &self.unauthorized {
            Some(tx) => {
                debug!(status, "Reporting unauthorized response");
                if tx.send(status).is_err() {
                    warn!(status, "Unauthorized response dropped, no interceptor listening");
                }
            }
            None => debug!(status, "Unauthorized response with no interceptor attached"),
        }
    }
}

#[async_trait]
impl CompanyApi for PortalClient {
    async fn fetch_company(&self, token: &str, company_id: &str) -> Result<Option<CompanyRecord>> {
        PortalClient::fetch_company(self, token, company_id).await
    }
}
