//! HTTP adapter for the backend API
//!
//! Wraps a single `reqwest::Client` with a cookie store so the session
//! cookie rides along on every call, applies uniform per-request timeouts,
//! and normalizes backend error payloads into `ClientError`.

use std::path::Path;
use std::time::Duration;

use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::config::ApiConfig;
use crate::error::{ClientError, Result};

use super::types::{
    ApiKey, CheckoutSession, JobStatus, PlanType, PortalSession, ProcessResult, PromoOutcome,
    SessionUser, SubscriptionStatus, UploadDescriptor,
};

/// Structured error payload produced by the backend
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Client for the Octro backend API
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
    process_timeout: Duration,
    promo_timeout: Duration,
}

impl ApiClient {
    /// Create a new client from configuration
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .user_agent(concat!("octro-client/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(config.timeout_secs),
            process_timeout: Duration::from_secs(config.process_timeout_secs),
            promo_timeout: Duration::from_secs(config.promo_timeout_secs),
        })
    }

    /// Origin the client talks to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn artifact_url(&self, filename: &str) -> String {
        format!("{}/download/{}", self.base_url, urlencoding::encode(filename))
    }

    /// Decode a success body, or normalize the error payload.
    async fn expect_json<T: DeserializeOwned>(&self, response: Response, fallback: &str) -> Result<T> {
        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            Err(Self::error_from_response(response, fallback).await)
        }
    }

    async fn expect_ok(&self, response: Response, fallback: &str) -> Result<()> {
        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::error_from_response(response, fallback).await)
        }
    }

    /// Extract the backend's `detail`/`message` field when present, else
    /// fall back to a generic call-site message.
    async fn error_from_response(response: Response, fallback: &str) -> ClientError {
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return ClientError::Unauthenticated;
        }
        let message = response
            .json::<ErrorBody>()
            .await
            .ok()
            .and_then(|body| body.detail.or(body.message))
            .unwrap_or_else(|| fallback.to_string());
        ClientError::Backend {
            status: status.as_u16(),
            message,
        }
    }

    // ========================================================================
    // Auth
    // ========================================================================

    /// Query current-session identity. A 401 is a valid "not signed in"
    /// answer, not an error.
    pub async fn me(&self) -> Result<Option<SessionUser>> {
        let response = self
            .http
            .get(self.url("/auth/me"))
            .timeout(self.timeout)
            .send()
            .await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            return Ok(None);
        }
        let user = self.expect_json(response, "failed to fetch session").await?;
        Ok(Some(user))
    }

    /// Login is redirect-based; the caller navigates to this URL.
    pub fn login_url(&self) -> String {
        self.url("/auth/login")
    }

    /// End the backend session.
    pub async fn logout(&self) -> Result<()> {
        let response = self
            .http
            .post(self.url("/auth/logout"))
            .timeout(self.timeout)
            .send()
            .await?;
        self.expect_ok(response, "logout failed").await
    }

    // ========================================================================
    // API keys
    // ========================================================================

    pub async fn list_api_keys(&self) -> Result<Vec<ApiKey>> {
        let response = self
            .http
            .get(self.url("/auth/api-keys"))
            .timeout(self.timeout)
            .send()
            .await?;
        self.expect_json(response, "failed to list API keys").await
    }

    pub async fn create_api_key(&self, name: &str) -> Result<ApiKey> {
        let response = self
            .http
            .post(self.url("/auth/api-keys"))
            .query(&[("name", name)])
            .timeout(self.timeout)
            .send()
            .await?;
        self.expect_json(response, "failed to create API key").await
    }

    pub async fn revoke_api_key(&self, id: i64) -> Result<()> {
        let response = self
            .http
            .delete(self.url(&format!("/auth/api-keys/{}", id)))
            .timeout(self.timeout)
            .send()
            .await?;
        self.expect_ok(response, "failed to revoke API key").await
    }

    // ========================================================================
    // Upload / process / download
    // ========================================================================

    /// Upload a PDF and receive its quota descriptor.
    pub async fn upload_pdf(&self, path: &Path) -> Result<UploadDescriptor> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ClientError::Validation("Please select a PDF file".to_string()))?
            .to_string();
        let bytes = tokio::fs::read(path).await?;

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("application/pdf")?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .http
            .post(self.url("/upload_pdf"))
            .multipart(form)
            .timeout(self.timeout)
            .send()
            .await?;
        self.expect_json(response, "An error occurred during upload")
            .await
    }

    /// Run extraction for a previously uploaded file. Long-running; carries
    /// its own timeout.
    pub async fn process(&self, filename: &str, pages_limit: u32) -> Result<ProcessResult> {
        let url = format!(
            "{}/process/{}",
            self.base_url,
            urlencoding::encode(filename)
        );
        let response = self
            .http
            .get(url)
            .query(&[("output_format", "both")])
            .query(&[("pages_limit", pages_limit)])
            .timeout(self.process_timeout)
            .send()
            .await?;
        self.expect_json(response, "An error occurred during processing")
            .await
    }

    /// Poll job progress for a file being processed.
    pub async fn process_status(&self, filename: &str) -> Result<JobStatus> {
        let response = self
            .http
            .get(self.url("/process_status"))
            .query(&[("filename", filename)])
            .timeout(self.timeout)
            .send()
            .await?;
        self.expect_json(response, "failed to fetch job status").await
    }

    /// Fetch a stored artifact as raw bytes.
    pub async fn download(&self, filename: &str) -> Result<Vec<u8>> {
        let response = self
            .http
            .get(self.artifact_url(filename))
            .timeout(self.timeout)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::error_from_response(response, "Download failed").await);
        }
        Ok(response.bytes().await?.to_vec())
    }

    /// Fetch a JSON artifact and decode it.
    pub async fn download_json(&self, filename: &str) -> Result<Value> {
        let response = self
            .http
            .get(self.artifact_url(filename))
            .timeout(self.timeout)
            .send()
            .await?;
        self.expect_json(response, "Download failed").await
    }

    // ========================================================================
    // Question answering
    // ========================================================================

    /// Ask a natural-language question about one table's content.
    pub async fn ask(&self, question: &str, table: &[Value]) -> Result<String> {
        #[derive(Debug, Deserialize)]
        struct AnswerBody {
            answer: String,
        }

        let response = self
            .http
            .post(self.url("/ask"))
            .json(&serde_json::json!({
                "question": question,
                "table": table,
            }))
            .timeout(self.timeout)
            .send()
            .await?;
        let body: AnswerBody = self.expect_json(response, "Failed to get answer").await?;
        Ok(body.answer)
    }

    // ========================================================================
    // Promo / billing
    // ========================================================================

    /// Redeem a promo code. This call has a short dedicated deadline with
    /// its own user-facing message.
    pub async fn validate_promo(&self, code: &str) -> Result<PromoOutcome> {
        let response = self
            .http
            .post(self.url("/promo/validate"))
            .json(&serde_json::json!({ "code": code }))
            .timeout(self.promo_timeout)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    ClientError::PromoTimeout
                } else {
                    ClientError::Transport(err)
                }
            })?;
        self.expect_json(response, "failed to validate promo code")
            .await
    }

    pub async fn create_checkout_session(&self, plan: PlanType) -> Result<CheckoutSession> {
        let response = self
            .http
            .post(self.url("/stripe/create-checkout-session"))
            .json(&serde_json::json!({ "plan_type": plan.as_str() }))
            .timeout(self.timeout)
            .send()
            .await?;
        self.expect_json(response, "failed to create checkout session")
            .await
    }

    pub async fn create_portal_session(&self) -> Result<PortalSession> {
        let response = self
            .http
            .post(self.url("/stripe/create-portal-session"))
            .timeout(self.timeout)
            .send()
            .await?;
        self.expect_json(response, "failed to create portal session")
            .await
    }

    pub async fn subscription_status(&self) -> Result<SubscriptionStatus> {
        let response = self
            .http
            .get(self.url("/stripe/subscription-status"))
            .timeout(self.timeout)
            .send()
            .await?;
        self.expect_json(response, "failed to fetch subscription status")
            .await
    }

    pub async fn cancel_subscription(&self) -> Result<()> {
        let response = self
            .http
            .post(self.url("/stripe/cancel-subscription"))
            .timeout(self.timeout)
            .send()
            .await?;
        self.expect_ok(response, "failed to cancel subscription").await
    }
}
