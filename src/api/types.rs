//! Wire types for the backend API
//!
//! Mirrors the JSON bodies the backend produces. Quota figures on the upload
//! response are optional on the wire; absence and zero are both handled by
//! the workflow's page-limit policy.

use serde::{Deserialize, Serialize};

/// Quota summary returned by the upload endpoint. Valid for one workflow
/// run; superseded by the next upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadDescriptor {
    #[serde(default)]
    pub pdf_id: Option<i64>,
    /// Total page count of the uploaded document
    #[serde(default)]
    pub pages_total: Option<u32>,
    /// Pages the backend reserved for this run
    #[serde(default)]
    pub pages_processed: Option<u32>,
    /// Remaining monthly quota after this run
    #[serde(default)]
    pub limit_left: Option<u32>,
    /// Promotional entitlement lifts the page limit to the full document
    #[serde(default)]
    pub has_active_promo: bool,
}

/// Backend-stored artifacts for one detected table region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedTable {
    pub image_file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub csv_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_file: Option<String>,
}

/// Terminal output of a processing run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessResult {
    pub tables: Vec<ProcessedTable>,
    pub total_tables: usize,
}

/// Progress report from the status-poll endpoint. Advisory only; the
/// extraction call's own resolution is authoritative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatus {
    pub status: String,
}

impl JobStatus {
    pub fn is_running(&self) -> bool {
        self.status == "running"
    }
}

/// Current-session identity. Always carries at least `id` and `email`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    pub email: String,
    #[serde(default)]
    pub pages_processed_this_month: Option<u32>,
    #[serde(default)]
    pub monthly_page_limit: Option<u32>,
}

/// One API key record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiKey {
    pub id: i64,
    pub name: String,
    pub api_key: String,
    pub is_active: bool,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub last_used: Option<String>,
    #[serde(default)]
    pub requests_made_this_month: Option<u32>,
    #[serde(default)]
    pub monthly_request_limit: Option<u32>,
}

/// Outcome of redeeming a promo code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromoOutcome {
    pub success: bool,
    pub message: String,
}

/// Subscription state as reported by the billing endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionStatus {
    pub has_subscription: bool,
    pub plan_type: String,
    pub status: String,
    pub monthly_page_limit: u32,
    #[serde(default)]
    pub current_period_end: Option<String>,
    #[serde(default)]
    pub cancel_at_period_end: Option<bool>,
}

/// Paid plan tiers accepted by the checkout endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanType {
    Standard,
    Pro,
}

impl PlanType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanType::Standard => "standard",
            PlanType::Pro => "pro",
        }
    }
}

/// Checkout session handed back by the billing service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub checkout_url: String,
    pub session_id: String,
}

/// Customer portal session for subscription management
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortalSession {
    pub portal_url: String,
}
