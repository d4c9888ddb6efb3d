//! Account and billing views
//!
//! Thin CRUD over the backend: dashboard aggregation, API-key management,
//! promo redemption, and the Stripe session wrappers. No state is kept
//! client-side beyond the fetched snapshots.

use crate::api::types::{
    ApiKey, CheckoutSession, PlanType, PortalSession, PromoOutcome, SessionUser,
    SubscriptionStatus,
};
use crate::api::ApiClient;
use crate::error::Result;

/// Everything the dashboard shows, fetched in one round
#[derive(Debug, Clone)]
pub struct DashboardSnapshot {
    pub user: Option<SessionUser>,
    pub subscription: Option<SubscriptionStatus>,
    pub api_keys: Vec<ApiKey>,
}

impl DashboardSnapshot {
    /// Fetch identity, subscription state and API keys concurrently. The
    /// identity check is load-bearing; the other two degrade to empty on
    /// failure so a billing hiccup never blanks the whole dashboard.
    pub async fn fetch(client: &ApiClient) -> Result<Self> {
        let (user, subscription, api_keys) = tokio::join!(
            client.me(),
            client.subscription_status(),
            client.list_api_keys(),
        );

        let user = user?;
        let subscription = match subscription {
            Ok(status) => Some(status),
            Err(err) => {
                tracing::warn!(error = %err, "subscription status unavailable");
                None
            }
        };
        let api_keys = match api_keys {
            Ok(keys) => keys,
            Err(err) => {
                tracing::warn!(error = %err, "API key list unavailable");
                Vec::new()
            }
        };

        Ok(Self {
            user,
            subscription,
            api_keys,
        })
    }

    /// Usage as a fraction of the monthly limit, when both figures are known
    pub fn usage_ratio(&self) -> Option<f64> {
        let user = self.user.as_ref()?;
        let used = user.pages_processed_this_month?;
        let limit = user.monthly_page_limit?;
        if limit == 0 {
            return None;
        }
        Some(f64::from(used) / f64::from(limit))
    }
}

/// Create a named API key
pub async fn create_api_key(client: &ApiClient, name: &str) -> Result<ApiKey> {
    let key = client.create_api_key(name).await?;
    tracing::info!(key_id = key.id, name = %key.name, "API key created");
    Ok(key)
}

/// Revoke an API key by id
pub async fn revoke_api_key(client: &ApiClient, id: i64) -> Result<()> {
    client.revoke_api_key(id).await?;
    tracing::info!(key_id = id, "API key revoked");
    Ok(())
}

/// Redeem a promo code; the call carries its own short deadline
pub async fn redeem_promo(client: &ApiClient, code: &str) -> Result<PromoOutcome> {
    client.validate_promo(code).await
}

/// Start a checkout session for a paid plan
pub async fn start_checkout(client: &ApiClient, plan: PlanType) -> Result<CheckoutSession> {
    client.create_checkout_session(plan).await
}

/// Open the customer portal for subscription management
pub async fn open_portal(client: &ApiClient) -> Result<PortalSession> {
    client.create_portal_session().await
}

/// Cancel the subscription at period end
pub async fn cancel_subscription(client: &ApiClient) -> Result<()> {
    client.cancel_subscription().await
}
