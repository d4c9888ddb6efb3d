//! Session Probe
//!
//! One process-wide authentication store, observed by every view through a
//! watch channel. Identity is re-checked on a timer and on demand after
//! login/logout; an auth-check failure is never an error, it just resolves
//! to "signed out".

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::api::types::SessionUser;
use crate::api::ApiClient;

/// Tri-state authentication status
#[derive(Debug, Clone, Default, PartialEq)]
pub enum AuthState {
    /// No check has completed yet
    #[default]
    Unknown,
    SignedOut,
    SignedIn(SessionUser),
}

impl AuthState {
    pub fn user(&self) -> Option<&SessionUser> {
        match self {
            AuthState::SignedIn(user) => Some(user),
            _ => None,
        }
    }
}

/// Shared session store
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<SessionStoreInner>,
}

struct SessionStoreInner {
    client: ApiClient,
    state: watch::Sender<AuthState>,
    last_checked: std::sync::RwLock<Option<DateTime<Utc>>>,
}

impl SessionStore {
    pub fn new(client: ApiClient) -> Self {
        let (state, _) = watch::channel(AuthState::Unknown);
        Self {
            inner: Arc::new(SessionStoreInner {
                client,
                state,
                last_checked: std::sync::RwLock::new(None),
            }),
        }
    }

    /// Current state snapshot
    pub fn current(&self) -> AuthState {
        self.inner.state.borrow().clone()
    }

    /// Observe state changes
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.inner.state.subscribe()
    }

    /// When the identity was last checked against the backend
    pub fn last_checked(&self) -> Option<DateTime<Utc>> {
        *self.inner.last_checked.read().expect("lock poisoned")
    }

    /// Query current-session identity and publish the result. Transport
    /// errors and 401s both resolve to `SignedOut`.
    pub async fn refresh(&self) -> AuthState {
        let state = match self.inner.client.me().await {
            Ok(Some(user)) => {
                tracing::debug!(user_id = user.id, email = %user.email, "session active");
                AuthState::SignedIn(user)
            }
            Ok(None) => AuthState::SignedOut,
            Err(err) => {
                // Auth-check failures are not surfaced to the user.
                tracing::debug!(error = %err, "auth check failed");
                AuthState::SignedOut
            }
        };

        *self.inner.last_checked.write().expect("lock poisoned") = Some(Utc::now());
        self.inner.state.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state.clone();
                true
            }
        });
        state
    }

    /// End the session. Local state is cleared no matter what the network
    /// says; client-side memory is not trusted after logout.
    pub async fn logout(&self) {
        if let Err(err) = self.inner.client.logout().await {
            tracing::warn!(error = %err, "logout request failed, clearing local state anyway");
        }
        *self.inner.last_checked.write().expect("lock poisoned") = Some(Utc::now());
        self.inner.state.send_replace(AuthState::SignedOut);
    }

    /// Check once now, then keep re-checking at `interval` until the
    /// returned guard is dropped.
    pub fn spawn_refresh_task(&self, interval: Duration) -> RefreshTask {
        let store = self.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                store.refresh().await;
            }
        });
        RefreshTask { handle }
    }
}

/// Guard for the background refresh loop; aborts the task on drop so no
/// timer outlives its owner.
pub struct RefreshTask {
    handle: JoinHandle<()>,
}

impl Drop for RefreshTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
