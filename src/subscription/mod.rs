//! Subscription context
//!
//! Fetches the signed-in company's record, exposes its plan and usage
//! counters, and sends companies without a plan to plan selection.

pub mod mock;

use async_trait::async_trait;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::auth::AuthContext;
use crate::error::{ErrorClass, PortalError, Result};
use crate::logging::AuthEventLogger;
use crate::models::{CompanyRecord, Subscription, UsageKind};
use crate::routes::{Navigator, SELECT_PLAN_ROUTE};

pub use mock::MockCompanyApi;

/// Source of company records
#[async_trait]
pub trait CompanyApi: Send + Sync {
    /// First company record for `company_id`, `None` when the list is empty.
    async fn fetch_company(&self, token: &str, company_id: &str) -> Result<Option<CompanyRecord>>;
}

/// What the context currently exposes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SubscriptionState {
    pub subscription: Option<Subscription>,
    pub is_verified: bool,
    pub loading: bool,
    pub downloads: i64,
    pub views: i64,
    pub teams: i64,
    /// Last transient failure, cleared by a successful load
    pub error: Option<String>,
}

impl SubscriptionState {
    fn counter_mut(&mut self, kind: UsageKind) -> &mut i64 {
        match kind {
            UsageKind::Downloads => &mut self.downloads,
            UsageKind::Views => &mut self.views,
            UsageKind::Teams => &mut self.teams,
        }
    }

    pub fn counter(&self, kind: UsageKind) -> i64 {
        match kind {
            UsageKind::Downloads => self.downloads,
            UsageKind::Views => self.views,
            UsageKind::Teams => self.teams,
        }
    }
}

/// Result of [`SubscriptionContext::load`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadOutcome {
    /// Identity still resolving
    Waiting,
    /// Not a company user; nothing to load
    NotCompany,
    Loaded,
    /// No plan; redirected to plan selection
    PlanRequired,
    /// Fetch failed; see `error` in the state
    Failed,
    /// Identity changed while the fetch was running
    Discarded,
}

pub struct SubscriptionContext {
    auth: Arc<AuthContext>,
    api: Arc<dyn CompanyApi>,
    navigator: Arc<dyn Navigator>,
    events: Option<AuthEventLogger>,
    state: RwLock<SubscriptionState>,
    generation: AtomicU64,
}

impl SubscriptionContext {
    pub fn new(auth: Arc<AuthContext>, api: Arc<dyn CompanyApi>, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            auth,
            api,
            navigator,
            events: None,
            state: RwLock::new(SubscriptionState::default()),
            generation: AtomicU64::new(0),
        }
    }

    pub fn with_events(mut self, events: AuthEventLogger) -> Self {
        self.events = Some(events);
        self
    }

    pub async fn state(&self) -> SubscriptionState {
        self.state.read().await.clone()
    }

    /// Fetch the company record for the current identity.
    pub async fn load(&self) -> LoadOutcome {
        let identity = self.auth.identity().await;
        if identity.is_loading {
            return LoadOutcome::Waiting;
        }
        let (Some(company_id), Some(token)) = (identity.company_id(), identity.token.as_deref()) else {
            self.clear().await;
            return LoadOutcome::NotCompany;
        };

        let generation = self.generation.load(Ordering::SeqCst);
        self.state.write().await.loading = true;
        debug!(company_id, "Fetching company subscription");

        let result = self.api.fetch_company(token, company_id).await;
        if !self.is_current(generation, token).await {
            debug!(company_id, "Discarding stale company fetch");
            self.state.write().await.loading = false;
            return LoadOutcome::Discarded;
        }

        let record = match result {
            Ok(record) => record,
            Err(e) => {
                warn!(company_id, "Company fetch failed: {}", e);
                let mut state = self.state.write().await;
                state.loading = false;
                state.error = Some(e.to_string());
                return LoadOutcome::Failed;
            }
        };

        let is_verified = record.as_ref().map(CompanyRecord::is_verified).unwrap_or(false);
        let Some(subscription) = record.as_ref().and_then(CompanyRecord::subscription) else {
            info!(company_id, "Company has no subscription, redirecting to plan selection");
            {
                let mut state = self.state.write().await;
                *state = SubscriptionState {
                    is_verified,
                    ..SubscriptionState::default()
                };
            }
            if let Some(events) = &self.events {
                events.log_plan_required(company_id).await;
            }
            self.navigator.redirect(SELECT_PLAN_ROUTE);
            return LoadOutcome::PlanRequired;
        };

        debug!(company_id, plan = %subscription.plan_name, "Subscription loaded");
        let mut state = self.state.write().await;
        *state = SubscriptionState {
            downloads: subscription.counter(UsageKind::Downloads),
            views: subscription.counter(UsageKind::Views),
            teams: subscription.counter(UsageKind::Teams),
            subscription: Some(subscription),
            is_verified,
            loading: false,
            error: None,
        };
        LoadOutcome::Loaded
    }

    /// Re-fetch the company record and refresh only the `kind` counter.
    ///
    /// Returns the new counter value, or `None` when no plan is loaded or
    /// the company no longer has one.
    pub async fn update_subscription_usage(&self, kind: UsageKind) -> Result<Option<i64>> {
        let identity = self.auth.identity().await;
        let (Some(company_id), Some(token)) = (identity.company_id(), identity.token.as_deref()) else {
            return Err(PortalError::Forbidden(format!(
                "{} usage is only tracked for company accounts",
                kind
            )));
        };

        if self.state.read().await.subscription.is_none() {
            debug!(company_id, %kind, "No plan loaded, nothing to refresh");
            return Ok(None);
        }

        let generation = self.generation.load(Ordering::SeqCst);
        let record = match self.api.fetch_company(token, company_id).await {
            Ok(record) => record,
            Err(e) => {
                if e.class() == ErrorClass::Transient {
                    self.state.write().await.error = Some(e.to_string());
                }
                return Err(e);
            }
        };
        if !self.is_current(generation, token).await {
            return Ok(None);
        }

        let Some(fresh) = record.as_ref().and_then(CompanyRecord::subscription) else {
            warn!(company_id, %kind, "Subscription vanished during usage refresh");
            return Ok(None);
        };
        let value = fresh.counter(kind);

        let mut state = self.state.write().await;
        let Some(current) = state.subscription.as_mut() else {
            return Ok(None);
        };
        match kind {
            UsageKind::Downloads => current.remaining_resume_downloads = value,
            UsageKind::Views => current.remaining_profile_views = value,
            UsageKind::Teams => current.can_add_user = value,
        }
        *state.counter_mut(kind) = value;
        debug!(company_id, %kind, value, "Usage counter refreshed");
        Ok(Some(value))
    }

    /// Clear on every sign-out or teardown of `auth` until the task is
    /// aborted or the context is dropped.
    pub fn follow_auth(self: &Arc<Self>) -> JoinHandle<()> {
        let mut rx = self.auth.subscribe_sign_out();
        let ctx = Arc::downgrade(self);
        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let Some(ctx) = ctx.upgrade() else { break };
                debug!("Signed out, clearing subscription state");
                ctx.clear().await;
            }
        })
    }

    /// Load again after a transient failure.
    pub async fn retry(&self) -> LoadOutcome {
        self.state.write().await.error = None;
        self.load().await
    }

    /// Forget everything; pending fetches are discarded.
    pub async fn clear(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        *self.state.write().await = SubscriptionState::default();
    }

    async fn is_current(&self, generation: u64, token: &str) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
            && self.auth.identity().await.token.as_deref() == Some(token)
    }
}
