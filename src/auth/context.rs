//! Auth context
//!
//! Reconciles the session framework with the local auth record into one
//! [`UnifiedIdentity`], and owns every path that ends a session.
//!
//! Reactions:
//! - [`initialize`](AuthContext::initialize): load the local record, then
//!   validate its token remotely; invalid -> logout.
//! - [`watch_session`](AuthContext::watch_session): every transition to
//!   `authenticated` is written through to the local record.
//! - [`spawn_interceptor`](AuthContext::spawn_interceptor): 401/403 from the
//!   API re-validate the effective token (one check at a time); invalid ->
//!   logout.
//!
//! Logout bumps a generation counter before anything else. A validation or
//! write-through that started under an older generation, or finishes after
//! teardown, is discarded. Dependents follow
//! [`subscribe_sign_out`](AuthContext::subscribe_sign_out) to drop their own
//! state.

use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::identity::{derive_identity, IdentityInputs, UnifiedIdentity};
use super::session::{SessionProvider, SessionStatus};
use super::store::LocalAuthStore;
use super::validator::TokenValidator;
use crate::error::Result;
use crate::logging::{AuthEventLogger, LogoutReason};
use crate::models::{LocalAuthRecord, UserProfile};
use crate::routes::{Navigator, LOGIN_ROUTE};

/// Result of a (re-)validation attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationOutcome {
    /// Status was not 401/403
    NotApplicable,
    /// Another validation is already in flight
    AlreadyInFlight,
    /// No effective token to check
    NoCredential,
    /// Token accepted, nothing done
    Valid,
    /// Token rejected, logout performed
    LoggedOut,
    /// Logout or teardown happened while the check was running
    Discarded,
}

#[derive(Debug, Default)]
struct AuthState {
    local: Option<LocalAuthRecord>,
    initial_load_complete: bool,
}

/// Clears the in-flight flag when the validation ends, however it ends.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Reconciliation service between session framework and local auth store.
pub struct AuthContext {
    session: Arc<dyn SessionProvider>,
    validator: Arc<dyn TokenValidator>,
    store: LocalAuthStore,
    navigator: Arc<dyn Navigator>,
    events: Option<AuthEventLogger>,
    state: RwLock<AuthState>,
    validating: AtomicBool,
    generation: AtomicU64,
    mounted: AtomicBool,
    signed_out: watch::Sender<u64>,
}

impl AuthContext {
    pub fn new(
        session: Arc<dyn SessionProvider>,
        validator: Arc<dyn TokenValidator>,
        store: LocalAuthStore,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            session,
            validator,
            store,
            navigator,
            events: None,
            state: RwLock::new(AuthState::default()),
            validating: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            mounted: AtomicBool::new(true),
            signed_out: watch::channel(0).0,
        }
    }

    /// Record auth events to `events`.
    pub fn with_events(mut self, events: AuthEventLogger) -> Self {
        self.events = Some(events);
        self
    }

    /// Current merged identity.
    pub async fn identity(&self) -> UnifiedIdentity {
        let snapshot = self.session.snapshot();
        let state = self.state.read().await;
        derive_identity(IdentityInputs {
            session_status: snapshot.status,
            session: snapshot.session.as_ref(),
            local: state.local.as_ref(),
            initial_load_complete: state.initial_load_complete,
            validating: self.validating.load(Ordering::SeqCst),
        })
    }

    pub async fn is_authenticated(&self) -> bool {
        self.identity().await.is_authenticated
    }

    pub async fn user(&self) -> Option<UserProfile> {
        self.identity().await.user
    }

    pub async fn token(&self) -> Option<String> {
        self.identity().await.token
    }

    /// Mount: load the local record, then check its token remotely.
    pub async fn initialize(&self) -> Result<ValidationOutcome> {
        self.mounted.store(true, Ordering::SeqCst);

        let record = self.store.load()?;
        {
            let mut state = self.state.write().await;
            state.local = record.clone();
            state.initial_load_complete = true;
        }

        let Some(record) = record else {
            debug!("No local auth record");
            return Ok(ValidationOutcome::NoCredential);
        };
        debug!(user_id = %record.user.id, "Local auth record loaded, validating");

        let Some(_in_flight) = self.begin_validation() else {
            return Ok(ValidationOutcome::AlreadyInFlight);
        };
        Ok(self
            .check_token(record.token, LogoutReason::InvalidToken)
            .await)
    }

    /// Persist a token + user pair. `false` if either is missing or the
    /// write fails.
    pub async fn login(&self, token: &str, user: Option<UserProfile>) -> bool {
        let Some(record) = LocalAuthRecord::new(token, user) else {
            warn!("Login called without token or user");
            return false;
        };

        if let Err(e) = self.store.save(&record) {
            warn!("Failed to persist login: {}", e);
            return false;
        }

        info!(user_id = %record.user.id, user_type = %record.user.kind, "Logged in");
        if let Some(events) = &self.events {
            events.log_login(&record.user.id, record.user.kind).await;
        }

        let mut state = self.state.write().await;
        state.local = Some(record);
        state.initial_load_complete = true;
        true
    }

    /// Manual logout.
    pub async fn logout(&self) {
        self.logout_with(LogoutReason::Manual).await;
    }

    /// Clear everything, sign out of the session framework, go to login.
    async fn logout_with(&self, reason: LogoutReason) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        // The state lock is held until the session is signed out, so a
        // write-through can never observe the old session after the clear.
        let user = {
            let mut state = self.state.write().await;
            let previous = state.local.take();
            let session_user = self.session.snapshot().session.map(|s| s.user);
            if let Err(e) = self.store.clear() {
                warn!("Failed to clear local auth record: {}", e);
            }
            if let Err(e) = self.session.sign_out().await {
                warn!("Session sign-out failed: {}", e);
            }
            previous.map(|r| r.user).or(session_user)
        };

        info!(?reason, user_id = ?user.as_ref().map(|u| u.id.as_str()), "Logging out");
        if let Some(events) = &self.events {
            events
                .log_logout(reason, user.as_ref().map(|u| (u.id.as_str(), u.kind)))
                .await;
        }

        self.signed_out.send_replace(generation);
        self.navigator.redirect(LOGIN_ROUTE);
    }

    /// Mirror an authenticated session into the local record.
    ///
    /// Returns whether anything was written. Nothing is written when a
    /// logout started after the session was read.
    pub async fn sync_session(&self) -> bool {
        let generation = self.generation.load(Ordering::SeqCst);
        let snapshot = self.session.snapshot();
        if snapshot.status != SessionStatus::Authenticated {
            return false;
        }
        let Some(session) = snapshot.session else {
            return false;
        };
        let record = LocalAuthRecord::from(&session);

        let mut state = self.state.write().await;
        let current = self.session.snapshot();
        if self.generation.load(Ordering::SeqCst) != generation
            || current.status != SessionStatus::Authenticated
            || current.session.as_ref() != Some(&session)
        {
            debug!("Session changed before write-through, skipping");
            return false;
        }
        if state.local.as_ref() == Some(&record) {
            return false;
        }
        if let Err(e) = self.store.save(&record) {
            warn!("Failed to write session through to local store: {}", e);
            return false;
        }
        debug!(user_id = %record.user.id, "Session written through to local store");
        if let Some(events) = &self.events {
            events
                .log_session_synced(&record.user.id, record.user.kind)
                .await;
        }
        state.local = Some(record);
        true
    }

    /// Ticks with the new generation on every logout and on teardown.
    pub fn subscribe_sign_out(&self) -> watch::Receiver<u64> {
        self.signed_out.subscribe()
    }

    /// React to session framework transitions until teardown.
    pub fn watch_session(self: &Arc<Self>) -> JoinHandle<()> {
        let ctx = Arc::clone(self);
        let mut rx = ctx.session.subscribe();
        tokio::spawn(async move {
            let mut last = None;
            loop {
                let (status, changed) = {
                    let state = rx.borrow_and_update();
                    let key = (state.status, state.session.clone());
                    let changed = last.as_ref() != Some(&key);
                    last = Some(key);
                    (state.status, changed)
                };
                if !ctx.mounted.load(Ordering::SeqCst) {
                    break;
                }
                if changed && status == SessionStatus::Authenticated {
                    ctx.sync_session().await;
                }
                if rx.changed().await.is_err() {
                    break;
                }
            }
            debug!("Session watcher stopped");
        })
    }

    /// Global response interceptor entry point.
    pub async fn handle_response_status(&self, status: u16) -> ValidationOutcome {
        if status != 401 && status != 403 {
            return ValidationOutcome::NotApplicable;
        }

        let Some(_in_flight) = self.begin_validation() else {
            debug!(status, "Validation already in flight, ignoring");
            return ValidationOutcome::AlreadyInFlight;
        };

        let Some(token) = self.identity().await.token else {
            debug!(status, "Unauthorized response without a credential");
            return ValidationOutcome::NoCredential;
        };

        info!(status, "Unauthorized response, re-validating token");
        self.check_token(token, LogoutReason::Unauthorized).await
    }

    /// Feed 401/403 statuses from the API client into the interceptor.
    pub fn spawn_interceptor(self: &Arc<Self>, mut rx: mpsc::UnboundedReceiver<u16>) -> JoinHandle<()> {
        let ctx = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(status) = rx.recv().await {
                if !ctx.mounted.load(Ordering::SeqCst) {
                    break;
                }
                let ctx = Arc::clone(&ctx);
                tokio::spawn(async move {
                    ctx.handle_response_status(status).await;
                });
            }
        })
    }

    /// Stop reacting; results of pending checks are discarded.
    pub fn teardown(&self) {
        self.mounted.store(false, Ordering::SeqCst);
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.signed_out.send_replace(generation);
    }

    pub fn is_validating(&self) -> bool {
        self.validating.load(Ordering::SeqCst)
    }

    fn begin_validation(&self) -> Option<InFlight<'_>> {
        self.validating
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| InFlight(&self.validating))
    }

    async fn check_token(&self, token: String, reason: LogoutReason) -> ValidationOutcome {
        let generation = self.generation.load(Ordering::SeqCst);
        let valid = self.validator.validate(Some(&token)).await;

        if !self.mounted.load(Ordering::SeqCst) || self.generation.load(Ordering::SeqCst) != generation {
            debug!("Discarding stale validation result");
            return ValidationOutcome::Discarded;
        }
        if self.identity().await.token.as_deref() != Some(token.as_str()) {
            debug!("Effective token changed during validation, discarding result");
            return ValidationOutcome::Discarded;
        }

        if let Some(events) = &self.events {
            events.log_token_validated(valid).await;
        }

        if valid {
            debug!("Token is valid");
            ValidationOutcome::Valid
        } else {
            warn!("Token is no longer valid");
            self.logout_with(reason).await;
            ValidationOutcome::LoggedOut
        }
    }
}
