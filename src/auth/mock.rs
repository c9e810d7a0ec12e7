//! Mock validator and session provider for testing.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Notify};

use super::session::{SessionProvider, SessionState};
use super::validator::TokenValidator;
use crate::error::Result;
use crate::models::Session;

/// Mock token validator.
///
/// Answers with a fixed verdict. With a gate attached, every call waits for
/// one `notify_one` before answering, which keeps a validation in flight for
/// as long as a test needs.
pub struct MockValidator {
    verdict: AtomicBool,
    call_count: AtomicU32,
    gate: Option<Arc<Notify>>,
}

impl MockValidator {
    pub fn new(valid: bool) -> Self {
        Self {
            verdict: AtomicBool::new(valid),
            call_count: AtomicU32::new(0),
            gate: None,
        }
    }

    /// Hold every call until `gate` is notified.
    pub fn with_gate(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Change the verdict for subsequent calls.
    pub fn set_valid(&self, valid: bool) {
        self.verdict.store(valid, Ordering::SeqCst);
    }

    /// Number of calls that reached the (simulated) network.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenValidator for MockValidator {
    async fn validate(&self, token: Option<&str>) -> bool {
        if token.map(str::trim).unwrap_or_default().is_empty() {
            return false;
        }
        self.call_count.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.verdict.load(Ordering::SeqCst)
    }
}

/// Mock session framework whose state is set directly by the test.
pub struct MockSession {
    state: watch::Sender<SessionState>,
    sign_out_count: AtomicU32,
}

impl MockSession {
    /// Starts in `loading`, like a real session framework.
    pub fn new() -> Self {
        Self::with_state(SessionState::loading())
    }

    pub fn with_state(state: SessionState) -> Self {
        let (state, _) = watch::channel(state);
        Self {
            state,
            sign_out_count: AtomicU32::new(0),
        }
    }

    pub fn set_state(&self, state: SessionState) {
        self.state.send_replace(state);
    }

    pub fn authenticate(&self, session: Session) {
        self.set_state(SessionState::authenticated(session));
    }

    pub fn sign_out_count(&self) -> u32 {
        self.sign_out_count.load(Ordering::SeqCst)
    }
}

impl Default for MockSession {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionProvider for MockSession {
    fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    async fn sign_out(&self) -> Result<()> {
        self.sign_out_count.fetch_add(1, Ordering::SeqCst);
        self.state.send_replace(SessionState::unauthenticated());
        Ok(())
    }
}
