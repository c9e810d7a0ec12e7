//! Auth event log
//!
//! Appends auth lifecycle events (logins, logouts, token checks, plan
//! redirects) to a JSONL file, one event per line.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::models::UserType;

/// Auth event types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuthEventType {
    /// Local record written by an explicit login
    Login,
    /// Session and local record destroyed
    Logout,
    /// Remote token check finished
    TokenValidated,
    /// Session mirrored into the local record
    SessionSynced,
    /// Company without a subscription sent to plan selection
    PlanRequired,
}

/// Why a logout happened
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LogoutReason {
    /// User asked for it
    Manual,
    /// Stored token failed validation on startup
    InvalidToken,
    /// An API call came back 401/403 and the token failed re-validation
    Unauthorized,
}

/// A single auth event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthEvent {
    pub timestamp: DateTime<Utc>,
    pub event_type: AuthEventType,
    /// Installation that produced the event
    pub client_id: String,
    pub user_id: Option<String>,
    pub user_type: Option<UserType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<LogoutReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl AuthEvent {
    pub fn new(event_type: AuthEventType, client_id: String) -> Self {
        Self {
            timestamp: Utc::now(),
            event_type,
            client_id,
            user_id: None,
            user_type: None,
            reason: None,
            metadata: None,
        }
    }

    pub fn with_user(mut self, user_id: &str, user_type: UserType) -> Self {
        self.user_id = Some(user_id.to_string());
        self.user_type = Some(user_type);
        self
    }

    pub fn with_reason(mut self, reason: LogoutReason) -> Self {
        self.reason = Some(reason);
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn to_jsonl(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Event logger writing JSONL; a no-op until [`init_file`](Self::init_file)
#[derive(Clone)]
pub struct AuthEventLogger {
    inner: Arc<Mutex<Option<BufWriter<File>>>>,
    client_id: String,
}

impl AuthEventLogger {
    pub fn new(client_id: String) -> Self {
        Self {
            inner: Arc::new(Mutex::new(None)),
            client_id,
        }
    }

    /// Start appending to `path`.
    pub async fn init_file(&self, path: PathBuf) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        *self.inner.lock().await = Some(BufWriter::new(file));
        info!("Auth event log initialized to {}", path.display());
        Ok(())
    }

    pub async fn log(&self, event: AuthEvent) {
        let line = match event.to_jsonl() {
            Ok(line) => line,
            Err(e) => {
                error!("Failed to serialize auth event: {}", e);
                return;
            }
        };

        let mut inner = self.inner.lock().await;
        if let Some(writer) = inner.as_mut() {
            if let Err(e) = writeln!(writer, "{}", line).and_then(|_| writer.flush()) {
                error!("Failed to write auth event: {}", e);
            }
        }
    }

    fn event(&self, event_type: AuthEventType) -> AuthEvent {
        AuthEvent::new(event_type, self.client_id.clone())
    }

    pub async fn log_login(&self, user_id: &str, user_type: UserType) {
        self.log(self.event(AuthEventType::Login).with_user(user_id, user_type))
            .await;
    }

    pub async fn log_logout(&self, reason: LogoutReason, user: Option<(&str, UserType)>) {
        let mut event = self.event(AuthEventType::Logout).with_reason(reason);
        if let Some((id, kind)) = user {
            event = event.with_user(id, kind);
        }
        self.log(event).await;
    }

    pub async fn log_token_validated(&self, valid: bool) {
        self.log(
            self.event(AuthEventType::TokenValidated)
                .with_metadata(serde_json::json!({ "valid": valid })),
        )
        .await;
    }

    pub async fn log_session_synced(&self, user_id: &str, user_type: UserType) {
        self.log(
            self.event(AuthEventType::SessionSynced)
                .with_user(user_id, user_type),
        )
        .await;
    }

    pub async fn log_plan_required(&self, company_id: &str) {
        self.log(
            self.event(AuthEventType::PlanRequired)
                .with_metadata(serde_json::json!({ "company_id": company_id })),
        )
        .await;
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = AuthEvent::new(AuthEventType::Logout, "client-1".to_string())
            .with_user("17", UserType::Company)
            .with_reason(LogoutReason::Unauthorized);

        let jsonl = event.to_jsonl().unwrap();
        assert!(jsonl.contains("\"logout\""));
        assert!(jsonl.contains("\"unauthorized\""));
        assert!(jsonl.contains("\"company\""));
    }

    #[test]
    fn test_reason_omitted_when_absent() {
        let event = AuthEvent::new(AuthEventType::Login, "client-1".to_string());
        let jsonl = event.to_jsonl().unwrap();
        assert!(!jsonl.contains("reason"));
        assert!(!jsonl.contains("metadata"));
    }

    #[tokio::test]
    async fn test_file_logging() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");

        let logger = AuthEventLogger::new("client-1".to_string());
        logger.log_login("5", UserType::Employee).await; // not initialised yet, dropped
        logger.init_file(path.clone()).await.unwrap();
        logger.log_login("5", UserType::Employee).await;
        logger.log_token_validated(false).await;

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: AuthEvent = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.event_type, AuthEventType::Login);
        assert!(lines[1].contains("\"valid\":false"));
    }
}
