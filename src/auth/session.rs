//! Session adapter
//!
//! The session framework keeps the signed-in user in an HTTP-only JWT cookie.
//! [`SessionProvider`] is the seam the auth context talks to; status changes
//! are published on a `watch` channel so the context can react to them.

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::auth::store::AuthStorage;
use crate::error::{PortalError, Result};
use crate::models::{Session, UserProfile};

/// Session framework status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Not resolved yet (cookie not read / hydration pending)
    Loading,
    Authenticated,
    Unauthenticated,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::Loading => write!(f, "loading"),
            SessionStatus::Authenticated => write!(f, "authenticated"),
            SessionStatus::Unauthenticated => write!(f, "unauthenticated"),
        }
    }
}

/// Status plus session object, published as one value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub status: SessionStatus,
    pub session: Option<Session>,
}

impl SessionState {
    pub fn loading() -> Self {
        Self {
            status: SessionStatus::Loading,
            session: None,
        }
    }

    pub fn unauthenticated() -> Self {
        Self {
            status: SessionStatus::Unauthenticated,
            session: None,
        }
    }

    pub fn authenticated(session: Session) -> Self {
        Self {
            status: SessionStatus::Authenticated,
            session: Some(session),
        }
    }
}

/// Wraps the session framework.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Current status and session
    fn snapshot(&self) -> SessionState;

    /// Receiver notified on every status/session change
    fn subscribe(&self) -> watch::Receiver<SessionState>;

    /// Destroy the session.
    async fn sign_out(&self) -> Result<()>;
}

/// Session cookie naming and attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionCookie {
    /// Production cookies get the `__Secure-` prefix and `Secure` attribute
    pub production: bool,
}

impl SessionCookie {
    const BASE_NAME: &'static str = "crewdeck.session-token";

    pub fn new(production: bool) -> Self {
        Self { production }
    }

    pub fn name(&self) -> String {
        if self.production {
            format!("__Secure-{}", Self::BASE_NAME)
        } else {
            Self::BASE_NAME.to_string()
        }
    }

    /// `Set-Cookie` header value carrying `value`
    pub fn header(&self, value: &str, max_age: Duration) -> String {
        let mut header = format!(
            "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
            self.name(),
            value,
            max_age.as_secs()
        );
        if self.production {
            header.push_str("; Secure");
        }
        header
    }

    /// `Set-Cookie` header value deleting the cookie
    pub fn clear_header(&self) -> String {
        let mut header = format!("{}=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax", self.name());
        if self.production {
            header.push_str("; Secure");
        }
        header
    }
}

/// JWT claims of the session cookie
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SessionClaims {
    sub: String,
    iat: i64,
    exp: i64,
    access_token: String,
    user: UserProfile,
}

/// Session framework backed by an HS256 JWT cookie.
///
/// Starts in `loading`. [`hydrate`](Self::hydrate) resolves it from a cookie
/// value, [`establish`](Self::establish) creates a session after OTP login.
/// When a cookie jar is attached the cookie value is kept there under the
/// cookie name.
pub struct JwtSessionProvider {
    cookie: SessionCookie,
    encoding: EncodingKey,
    decoding: DecodingKey,
    max_age: Duration,
    jar: Option<Arc<dyn AuthStorage>>,
    state: watch::Sender<SessionState>,
}

impl JwtSessionProvider {
    pub fn new(cookie: SessionCookie, secret: &str, max_age: Duration) -> Self {
        let (state, _) = watch::channel(SessionState::loading());
        Self {
            cookie,
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            max_age,
            jar: None,
            state,
        }
    }

    /// Keep the cookie value in `jar`.
    pub fn with_cookie_jar(mut self, jar: Arc<dyn AuthStorage>) -> Self {
        self.jar = Some(jar);
        self
    }

    pub fn cookie(&self) -> SessionCookie {
        self.cookie
    }

    fn issue(&self, session: &Session) -> Result<String> {
        let now = Utc::now().timestamp();
        let claims = SessionClaims {
            sub: session.user.id.clone(),
            iat: now,
            exp: now + self.max_age.as_secs() as i64,
            access_token: session.access_token.clone(),
            user: session.user.clone(),
        };
        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?)
    }

    fn read(&self, value: &str) -> Result<Session> {
        let data = decode::<SessionClaims>(value, &self.decoding, &Validation::new(Algorithm::HS256))?;
        let claims = data.claims;
        if claims.access_token.is_empty() {
            return Err(PortalError::Session("session without access token".to_string()));
        }
        Ok(Session {
            access_token: claims.access_token,
            user: claims.user,
        })
    }

    fn store_cookie(&self, value: Option<&str>) {
        let Some(jar) = &self.jar else { return };
        let name = self.cookie.name();
        let result = match value {
            Some(value) => jar.set_many(&[(name.as_str(), value)]),
            None => jar.remove_many(&[name.as_str()]),
        };
        if let Err(e) = result {
            warn!("Failed to update session cookie jar: {}", e);
        }
    }

    /// Create a session (after OTP verification) and return the
    /// `Set-Cookie` header for it.
    pub fn establish(&self, session: Session) -> Result<String> {
        let value = self.issue(&session)?;
        self.store_cookie(Some(&value));
        info!(user_id = %session.user.id, user_type = %session.user.kind, "Session established");
        self.state.send_replace(SessionState::authenticated(session));
        Ok(self.cookie.header(&value, self.max_age))
    }

    /// Resolve the loading state from a cookie value.
    pub fn hydrate(&self, cookie_value: Option<&str>) -> SessionStatus {
        let next = match cookie_value.filter(|v| !v.is_empty()) {
            Some(value) => match self.read(value) {
                Ok(session) => SessionState::authenticated(session),
                Err(e) => {
                    debug!("Session cookie rejected: {}", e);
                    self.store_cookie(None);
                    SessionState::unauthenticated()
                }
            },
            None => SessionState::unauthenticated(),
        };
        let status = next.status;
        self.state.send_replace(next);
        status
    }

    /// Resolve the loading state from the attached cookie jar.
    pub fn hydrate_from_jar(&self) -> Result<SessionStatus> {
        let value = match &self.jar {
            Some(jar) => jar.get(&self.cookie.name())?,
            None => None,
        };
        Ok(self.hydrate(value.as_deref()))
    }

    /// Re-issue the cookie with a fresh expiry. `None` when signed out.
    pub fn refresh(&self) -> Result<Option<String>> {
        let Some(session) = self.state.borrow().session.clone() else {
            return Ok(None);
        };
        let value = self.issue(&session)?;
        self.store_cookie(Some(&value));
        debug!(user_id = %session.user.id, "Session refreshed");
        Ok(Some(self.cookie.header(&value, self.max_age)))
    }
}

#[async_trait]
impl SessionProvider for JwtSessionProvider {
    fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    async fn sign_out(&self) -> Result<()> {
        self.store_cookie(None);
        self.state.send_replace(SessionState::unauthenticated());
        info!("Session signed out");
        Ok(())
    }
}
