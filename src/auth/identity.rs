//! Unified identity derivation
//!
//! The session framework and the local record are merged by an explicit,
//! ordered decision table. First matching row wins:
//!
//! | # | session status  | local record | initial load | result                   |
//! |---|-----------------|--------------|--------------|--------------------------|
//! | 1 | loading         | present      | any          | authenticated (local)    |
//! | 2 | authenticated   | any          | any          | authenticated (session)  |
//! | 3 | any             | present      | complete     | authenticated (local)    |
//! | 4 | any             | any          | any          | unauthenticated          |
//!
//! `is_loading` is `(loading && no local) || validating || !initial_load`.

use serde::Serialize;

use super::session::SessionStatus;
use crate::models::{LocalAuthRecord, Session, UserProfile, UserType};

/// Which row of the decision table produced an identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentitySource {
    /// Row 1: local record while the session framework re-hydrates
    LocalOptimistic,
    /// Row 2: session framework
    Session,
    /// Row 3: local record, session framework unavailable
    LocalFallback,
    /// Row 4
    Anonymous,
}

/// Inputs of the decision table
#[derive(Debug, Clone, Copy)]
pub struct IdentityInputs<'a> {
    pub session_status: SessionStatus,
    pub session: Option<&'a Session>,
    pub local: Option<&'a LocalAuthRecord>,
    pub initial_load_complete: bool,
    pub validating: bool,
}

/// Merged view of who is signed in
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnifiedIdentity {
    pub is_authenticated: bool,
    pub is_loading: bool,
    pub user: Option<UserProfile>,
    pub token: Option<String>,
    pub source: IdentitySource,
}

impl UnifiedIdentity {
    pub fn user_type(&self) -> Option<UserType> {
        self.user.as_ref().map(|u| u.kind)
    }

    /// Company id when the signed-in user is a company
    pub fn company_id(&self) -> Option<&str> {
        self.user.as_ref().and_then(UserProfile::company)
    }
}

/// Pick the decision table row.
pub fn resolve_source(
    status: SessionStatus,
    session_present: bool,
    local_present: bool,
    initial_load_complete: bool,
) -> IdentitySource {
    match (status, session_present, local_present, initial_load_complete) {
        (SessionStatus::Loading, _, true, _) => IdentitySource::LocalOptimistic,
        (SessionStatus::Authenticated, true, _, _) => IdentitySource::Session,
        (_, _, true, true) => IdentitySource::LocalFallback,
        _ => IdentitySource::Anonymous,
    }
}

/// Derive the unified identity.
pub fn derive_identity(inputs: IdentityInputs<'_>) -> UnifiedIdentity {
    let local = inputs.local.filter(|r| !r.token.is_empty());
    let session = inputs.session.filter(|s| !s.access_token.is_empty());

    let source = resolve_source(
        inputs.session_status,
        session.is_some(),
        local.is_some(),
        inputs.initial_load_complete,
    );

    let (user, token) = match source {
        IdentitySource::LocalOptimistic | IdentitySource::LocalFallback => match local {
            Some(r) => (Some(r.user.clone()), Some(r.token.clone())),
            None => (None, None),
        },
        IdentitySource::Session => match session {
            Some(s) => (Some(s.user.clone()), Some(s.access_token.clone())),
            None => (None, None),
        },
        IdentitySource::Anonymous => (None, None),
    };

    let is_loading = (inputs.session_status == SessionStatus::Loading && local.is_none())
        || inputs.validating
        || !inputs.initial_load_complete;

    UnifiedIdentity {
        is_authenticated: source != IdentitySource::Anonymous,
        is_loading,
        user,
        token,
        source,
    }
}
