//! Route guard and layout switcher

use serde::Serialize;
use std::sync::Mutex;
use tracing::debug;

use super::access::{home_for, is_route_allowed, required_access, RouteAccess, LOGIN_ROUTE};
use super::navigator::Navigator;
use crate::auth::UnifiedIdentity;
use crate::models::UserType;

/// Page chrome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    Dashboard,
    Public,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "action", content = "target")]
pub enum GuardDecision {
    /// Identity unresolved; render nothing
    Wait,
    Redirect(String),
    Render(Layout),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardInput {
    pub is_authenticated: bool,
    pub is_loading: bool,
    pub pathname: String,
    pub user_type: Option<UserType>,
}

impl GuardInput {
    pub fn from_identity(identity: &UnifiedIdentity, pathname: &str) -> Self {
        Self {
            is_authenticated: identity.is_authenticated,
            is_loading: identity.is_loading,
            pathname: pathname.to_string(),
            user_type: identity.user_type(),
        }
    }
}

/// Decide what to do with a navigation to `input.pathname`.
pub fn decide(input: &GuardInput) -> GuardDecision {
    if input.is_loading {
        return GuardDecision::Wait;
    }

    let access = required_access(&input.pathname);
    let user_type = input
        .is_authenticated
        .then(|| input.user_type.unwrap_or(UserType::Unknown));

    match access {
        RouteAccess::Open => GuardDecision::Render(Layout::Public),
        RouteAccess::AuthPage => match user_type {
            Some(kind) => GuardDecision::Redirect(home_for(kind).to_string()),
            None => GuardDecision::Render(Layout::Public),
        },
        RouteAccess::Company | RouteAccess::Employee => match user_type {
            None => GuardDecision::Redirect(LOGIN_ROUTE.to_string()),
            Some(kind) if is_route_allowed(access, Some(kind)) => {
                GuardDecision::Render(Layout::Dashboard)
            }
            Some(kind) => GuardDecision::Redirect(home_for(kind).to_string()),
        },
    }
}

/// Stateful guard: unchanged inputs never navigate twice.
#[derive(Debug, Default)]
pub struct RouteGuard {
    last: Mutex<Option<(GuardInput, GuardDecision)>>,
}

impl RouteGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn evaluate(&self, input: GuardInput, navigator: &dyn Navigator) -> GuardDecision {
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        if let Some((previous, decision)) = last.as_ref() {
            if *previous == input {
                return decision.clone();
            }
        }

        let decision = decide(&input);
        if let GuardDecision::Redirect(target) = &decision {
            debug!(from = %input.pathname, to = %target, "Guard redirect");
            navigator.redirect(target);
        }
        *last = Some((input, decision.clone()));
        decision
    }

    /// Forget the last evaluation.
    pub fn reset(&self) {
        *self.last.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::{HistoryNavigator, COMPANY_HOME, SELECT_PLAN_ROUTE};

    fn input(auth: bool, loading: bool, path: &str, kind: Option<UserType>) -> GuardInput {
        GuardInput {
            is_authenticated: auth,
            is_loading: loading,
            pathname: path.to_string(),
            user_type: kind,
        }
    }

    #[test]
    fn test_anonymous_on_dashboard_goes_to_login() {
        assert_eq!(
            decide(&input(false, false, "/company/dashboard", None)),
            GuardDecision::Redirect("/login".to_string())
        );
    }

    #[test]
    fn test_employee_kept_out_of_company_area() {
        let decision = decide(&input(true, false, "/company/dashboard", Some(UserType::Employee)));
        assert_eq!(decision, GuardDecision::Redirect("/".to_string()));
    }

    #[test]
    fn test_company_kept_out_of_employee_area() {
        let decision = decide(&input(true, false, "/employee/applied-jobs", Some(UserType::Company)));
        assert_eq!(decision, GuardDecision::Redirect(COMPANY_HOME.to_string()));
    }

    #[test]
    fn test_loading_waits() {
        for path in ["/", "/login", "/company/dashboard"] {
            assert_eq!(decide(&input(false, true, path, None)), GuardDecision::Wait);
            assert_eq!(
                decide(&input(true, true, path, Some(UserType::Company))),
                GuardDecision::Wait
            );
        }
    }

    #[test]
    fn test_signed_in_user_leaves_auth_pages() {
        assert_eq!(
            decide(&input(true, false, "/login", Some(UserType::Company))),
            GuardDecision::Redirect(COMPANY_HOME.to_string())
        );
        assert_eq!(
            decide(&input(true, false, "/register", Some(UserType::Employee))),
            GuardDecision::Redirect("/".to_string())
        );
        assert_eq!(
            decide(&input(false, false, "/login", None)),
            GuardDecision::Render(Layout::Public)
        );
    }

    #[test]
    fn test_layouts() {
        assert_eq!(
            decide(&input(true, false, SELECT_PLAN_ROUTE, Some(UserType::Company))),
            GuardDecision::Render(Layout::Dashboard)
        );
        assert_eq!(
            decide(&input(true, false, "/jobs", Some(UserType::Employee))),
            GuardDecision::Render(Layout::Public)
        );
        assert_eq!(
            decide(&input(false, false, "/news", None)),
            GuardDecision::Render(Layout::Public)
        );
    }

    #[test]
    fn test_repeated_evaluation_navigates_once() {
        let guard = RouteGuard::new();
        let nav = HistoryNavigator::new();
        let anon = input(false, false, "/company/dashboard", None);

        for _ in 0..3 {
            assert_eq!(
                guard.evaluate(anon.clone(), &nav),
                GuardDecision::Redirect(LOGIN_ROUTE.to_string())
            );
        }
        assert_eq!(nav.len(), 1);

        // New inputs navigate again.
        guard.evaluate(input(true, false, "/company/dashboard", Some(UserType::Employee)), &nav);
        assert_eq!(nav.history(), vec!["/login".to_string(), "/".to_string()]);

        guard.reset();
        guard.evaluate(anon, &nav);
        assert_eq!(nav.len(), 3);
    }
}
