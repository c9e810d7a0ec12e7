//! Route classes and who may open them

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::UserType;

pub const LOGIN_ROUTE: &str = "/login";
pub const REGISTER_ROUTE: &str = "/register";
pub const FORGOT_PASSWORD_ROUTE: &str = "/forgot-password";
pub const SELECT_PLAN_ROUTE: &str = "/company/select-plan";
pub const COMPANY_HOME: &str = "/company/dashboard";
pub const EMPLOYEE_HOME: &str = "/";

/// Access class of a route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RouteAccess {
    /// Marketing, news, job search - anyone, no redirects
    Open,
    /// Login/register/forgot-password - signed-out users only
    AuthPage,
    /// Company dashboard area
    Company,
    /// Candidate area (profile, applications)
    Employee,
}

impl fmt::Display for RouteAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteAccess::Open => write!(f, "OPEN"),
            RouteAccess::AuthPage => write!(f, "AUTH_PAGE"),
            RouteAccess::Company => write!(f, "COMPANY"),
            RouteAccess::Employee => write!(f, "EMPLOYEE"),
        }
    }
}

impl RouteAccess {
    /// Needs a signed-in user
    pub fn is_protected(&self) -> bool {
        matches!(self, RouteAccess::Company | RouteAccess::Employee)
    }
}

/// `/company/jobs/?tab=1#x` -> `/company/jobs`
pub fn normalize_path(pathname: &str) -> &str {
    let end = pathname.find(['?', '#']).unwrap_or(pathname.len());
    let path = &pathname[..end];
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/"
    } else {
        trimmed
    }
}

fn under(path: &str, root: &str) -> bool {
    path == root
        || path
            .strip_prefix(root)
            .map(|rest| rest.starts_with('/'))
            .unwrap_or(false)
}

/// Classify a pathname.
pub fn required_access(pathname: &str) -> RouteAccess {
    let path = normalize_path(pathname);

    if [LOGIN_ROUTE, REGISTER_ROUTE, FORGOT_PASSWORD_ROUTE]
        .iter()
        .any(|root| under(path, root))
    {
        return RouteAccess::AuthPage;
    }

    if under(path, "/company") {
        return RouteAccess::Company;
    }

    if under(path, "/employee") {
        return RouteAccess::Employee;
    }

    RouteAccess::Open
}

/// Whether a user of `user_type` may open a route of class `access`.
pub fn is_route_allowed(access: RouteAccess, user_type: Option<UserType>) -> bool {
    match access {
        RouteAccess::Open => true,
        RouteAccess::AuthPage => user_type.is_none(),
        RouteAccess::Company => user_type == Some(UserType::Company),
        RouteAccess::Employee => user_type == Some(UserType::Employee),
    }
}

/// Landing route for a signed-in user
pub fn home_for(user_type: UserType) -> &'static str {
    match user_type {
        UserType::Company => COMPANY_HOME,
        UserType::Employee | UserType::Unknown => EMPLOYEE_HOME,
    }
}

/// Human-readable description of a route class for logging
pub fn describe(access: RouteAccess) -> &'static str {
    match access {
        RouteAccess::Open => "Public page",
        RouteAccess::AuthPage => "Sign-in page",
        RouteAccess::Company => "Company dashboard",
        RouteAccess::Employee => "Candidate area",
    }
}
