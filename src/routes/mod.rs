//! Route access, guard decisions and navigation

pub mod access;
pub mod guard;
pub mod navigator;

pub use access::{
    describe, home_for, is_route_allowed, normalize_path, required_access, RouteAccess, COMPANY_HOME,
    EMPLOYEE_HOME, FORGOT_PASSWORD_ROUTE, LOGIN_ROUTE, REGISTER_ROUTE, SELECT_PLAN_ROUTE,
};
pub use guard::{decide, GuardDecision, GuardInput, Layout, RouteGuard};
pub use navigator::{HistoryNavigator, Navigator};
