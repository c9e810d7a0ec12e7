//! Crewdeck - maritime job portal client
//!
//! Authentication and access control for the crewdeck portal: an OTP login
//! layered on a signed session cookie, a persisted local token record kept
//! in sync with it, and the route and subscription gates built on top.
//!
//! ## Components
//!
//! - **Token Validator**: fail-closed remote bearer token check
//! - **Local Auth Store**: persisted token + user record
//! - **Session**: JWT cookie session framework with a status channel
//! - **Auth Context**: merges both into one identity, owns logout
//! - **Subscription Context**: company plan and usage counters
//! - **Route Guard**: redirect and layout decisions per path

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod routes;
pub mod subscription;

pub use api::{ClientConfig, PortalClient};
pub use auth::{AuthContext, UnifiedIdentity};
pub use config::Args;
pub use error::{ErrorClass, PortalError, Result};
pub use subscription::SubscriptionContext;

/// Version string with build metadata
pub fn version() -> String {
    format!(
        "{} ({} built {})",
        env!("CARGO_PKG_VERSION"),
        option_env!("GIT_COMMIT_SHORT").unwrap_or("unknown"),
        option_env!("BUILD_TIMESTAMP").unwrap_or("unknown"),
    )
}
