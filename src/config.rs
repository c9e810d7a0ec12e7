//! Configuration for crewdeck
//!
//! CLI arguments and environment variable handling using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use crate::api::ClientConfig;
use crate::auth::SessionCookie;
use crate::error::{PortalError, Result};
use crate::models::{UsageKind, UserType};

const DEV_SESSION_SECRET: &str = "dev-only-insecure-session-secret";

/// Crewdeck - maritime job portal client
#[derive(Parser, Debug, Clone)]
#[command(name = "crewdeck")]
#[command(about = "Sign in to the crewdeck portal and inspect session, plan and route access")]
pub struct Args {
    /// Base URL of the portal API
    #[arg(long, env = "PORTAL_API_URL", default_value = "http://localhost:5000/api")]
    pub api_url: String,

    /// Production mode (secure session cookie, secret required)
    #[arg(long, env = "PORTAL_PRODUCTION", default_value = "false")]
    pub production: bool,

    /// Secret used to sign the session cookie (required in production)
    #[arg(long, env = "SESSION_SECRET")]
    pub session_secret: Option<String>,

    /// Session cookie lifetime in seconds
    #[arg(long, env = "SESSION_MAX_AGE_SECS", default_value = "2592000")]
    pub session_max_age_secs: u64,

    /// Directory holding the local auth record and session cookie
    #[arg(long, env = "CREWDECK_STATE_DIR", default_value = ".crewdeck")]
    pub state_dir: PathBuf,

    /// Request timeout in milliseconds
    #[arg(long, env = "REQUEST_TIMEOUT_MS", default_value = "15000")]
    pub request_timeout_ms: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON", default_value = "false")]
    pub log_json: bool,

    /// Append auth events as JSONL to this file
    #[arg(long, env = "AUTH_EVENT_LOG")]
    pub event_log: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Commands
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Sign in with a one-time password
    Login {
        /// Account email (exclusive with --mobile)
        #[arg(long)]
        email: Option<String>,
        /// Account mobile number (exclusive with --email)
        #[arg(long)]
        mobile: Option<String>,
        /// One-time password
        #[arg(long)]
        otp: String,
        /// Account type (employee, company)
        #[arg(long, default_value = "employee")]
        user_type: UserType,
    },

    /// Show the unified identity
    Status,

    /// Check the stored token against the server
    Validate,

    /// Sign out and clear the local record
    Logout,

    /// Show the company subscription
    Subscription,

    /// Refresh one usage counter (downloads, views, teams)
    Usage { kind: UsageKind },

    /// Decide what happens when opening a path
    Guard { path: String },
}

impl Args {
    /// Effective session secret (dev fallback outside production)
    pub fn session_secret(&self) -> Result<String> {
        match (&self.session_secret, self.production) {
            (Some(secret), _) => Ok(secret.clone()),
            (None, false) => Ok(DEV_SESSION_SECRET.to_string()),
            (None, true) => Err(PortalError::Config(
                "SESSION_SECRET is required in production mode".to_string(),
            )),
        }
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.api_url.clone(),
            timeout_ms: self.request_timeout_ms,
        }
    }

    pub fn cookie(&self) -> SessionCookie {
        SessionCookie::new(self.production)
    }

    pub fn session_max_age(&self) -> Duration {
        Duration::from_secs(self.session_max_age_secs)
    }

    /// Persisted auth record and cookie jar
    pub fn state_file(&self) -> PathBuf {
        self.state_dir.join("auth.json")
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.session_secret()?;

        if self.production {
            if let Some(secret) = &self.session_secret {
                if secret.len() < 32 {
                    return Err(PortalError::Config(
                        "SESSION_SECRET must be at least 32 bytes in production".to_string(),
                    ));
                }
            }
            if !self.api_url.starts_with("https://") {
                return Err(PortalError::Config(
                    "PORTAL_API_URL must use https in production".to_string(),
                ));
            }
        }

        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            return Err(PortalError::Config(format!("Invalid PORTAL_API_URL: {}", self.api_url)));
        }

        if self.session_max_age_secs == 0 {
            return Err(PortalError::Config(
                "SESSION_MAX_AGE_SECS must be greater than zero".to_string(),
            ));
        }

        if self.request_timeout_ms == 0 {
            return Err(PortalError::Config(
                "REQUEST_TIMEOUT_MS must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> Args {
        let mut argv = vec!["crewdeck"];
        argv.extend_from_slice(extra);
        argv.push("status");
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_dev_defaults() {
        let args = parse(&["--api-url", "http://localhost:5000/api"]);
        assert!(args.validate().is_ok());
        assert_eq!(args.session_secret().unwrap(), DEV_SESSION_SECRET);
        assert_eq!(args.state_file(), PathBuf::from(".crewdeck/auth.json"));
        assert!(matches!(args.command, Command::Status));
    }

    #[test]
    fn test_production_requires_secret() {
        let mut args = parse(&["--api-url", "https://api.crewdeck.example/api"]);
        args.production = true;
        args.session_secret = None;
        assert!(matches!(args.validate(), Err(PortalError::Config(_))));

        args.session_secret = Some("short".to_string());
        assert!(args.validate().is_err());

        args.session_secret = Some("x".repeat(32));
        assert!(args.validate().is_ok());
        assert!(args.cookie().name().starts_with("__Secure-"));
    }

    #[test]
    fn test_production_requires_https() {
        let mut args = parse(&["--api-url", "http://api.crewdeck.example/api"]);
        args.production = true;
        args.session_secret = Some("x".repeat(40));
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_subcommands_parse() {
        let args = Args::try_parse_from([
            "crewdeck", "login", "--email", "a@b.example", "--otp", "123456", "--user-type", "company",
        ])
        .unwrap();
        match args.command {
            Command::Login { email, otp, user_type, mobile } => {
                assert_eq!(email.as_deref(), Some("a@b.example"));
                assert!(mobile.is_none());
                assert_eq!(otp, "123456");
                assert_eq!(user_type, UserType::Company);
            }
            other => panic!("unexpected command {:?}", other),
        }

        let args = Args::try_parse_from(["crewdeck", "usage", "downloads"]).unwrap();
        assert!(matches!(args.command, Command::Usage { kind: UsageKind::Downloads }));

        assert!(Args::try_parse_from(["crewdeck", "usage", "coffee"]).is_err());
    }
}
