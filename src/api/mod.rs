//! Portal REST API access

pub mod client;

pub use client::{ClientConfig, PortalClient, COMPANY_FETCH_PATH, OTP_LOGIN_PATH, VERIFY_TOKEN_PATH};
