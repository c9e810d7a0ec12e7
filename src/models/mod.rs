//! Data model shared by the session, store and subscription layers
//!
//! - `user`: user profile, session and the persisted auth record
//! - `subscription`: company plan and usage counters
//! - `wire`: request/response bodies of the portal REST API

pub mod subscription;
pub mod user;
pub mod wire;

pub use subscription::{CompanyRecord, Subscription, UsageKind};
pub use user::{LocalAuthRecord, Session, UserProfile, UserType};
pub use wire::{CompanyResponse, LoginUser, OtpLoginRequest, OtpLoginResponse, TokenCheckResponse};

use serde::{Deserialize, Deserializer};

/// Backend ids arrive as strings or bare numbers depending on the table.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Int(i64),
    Float(f64),
}

impl From<RawId> for String {
    fn from(raw: RawId) -> Self {
        match raw {
            RawId::Text(s) => s,
            RawId::Int(i) => i.to_string(),
            RawId::Float(f) => f.to_string(),
        }
    }
}

pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    RawId::deserialize(deserializer).map(String::from)
}

pub(crate) fn opt_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<RawId>::deserialize(deserializer)?
        .map(String::from)
        .filter(|s| !s.is_empty()))
}
