//! Company subscription plan and usage counters

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// Active plan of a company, as embedded in the company record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    #[serde(default)]
    pub plan_name: String,
    #[serde(default)]
    pub plan_category: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    /// Team seats still available
    #[serde(default, deserialize_with = "lenient_count")]
    pub can_add_user: i64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub can_view_profile_per_week: i64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub remaining_profile_views: i64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub resume_download_per_week: i64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub remaining_resume_downloads: i64,
    #[serde(default)]
    pub company_list_placement: Option<String>,
}

impl Subscription {
    /// Current value of the counter tracked for `kind`
    pub fn counter(&self, kind: UsageKind) -> i64 {
        match kind {
            UsageKind::Downloads => self.remaining_resume_downloads,
            UsageKind::Views => self.remaining_profile_views,
            UsageKind::Teams => self.can_add_user,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status
            .as_deref()
            .map(|s| s.eq_ignore_ascii_case("active"))
            .unwrap_or(true)
    }
}

/// Counters consumed by company-side actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UsageKind {
    /// Resume downloads remaining this week
    Downloads,
    /// Candidate profile views remaining this week
    Views,
    /// Team seats remaining
    Teams,
}

impl fmt::Display for UsageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UsageKind::Downloads => write!(f, "downloads"),
            UsageKind::Views => write!(f, "views"),
            UsageKind::Teams => write!(f, "teams"),
        }
    }
}

impl std::str::FromStr for UsageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "downloads" | "download" | "resume" => Ok(UsageKind::Downloads),
            "views" | "view" | "profile" => Ok(UsageKind::Views),
            "teams" | "team" | "users" => Ok(UsageKind::Teams),
            other => Err(format!("unknown usage kind: {}", other)),
        }
    }
}

/// One entry of the company fetch `data` array
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompanyRecord {
    #[serde(default)]
    pub subscription: Option<Value>,
    #[serde(default)]
    pub admin_verify: Option<Value>,
    #[serde(default, rename = "companyLogo")]
    pub company_logo: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl CompanyRecord {
    /// Embedded subscription; `None` when missing, null or empty.
    ///
    /// Some backends wrap it in a one-element array.
    pub fn subscription(&self) -> Option<Subscription> {
        let value = match self.subscription.as_ref()? {
            Value::Array(items) => items.first()?,
            other => other,
        };
        match value {
            Value::Object(map) if map.is_empty() => None,
            Value::Object(_) => serde_json::from_value(value.clone()).ok(),
            _ => None,
        }
    }

    /// Whether an administrator has verified this company
    pub fn is_verified(&self) -> bool {
        match &self.admin_verify {
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_i64().map(|n| n != 0).unwrap_or(false),
            Some(Value::String(s)) => matches!(
                s.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "verified"
            ),
            _ => false,
        }
    }
}

fn lenient_count<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        Some(Value::Bool(b)) => i64::from(b),
        _ => 0,
    })
}
