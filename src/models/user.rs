//! User profile, session and the locally persisted auth record

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{opt_string_or_number, string_or_number};

/// Which side of the portal an account belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    /// Seafarer / candidate looking for jobs
    Employee,
    /// Shipping company posting jobs
    Company,
    /// Anything the backend sends that we do not recognise
    #[serde(other)]
    Unknown,
}

impl UserType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserType::Employee => "employee",
            UserType::Company => "company",
            UserType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for UserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UserType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "employee" | "candidate" => Ok(UserType::Employee),
            "company" => Ok(UserType::Company),
            other => Err(format!("unknown user type: {}", other)),
        }
    }
}

/// The signed-in user, as carried by the session and the local record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mobile_no: Option<String>,
    #[serde(rename = "type")]
    pub kind: UserType,
    /// Secondary role label some endpoints attach (e.g. company sub-user)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_type: Option<String>,
    #[serde(
        default,
        deserialize_with = "opt_string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub company_id: Option<String>,
}

impl UserProfile {
    pub fn is_company(&self) -> bool {
        self.kind == UserType::Company
    }

    /// Company identifier, only for company accounts that carry one
    pub fn company(&self) -> Option<&str> {
        if self.is_company() {
            self.company_id.as_deref()
        } else {
            None
        }
    }
}

/// Session held by the session framework
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub access_token: String,
    pub user: UserProfile,
}

/// Token + user pair persisted independently of the session framework
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalAuthRecord {
    pub token: String,
    pub user: UserProfile,
}

impl LocalAuthRecord {
    /// Build a record; `None` when either half is missing.
    pub fn new(token: &str, user: Option<UserProfile>) -> Option<Self> {
        let token = token.trim();
        if token.is_empty() {
            return None;
        }
        let user = user.filter(|u| !u.id.is_empty())?;
        Some(Self {
            token: token.to_string(),
            user,
        })
    }
}

impl From<&Session> for LocalAuthRecord {
    fn from(session: &Session) -> Self {
        Self {
            token: session.access_token.clone(),
            user: session.user.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn company_user() -> UserProfile {
        UserProfile {
            id: "17".to_string(),
            email: Some("ops@bluefin.example".to_string()),
            mobile_no: None,
            kind: UserType::Company,
            user_type: None,
            company_id: Some("42".to_string()),
        }
    }

    #[test]
    fn test_profile_accepts_numeric_ids() {
        let json = r#"{"id": 17, "email": "ops@bluefin.example", "type": "company", "companyId": 42}"#;
        let user: UserProfile = serde_json::from_str(json).unwrap();
        assert_eq!(user, company_user());
        assert_eq!(user.company(), Some("42"));
    }

    #[test]
    fn test_employee_has_no_company() {
        let json = r#"{"id": "5", "mobileNo": "+4790000000", "type": "employee", "companyId": 9}"#;
        let user: UserProfile = serde_json::from_str(json).unwrap();
        assert_eq!(user.kind, UserType::Employee);
        assert_eq!(user.company(), None);
    }

    #[test]
    fn test_unknown_type() {
        let json = r#"{"id": "5", "type": "superuser"}"#;
        let user: UserProfile = serde_json::from_str(json).unwrap();
        assert_eq!(user.kind, UserType::Unknown);
    }

    #[test]
    fn test_record_requires_both_halves() {
        assert!(LocalAuthRecord::new("", Some(company_user())).is_none());
        assert!(LocalAuthRecord::new("   ", Some(company_user())).is_none());
        assert!(LocalAuthRecord::new("tok", None).is_none());

        let record = LocalAuthRecord::new("tok", Some(company_user())).unwrap();
        assert_eq!(record.token, "tok");
    }

    #[test]
    fn test_user_type_parse() {
        assert_eq!("Company".parse::<UserType>().unwrap(), UserType::Company);
        assert_eq!("candidate".parse::<UserType>().unwrap(), UserType::Employee);
        assert!("crew".parse::<UserType>().is_err());
    }
}
