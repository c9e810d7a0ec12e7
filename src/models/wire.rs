//! Request/response bodies of the portal REST API

use serde::{Deserialize, Serialize};

use super::{opt_string_or_number, string_or_number, CompanyRecord, Session, UserProfile, UserType};
use crate::error::{PortalError, Result};

/// Message the verification endpoint returns for a live token
pub const TOKEN_VALID_MSG: &str = "Token is valid";

/// Body of the OTP verification call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OtpLoginRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobile_no: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub otp: String,
    pub user_type: UserType,
}

impl OtpLoginRequest {
    pub fn with_email(email: impl Into<String>, otp: impl Into<String>, user_type: UserType) -> Self {
        Self {
            mobile_no: None,
            email: Some(email.into()),
            otp: otp.into(),
            user_type,
        }
    }

    pub fn with_mobile(
        mobile_no: impl Into<String>,
        otp: impl Into<String>,
        user_type: UserType,
    ) -> Self {
        Self {
            mobile_no: Some(mobile_no.into()),
            email: None,
            otp: otp.into(),
            user_type,
        }
    }

    /// Reject malformed form input before anything is sent.
    pub fn validate(&self) -> Result<()> {
        let email = self.email.as_deref().map(str::trim).filter(|s| !s.is_empty());
        let mobile = self.mobile_no.as_deref().map(str::trim).filter(|s| !s.is_empty());

        match (email, mobile) {
            (None, None) => {
                return Err(PortalError::InvalidInput(
                    "an email or mobile number is required".to_string(),
                ))
            }
            (Some(_), Some(_)) => {
                return Err(PortalError::InvalidInput(
                    "provide either an email or a mobile number, not both".to_string(),
                ))
            }
            (Some(email), None) => {
                let valid = email
                    .split_once('@')
                    .map(|(local, domain)| !local.is_empty() && domain.contains('.'))
                    .unwrap_or(false);
                if !valid {
                    return Err(PortalError::InvalidInput(format!(
                        "invalid email address: {}",
                        email
                    )));
                }
            }
            (None, Some(mobile)) => {
                let digits = mobile.trim_start_matches('+');
                if digits.len() < 7 || !digits.chars().all(|c| c.is_ascii_digit()) {
                    return Err(PortalError::InvalidInput(format!(
                        "invalid mobile number: {}",
                        mobile
                    )));
                }
            }
        }

        let otp = self.otp.trim();
        if !(4..=8).contains(&otp.len()) || !otp.chars().all(|c| c.is_ascii_digit()) {
            return Err(PortalError::InvalidInput(
                "OTP must be 4 to 8 digits".to_string(),
            ));
        }

        if self.user_type == UserType::Unknown {
            return Err(PortalError::InvalidInput(
                "user type must be employee or company".to_string(),
            ));
        }

        Ok(())
    }
}

/// User object of the OTP login response (snake_case on the wire)
#[derive(Debug, Clone, Deserialize)]
pub struct LoginUser {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub mobile_no: Option<String>,
    #[serde(rename = "type")]
    pub kind: UserType,
    #[serde(default, rename = "userType")]
    pub user_type: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub company_id: Option<String>,
}

impl From<LoginUser> for UserProfile {
    fn from(user: LoginUser) -> Self {
        Self {
            id: user.id,
            email: user.email,
            mobile_no: user.mobile_no,
            kind: user.kind,
            user_type: user.user_type,
            company_id: user.company_id,
        }
    }
}

/// Response of the OTP verification call
#[derive(Debug, Clone, Deserialize)]
pub struct OtpLoginResponse {
    pub code: i64,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub user: Option<LoginUser>,
    #[serde(default)]
    pub token: Option<String>,
}

impl OtpLoginResponse {
    /// Turn a successful login into a session.
    pub fn into_session(self) -> Result<Session> {
        if self.code != 200 {
            return Err(PortalError::OtpRejected(
                self.msg.unwrap_or_else(|| format!("code {}", self.code)),
            ));
        }
        let token = self
            .token
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| PortalError::InvalidResponse("login response without token".to_string()))?;
        let user = self
            .user
            .ok_or_else(|| PortalError::InvalidResponse("login response without user".to_string()))?;

        Ok(Session {
            access_token: token,
            user: user.into(),
        })
    }
}

/// Response of the token verification call
#[derive(Debug, Clone, Deserialize)]
pub struct TokenCheckResponse {
    pub code: i64,
    #[serde(default)]
    pub msg: Option<String>,
}

impl TokenCheckResponse {
    /// Code 200, and the message (when sent) must confirm validity.
    pub fn is_valid(&self) -> bool {
        self.code == 200
            && self
                .msg
                .as_deref()
                .map(|m| m.trim().eq_ignore_ascii_case(TOKEN_VALID_MSG))
                .unwrap_or(true)
    }
}

/// Response of the company fetch call
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompanyResponse {
    #[serde(default)]
    pub data: Vec<CompanyRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_login_request_serialization() {
        let req = OtpLoginRequest::with_email("ops@bluefin.example", "123456", UserType::Company);
        let body = serde_json::to_value(&req).unwrap();
        assert_eq!(
            body,
            json!({"email": "ops@bluefin.example", "otp": "123456", "user_type": "company"})
        );
    }

    #[test]
    fn test_login_request_validation() {
        assert!(OtpLoginRequest::with_email("ops@bluefin.example", "1234", UserType::Company)
            .validate()
            .is_ok());
        assert!(OtpLoginRequest::with_mobile("+4791234567", "99887766", UserType::Employee)
            .validate()
            .is_ok());

        let bad = [
            OtpLoginRequest::with_email("not-an-email", "1234", UserType::Company),
            OtpLoginRequest::with_mobile("12ab", "1234", UserType::Employee),
            OtpLoginRequest::with_email("ops@bluefin.example", "12", UserType::Company),
            OtpLoginRequest::with_email("ops@bluefin.example", "12a4", UserType::Company),
            OtpLoginRequest::with_email("ops@bluefin.example", "1234", UserType::Unknown),
            OtpLoginRequest {
                mobile_no: Some("+4791234567".into()),
                email: Some("ops@bluefin.example".into()),
                otp: "1234".into(),
                user_type: UserType::Employee,
            },
            OtpLoginRequest {
                mobile_no: None,
                email: Some("  ".into()),
                otp: "1234".into(),
                user_type: UserType::Employee,
            },
        ];
        for req in bad {
            let err = req.validate().unwrap_err();
            assert!(matches!(err, PortalError::InvalidInput(_)), "{:?}", req);
        }
    }

    #[test]
    fn test_login_response_into_session() {
        let resp: OtpLoginResponse = serde_json::from_value(json!({
            "code": 200,
            "token": "jwt-abc",
            "user": {"id": 17, "email": "ops@bluefin.example", "type": "company", "company_id": 42}
        }))
        .unwrap();
        let session = resp.into_session().unwrap();
        assert_eq!(session.access_token, "jwt-abc");
        assert_eq!(session.user.company(), Some("42"));
    }

    #[test]
    fn test_login_response_rejected() {
        let resp: OtpLoginResponse =
            serde_json::from_value(json!({"code": 400, "msg": "Invalid OTP"})).unwrap();
        match resp.into_session() {
            Err(PortalError::OtpRejected(msg)) => assert_eq!(msg, "Invalid OTP"),
            other => panic!("unexpected {:?}", other),
        }

        let resp: OtpLoginResponse = serde_json::from_value(json!({"code": 200})).unwrap();
        assert!(matches!(
            resp.into_session(),
            Err(PortalError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_token_check() {
        let ok = TokenCheckResponse { code: 200, msg: Some("Token is valid".into()) };
        let bare = TokenCheckResponse { code: 200, msg: None };
        let expired = TokenCheckResponse { code: 200, msg: Some("Token expired".into()) };
        let denied = TokenCheckResponse { code: 401, msg: Some("Token is valid".into()) };
        assert!(ok.is_valid());
        assert!(bare.is_valid());
        assert!(!expired.is_valid());
        assert!(!denied.is_valid());
    }
}
