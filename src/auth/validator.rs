//! Remote bearer token validation
//!
//! Fail-closed: anything other than an explicit "valid" answer from the
//! verification endpoint counts as an invalid token. No retries.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::api::PortalClient;

/// Decides whether a bearer token is currently accepted by the portal.
#[async_trait]
pub trait TokenValidator: Send + Sync {
    /// `false` for absent/empty tokens without touching the network.
    async fn validate(&self, token: Option<&str>) -> bool;
}

/// Validator backed by the portal's verification endpoint
#[derive(Clone)]
pub struct HttpTokenValidator {
    client: PortalClient,
}

impl HttpTokenValidator {
    pub fn new(client: PortalClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TokenValidator for HttpTokenValidator {
    async fn validate(&self, token: Option<&str>) -> bool {
        let Some(token) = token.filter(|t| !t.trim().is_empty()) else {
            debug!("No token to validate");
            return false;
        };

        match self.client.verify_token(token).await {
            Ok(check) if check.is_valid() => true,
            Ok(check) => {
                warn!(code = check.code, msg = ?check.msg, "Token rejected by portal");
                false
            }
            Err(e) => {
                warn!("Token validation failed, treating as invalid: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ClientConfig, VERIFY_TOKEN_PATH};
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn validator_for(base_url: String) -> HttpTokenValidator {
        HttpTokenValidator::new(
            PortalClient::new(ClientConfig {
                base_url,
                timeout_ms: 1_000,
            })
            .unwrap(),
        )
    }

    async fn server_answering(template: ResponseTemplate) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(VERIFY_TOKEN_PATH))
            .respond_with(template)
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn test_empty_token_skips_network() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let validator = validator_for(server.uri());
        assert!(!validator.validate(None).await);
        assert!(!validator.validate(Some("")).await);
        assert!(!validator.validate(Some("  ")).await);
    }

    #[tokio::test]
    async fn test_valid_token() {
        let server = server_answering(
            ResponseTemplate::new(200).set_body_json(json!({"code": 200, "msg": "Token is valid"})),
        )
        .await;
        assert!(validator_for(server.uri()).validate(Some("jwt-abc")).await);
    }

    #[tokio::test]
    async fn test_token_sent_unchanged() {
        let server = server_answering(
            ResponseTemplate::new(200).set_body_json(json!({"code": 200, "msg": "Token is valid"})),
        )
        .await;

        let validator = validator_for(server.uri());
        assert!(validator.validate(Some(" jwt-abc")).await);
        assert!(validator.validate(Some("jwt-abc")).await);

        let received = server.received_requests().await.unwrap();
        let sent: Vec<_> = received
            .iter()
            .map(|r| r.headers.get("authorization").unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(sent, vec!["Bearer  jwt-abc".to_string(), "Bearer jwt-abc".to_string()]);
    }

    #[tokio::test]
    async fn test_rejected_token() {
        let server = server_answering(
            ResponseTemplate::new(200).set_body_json(json!({"code": 401, "msg": "Token expired"})),
        )
        .await;
        assert!(!validator_for(server.uri()).validate(Some("jwt-abc")).await);
    }

    #[tokio::test]
    async fn test_http_errors_fail_closed() {
        for status in [401, 403, 500, 502] {
            let server = server_answering(ResponseTemplate::new(status)).await;
            assert!(
                !validator_for(server.uri()).validate(Some("jwt-abc")).await,
                "status {} must be invalid",
                status
            );
        }
    }

    #[tokio::test]
    async fn test_malformed_body_fails_closed() {
        let server =
            server_answering(ResponseTemplate::new(200).set_body_string("<html>oops</html>")).await;
        assert!(!validator_for(server.uri()).validate(Some("jwt-abc")).await);
    }

    #[tokio::test]
    async fn test_unreachable_server_fails_closed() {
        // Nothing listens on port 9 (discard) in the test environment.
        let validator = validator_for("http://127.0.0.1:9".to_string());
        assert!(!validator.validate(Some("jwt-abc")).await);
    }
}
