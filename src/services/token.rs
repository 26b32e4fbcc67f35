use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

/// Bearer credential for the completion service, fetched fresh per call.
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: String,
    /// Unix timestamp. Unused here since tokens are never cached, but part
    /// of what the identity endpoint hands back.
    pub expires_at: u64,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("network error: {0}")]
    Network(String),

    #[error("token request failed: {0}")]
    Failed(String),
}

/// Issues bearer tokens scoped to an audience.
///
/// The production implementation talks to the Azure Instance Metadata
/// Service; tests inject a fake.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn access_token(&self, scope: &str) -> Result<AccessToken, TokenError>;
}

const IMDS_TOKEN_URL: &str = "http://169.254.169.254/metadata/identity/oauth2/token";
const IMDS_API_VERSION: &str = "2018-02-01";

#[derive(Debug, Deserialize)]
struct ImdsTokenResponse {
    access_token: String,
    #[serde(default)]
    expires_on: Option<String>,
}

/// Managed-identity token source backed by the Azure IMDS endpoint.
pub struct ManagedIdentityProvider {
    http: Client,
}

impl ManagedIdentityProvider {
    pub fn new(http: Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl TokenProvider for ManagedIdentityProvider {
    async fn access_token(&self, scope: &str) -> Result<AccessToken, TokenError> {
        // IMDS takes the bare resource URI, not the ".default" scope form.
        let resource = scope.trim_end_matches("/.default");

        let response = self
            .http
            .get(IMDS_TOKEN_URL)
            .header("Metadata", "true")
            .query(&[("api-version", IMDS_API_VERSION), ("resource", resource)])
            .send()
            .await
            .map_err(|e| TokenError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TokenError::Failed(format!(
                "identity endpoint returned {}: {}",
                status, body
            )));
        }

        let payload: ImdsTokenResponse = response
            .json()
            .await
            .map_err(|e| TokenError::Failed(format!("invalid token response: {}", e)))?;

        let expires_at = payload
            .expires_on
            .as_deref()
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);

        Ok(AccessToken {
            token: payload.access_token,
            expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn imds_payload_parses_expiry() {
        let payload: ImdsTokenResponse =
            serde_json::from_str(r#"{"access_token":"abc","expires_on":"1754300000"}"#).unwrap();
        assert_eq!(payload.access_token, "abc");
        assert_eq!(payload.expires_on.as_deref(), Some("1754300000"));
    }

    #[test]
    fn imds_payload_tolerates_missing_expiry() {
        let payload: ImdsTokenResponse =
            serde_json::from_str(r#"{"access_token":"abc"}"#).unwrap();
        assert!(payload.expires_on.is_none());
    }
}
