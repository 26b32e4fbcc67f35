use std::sync::Arc;

use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info};

use crate::config::AzureAiConfig;
use crate::services::token::{TokenError, TokenProvider};

const API_VERSION: &str = "2024-10-21";
const SYSTEM_PROMPT: &str = "You are a helpful assistant for the Zava Storefront.";
const TOKEN_SCOPE: &str = "https://cognitiveservices.azure.com/.default";
const MAX_TOKENS: u32 = 800;
const TEMPERATURE: f64 = 0.7;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("AzureAI configuration is missing: {0}")]
    Configuration(String),

    #[error("AI service returned {status}: {reason}")]
    Upstream { status: u16, reason: String },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("token acquisition failed: {0}")]
    Token(#[from] TokenError),

    #[error("AI response contained no choices")]
    MalformedResponse,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    messages: Vec<OutboundMessage<'a>>,
    max_tokens: u32,
    temperature: f64,
}

#[derive(Debug, Serialize)]
struct OutboundMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<AssistantMessage>,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Forwards a user message to the configured Azure OpenAI deployment and
/// hands back the assistant's reply text. One attempt per call, no retries.
pub struct RelayClient {
    config: AzureAiConfig,
    http: Client,
    tokens: Arc<dyn TokenProvider>,
}

impl RelayClient {
    pub fn new(config: AzureAiConfig, http: Client, tokens: Arc<dyn TokenProvider>) -> Self {
        Self {
            config,
            http,
            tokens,
        }
    }

    pub async fn send_message(&self, user_message: &str) -> Result<String, RelayError> {
        let url = self.completion_url()?;

        let body = CompletionRequest {
            messages: vec![
                OutboundMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                OutboundMessage {
                    role: "user",
                    content: user_message,
                },
            ],
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        };

        let token = self.tokens.access_token(TOKEN_SCOPE).await?;

        info!("sending chat request to completion deployment");

        let response = self
            .http
            .post(url)
            .bearer_auth(&token.token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!(%status, body = %error_body, "AI endpoint returned an error");
            return Err(RelayError::Upstream {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("unknown").to_string(),
            });
        }

        let completion: CompletionResponse = response.json().await?;
        extract_reply(completion)
    }

    fn completion_url(&self) -> Result<Url, RelayError> {
        let endpoint = self
            .config
            .endpoint
            .as_deref()
            .ok_or_else(|| RelayError::Configuration("AZURE_AI_ENDPOINT is not set".to_string()))?;
        let deployment = self.config.deployment_name.as_deref().ok_or_else(|| {
            RelayError::Configuration("AZURE_AI_DEPLOYMENT_NAME is not set".to_string())
        })?;

        let mut url = Url::parse(endpoint.trim_end_matches('/')).map_err(|e| {
            RelayError::Configuration(format!("AZURE_AI_ENDPOINT is not a valid URL: {}", e))
        })?;

        {
            // push() percent-escapes the deployment name as a path segment
            let mut segments = url.path_segments_mut().map_err(|_| {
                RelayError::Configuration("AZURE_AI_ENDPOINT cannot be a base URL".to_string())
            })?;
            segments.pop_if_empty();
            segments.extend(["openai", "deployments", deployment, "chat", "completions"]);
        }
        url.set_query(Some(&format!("api-version={}", API_VERSION)));

        Ok(url)
    }
}

fn extract_reply(completion: CompletionResponse) -> Result<String, RelayError> {
    let choice = completion
        .choices
        .into_iter()
        .next()
        .ok_or(RelayError::MalformedResponse)?;

    Ok(choice
        .message
        .and_then(|m| m.content)
        .unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::token::AccessToken;
    use async_trait::async_trait;

    struct NoopTokens;

    #[async_trait]
    impl TokenProvider for NoopTokens {
        async fn access_token(&self, _scope: &str) -> Result<AccessToken, TokenError> {
            Ok(AccessToken {
                token: "noop".to_string(),
                expires_at: 0,
            })
        }
    }

    fn client_with(config: AzureAiConfig) -> RelayClient {
        RelayClient::new(config, Client::new(), Arc::new(NoopTokens))
    }

    #[test]
    fn completion_url_trims_trailing_slash_and_escapes_deployment() {
        let client = client_with(AzureAiConfig::new(
            "https://example.openai.azure.com/",
            "phi 4/eu",
        ));
        let url = client.completion_url().unwrap();
        assert_eq!(
            url.as_str(),
            "https://example.openai.azure.com/openai/deployments/phi%204%2Feu/chat/completions?api-version=2024-10-21"
        );
    }

    #[test]
    fn completion_url_requires_endpoint_and_deployment() {
        let client = client_with(AzureAiConfig::default());
        assert!(matches!(
            client.completion_url(),
            Err(RelayError::Configuration(_))
        ));

        let client = client_with(AzureAiConfig {
            endpoint: Some("https://example.openai.azure.com".to_string()),
            deployment_name: None,
        });
        assert!(matches!(
            client.completion_url(),
            Err(RelayError::Configuration(_))
        ));
    }

    #[test]
    fn completion_url_rejects_unparseable_endpoint() {
        let client = client_with(AzureAiConfig::new("not a url", "phi-4"));
        assert!(matches!(
            client.completion_url(),
            Err(RelayError::Configuration(_))
        ));
    }

    #[test]
    fn request_body_has_system_then_user_message() {
        let body = CompletionRequest {
            messages: vec![
                OutboundMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                OutboundMessage {
                    role: "user",
                    content: "  Hello  ",
                },
            ],
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        };

        let json = serde_json::to_value(&body).unwrap();
        let messages = json["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(
            messages[0]["content"],
            "You are a helpful assistant for the Zava Storefront."
        );
        assert_eq!(messages[1]["role"], "user");
        assert_eq!(messages[1]["content"], "  Hello  ");
        assert_eq!(json["max_tokens"], 800);
        assert_eq!(json["temperature"], 0.7);
    }

    #[test]
    fn extract_reply_returns_first_choice_content() {
        let completion: CompletionResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"content":"Hi there!"}},{"message":{"content":"ignored"}}]}"#,
        )
        .unwrap();
        assert_eq!(extract_reply(completion).unwrap(), "Hi there!");
    }

    #[test]
    fn extract_reply_defaults_missing_content_to_empty() {
        let completion: CompletionResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":null}}]}"#).unwrap();
        assert_eq!(extract_reply(completion).unwrap(), "");

        let completion: CompletionResponse =
            serde_json::from_str(r#"{"choices":[{}]}"#).unwrap();
        assert_eq!(extract_reply(completion).unwrap(), "");
    }

    #[test]
    fn extract_reply_rejects_empty_choices() {
        let completion: CompletionResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(matches!(
            extract_reply(completion),
            Err(RelayError::MalformedResponse)
        ));

        let completion: CompletionResponse = serde_json::from_str(r#"{}"#).unwrap();
        assert!(matches!(
            extract_reply(completion),
            Err(RelayError::MalformedResponse)
        ));
    }
}
