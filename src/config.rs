// src/config.rs
use std::env;

/// Azure OpenAI connection settings, read once at startup.
///
/// Missing or blank values are kept as `None` so the relay can answer
/// every request with a configuration error instead of refusing to boot.
#[derive(Clone, Debug, Default)]
pub struct AzureAiConfig {
    pub endpoint: Option<String>,
    pub deployment_name: Option<String>,
}

impl AzureAiConfig {
    pub fn from_env() -> Self {
        Self {
            endpoint: read_setting("AZURE_AI_ENDPOINT"),
            deployment_name: read_setting("AZURE_AI_DEPLOYMENT_NAME"),
        }
    }

    pub fn new(endpoint: impl Into<String>, deployment_name: impl Into<String>) -> Self {
        Self {
            endpoint: Some(endpoint.into()),
            deployment_name: Some(deployment_name.into()),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.endpoint.is_some() && self.deployment_name.is_some()
    }
}

fn read_setting(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_config_is_complete() {
        let config = AzureAiConfig::new("https://example.openai.azure.com", "phi-4");
        assert!(config.is_complete());
        assert_eq!(config.endpoint.as_deref(), Some("https://example.openai.azure.com"));
    }

    #[test]
    fn default_config_is_incomplete() {
        let config = AzureAiConfig::default();
        assert!(!config.is_complete());
        assert!(config.endpoint.is_none());
        assert!(config.deployment_name.is_none());
    }
}
