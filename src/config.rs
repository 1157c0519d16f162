use dotenv::dotenv;
use std::env;

use crate::api_connection::{ApiConnectionError, Provider, ProviderKind};

pub const PROVIDER_ENV_VAR: &str = "MEAL_PLANNER_AI_PROVIDER";
pub const API_KEY_ENV_VAR: &str = "MEAL_PLANNER_AI_KEY";
pub const MODEL_ENV_VAR: &str = "MEAL_PLANNER_AI_MODEL";

/// AI extraction settings. Passed explicitly to whatever needs a provider.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AiSettings {
    pub provider: ProviderKind,
    pub api_key: String,
    pub model: Option<String>,
}

impl AiSettings {
    /// Read settings from the environment, loading `.env` first if present.
    /// Unset variables fall back to defaults; an unknown provider name is an
    /// error.
    pub fn from_env() -> Result<Self, ApiConnectionError> {
        dotenv().ok();
        let provider = match env::var(PROVIDER_ENV_VAR) {
            Ok(name) if !name.trim().is_empty() => name.parse()?,
            _ => ProviderKind::default(),
        };
        let api_key = env::var(API_KEY_ENV_VAR).unwrap_or_default();
        let model = env::var(MODEL_ENV_VAR)
            .ok()
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty());

        tracing::debug!(%provider, has_key = !api_key.trim().is_empty(), "loaded AI settings");
        Ok(Self {
            provider,
            api_key,
            model,
        })
    }

    pub fn effective_model(&self) -> &str {
        self.model
            .as_deref()
            .unwrap_or_else(|| self.provider.default_model())
    }

    pub fn has_ai(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    /// A ready provider, or `None` when no key is configured.
    pub fn provider(&self) -> Option<Provider> {
        self.has_ai().then(|| {
            Provider::new(
                self.provider,
                self.api_key.trim(),
                self.effective_model(),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = AiSettings::default();
        assert_eq!(settings.provider, ProviderKind::Anthropic);
        assert_eq!(settings.effective_model(), "claude-sonnet-4-20250514");
        assert!(!settings.has_ai());
        assert!(settings.provider().is_none());
    }

    #[test]
    fn test_configured_provider() {
        let settings = AiSettings {
            provider: ProviderKind::OpenRouter,
            api_key: " sk-or-123 ".to_string(),
            model: None,
        };
        assert!(settings.has_ai());
        let provider = settings.provider().unwrap();
        assert_eq!(provider.kind(), ProviderKind::OpenRouter);
        assert_eq!(provider.model(), "anthropic/claude-sonnet-4");

        let custom = AiSettings {
            model: Some("gpt-4.1".to_string()),
            provider: ProviderKind::OpenAi,
            ..settings
        };
        assert_eq!(custom.provider().unwrap().model(), "gpt-4.1");
    }

    #[test]
    fn test_provider_names_parse() {
        assert_eq!("OpenAI".parse::<ProviderKind>().unwrap(), ProviderKind::OpenAi);
        assert!(matches!(
            "gemini".parse::<ProviderKind>(),
            Err(ApiConnectionError::UnsupportedProvider(_))
        ));
    }
}
