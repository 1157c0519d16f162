use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::connection::ApiConnectionError;

pub const ANTHROPIC_MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
pub const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const OPENROUTER_CHAT_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
pub const OPENAI_MODELS_URL: &str = "https://api.openai.com/v1/models";
pub const OPENROUTER_MODELS_URL: &str = "https://openrouter.ai/api/v1/models";
pub const ANTHROPIC_VERSION: &str = "2023-06-01";
pub const MAX_OUTPUT_TOKENS: u32 = 4096;

/// Which AI vendor a request goes to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Anthropic,
    OpenAi,
    OpenRouter,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::OpenAi => "openai",
            ProviderKind::OpenRouter => "openrouter",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::Anthropic => "claude-sonnet-4-20250514",
            ProviderKind::OpenAi => "gpt-4o",
            ProviderKind::OpenRouter => "anthropic/claude-sonnet-4",
        }
    }

    pub fn completion_url(&self) -> &'static str {
        match self {
            ProviderKind::Anthropic => ANTHROPIC_MESSAGES_URL,
            ProviderKind::OpenAi => OPENAI_CHAT_URL,
            ProviderKind::OpenRouter => OPENROUTER_CHAT_URL,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = ApiConnectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "anthropic" => Ok(ProviderKind::Anthropic),
            "openai" => Ok(ProviderKind::OpenAi),
            "openrouter" => Ok(ProviderKind::OpenRouter),
            other => Err(ApiConnectionError::UnsupportedProvider(other.to_string())),
        }
    }
}

/// A configured AI endpoint: vendor, credentials and model in one value.
#[derive(Clone, Debug)]
pub enum Provider {
    Anthropic { api_key: String, model: String },
    OpenAi { api_key: String, model: String },
    OpenRouter { api_key: String, model: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableModel {
    pub id: String,
    pub name: String,
}

/// Anthropic exposes no model listing to API keys, so a fixed set is offered.
pub const ANTHROPIC_MODELS: &[(&str, &str)] = &[
    ("claude-sonnet-4-20250514", "Claude Sonnet 4"),
    ("claude-haiku-4-5-20251001", "Claude Haiku 4.5"),
    ("claude-opus-4-20250514", "Claude Opus 4"),
];

/// An image attached to an extraction request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageInput {
    pub media_type: String,
    pub base64_data: String,
}

// Anthropic Messages API

#[derive(Debug, Serialize, Clone)]
pub struct AnthropicRequest {
    pub model: String,
    pub max_tokens: u32,
    pub messages: Vec<AnthropicMessage>,
}

#[derive(Debug, Serialize, Clone)]
pub struct AnthropicMessage {
    pub role: String,
    pub content: Vec<AnthropicContent>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnthropicContent {
    Image { source: AnthropicImageSource },
    Text { text: String },
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct AnthropicImageSource {
    #[serde(rename = "type")]
    pub source_type: String,
    pub media_type: String,
    pub data: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AnthropicResponse {
    #[serde(default)]
    pub content: Vec<AnthropicResponseBlock>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AnthropicResponseBlock {
    #[serde(default)]
    pub text: Option<String>,
}

// OpenAI-compatible chat completions (OpenAI, OpenRouter)

#[derive(Debug, Serialize, Clone)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub max_completion_tokens: u32,
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize, Clone)]
pub struct ChatMessage {
    pub role: String,
    pub content: Vec<ChatContentPart>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatContentPart {
    ImageUrl { image_url: ImageUrl },
    Text { text: String },
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ImageUrl {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<ChatCompletionChoice>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChatCompletionChoice {
    pub message: ChatCompletionResponseMessage,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChatCompletionResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
}

// Model listing

#[derive(Debug, Deserialize, Clone)]
pub struct ModelListResponse {
    #[serde(default)]
    pub data: Vec<ModelListEntry>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelListEntry {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}
