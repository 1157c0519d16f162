use regex::Regex;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::LazyLock;
use thiserror::Error;

use super::endpoints::{
    AnthropicContent, AnthropicImageSource, AnthropicMessage, AnthropicRequest,
    AnthropicResponse, AvailableModel, ChatCompletionRequest, ChatCompletionResponse,
    ChatContentPart, ChatMessage, ImageInput, ImageUrl, ModelListEntry, ModelListResponse,
    Provider, ProviderKind, ANTHROPIC_MODELS, ANTHROPIC_VERSION, MAX_OUTPUT_TOKENS,
    OPENAI_MODELS_URL, OPENROUTER_MODELS_URL,
};

const APP_TITLE: &str = "Meal Planner";

#[derive(Debug, Error)]
pub enum ApiConnectionError {
    #[error("no API key configured for {0}")]
    MissingApiKey(String),
    #[error("network error: {0}")]
    NetworkError(#[from] reqwest::Error),
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("API error {status}: {error_body}")]
    ApiError {
        status: reqwest::StatusCode,
        error_body: String,
    },
    #[error("unsupported provider: {0}")]
    UnsupportedProvider(String),
}

static OPENAI_CHAT_MODEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:gpt-|o1|o3|chatgpt)").expect("valid model regex"));
static OPENAI_EXCLUDED_MODEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"instruct|realtime|audio|search").expect("valid model regex"));

/// The user message text: the prompt plus either the recipe text or a
/// pointer to the attached images.
pub fn user_payload(prompt: &str, text: Option<&str>, has_images: bool) -> String {
    match text.filter(|t| !t.is_empty()) {
        Some(text) => format!("{}\n\nHere is the recipe text to extract:\n\n{}", prompt, text),
        None if has_images => format!("{}\n\nExtract the recipe from the image(s) above.", prompt),
        None => prompt.to_string(),
    }
}

/// Most useful message in a provider error body: `error.message`, then
/// `error.type`, then the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            let error = v.get("error")?;
            error
                .get("message")
                .or_else(|| error.get("type"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.to_string())
}

pub fn filter_openai_models(entries: Vec<ModelListEntry>) -> Vec<AvailableModel> {
    let mut models: Vec<AvailableModel> = entries
        .into_iter()
        .filter(|m| OPENAI_CHAT_MODEL.is_match(&m.id) && !OPENAI_EXCLUDED_MODEL.is_match(&m.id))
        .map(|m| AvailableModel {
            name: m.id.clone(),
            id: m.id,
        })
        .collect();
    models.sort_by(|a, b| a.id.cmp(&b.id));
    models
}

pub fn sort_openrouter_models(entries: Vec<ModelListEntry>) -> Vec<AvailableModel> {
    let mut models: Vec<AvailableModel> = entries
        .into_iter()
        .map(|m| AvailableModel {
            name: m.name.filter(|n| !n.is_empty()).unwrap_or_else(|| m.id.clone()),
            id: m.id,
        })
        .collect();
    models.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    models
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiConnectionError> {
    let status = response.status();
    let body = response.text().await?;
    if status.is_success() {
        Ok(serde_json::from_str(&body)?)
    } else {
        Err(ApiConnectionError::ApiError {
            status,
            error_body: error_message(&body),
        })
    }
}

impl Provider {
    pub fn new(kind: ProviderKind, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let api_key = api_key.into();
        let model = model.into();
        match kind {
            ProviderKind::Anthropic => Provider::Anthropic { api_key, model },
            ProviderKind::OpenAi => Provider::OpenAi { api_key, model },
            ProviderKind::OpenRouter => Provider::OpenRouter { api_key, model },
        }
    }

    pub fn kind(&self) -> ProviderKind {
        match self {
            Provider::Anthropic { .. } => ProviderKind::Anthropic,
            Provider::OpenAi { .. } => ProviderKind::OpenAi,
            Provider::OpenRouter { .. } => ProviderKind::OpenRouter,
        }
    }

    pub fn model(&self) -> &str {
        match self {
            Provider::Anthropic { model, .. }
            | Provider::OpenAi { model, .. }
            | Provider::OpenRouter { model, .. } => model,
        }
    }

    fn api_key(&self) -> Result<&str, ApiConnectionError> {
        let key = match self {
            Provider::Anthropic { api_key, .. }
            | Provider::OpenAi { api_key, .. }
            | Provider::OpenRouter { api_key, .. } => api_key.trim(),
        };
        if key.is_empty() {
            Err(ApiConnectionError::MissingApiKey(self.kind().to_string()))
        } else {
            Ok(key)
        }
    }

    /// JSON body of an extraction request in this provider's format.
    pub fn build_request_body(
        &self,
        prompt: &str,
        text: Option<&str>,
        images: &[ImageInput],
    ) -> Result<Value, ApiConnectionError> {
        let payload = user_payload(prompt, text, !images.is_empty());
        let body = match self {
            Provider::Anthropic { model, .. } => {
                let mut content: Vec<AnthropicContent> = images
                    .iter()
                    .map(|img| AnthropicContent::Image {
                        source: AnthropicImageSource {
                            source_type: "base64".to_string(),
                            media_type: img.media_type.clone(),
                            data: img.base64_data.clone(),
                        },
                    })
                    .collect();
                content.push(AnthropicContent::Text { text: payload });
                serde_json::to_value(AnthropicRequest {
                    model: model.clone(),
                    max_tokens: MAX_OUTPUT_TOKENS,
                    messages: vec![AnthropicMessage {
                        role: "user".to_string(),
                        content,
                    }],
                })?
            }
            Provider::OpenAi { model, .. } | Provider::OpenRouter { model, .. } => {
                let mut content: Vec<ChatContentPart> = images
                    .iter()
                    .map(|img| ChatContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: format!("data:{};base64,{}", img.media_type, img.base64_data),
                        },
                    })
                    .collect();
                content.push(ChatContentPart::Text { text: payload });
                serde_json::to_value(ChatCompletionRequest {
                    model: model.clone(),
                    max_completion_tokens: MAX_OUTPUT_TOKENS,
                    messages: vec![ChatMessage {
                        role: "user".to_string(),
                        content,
                    }],
                })?
            }
        };
        Ok(body)
    }

    /// Pull the reply text out of a successful response body. A reply
    /// without text yields an empty string.
    pub fn extract_response_text(&self, body: &str) -> Result<String, ApiConnectionError> {
        let text = match self {
            Provider::Anthropic { .. } => {
                let response: AnthropicResponse = serde_json::from_str(body)?;
                response.content.into_iter().next().and_then(|block| block.text)
            }
            Provider::OpenAi { .. } | Provider::OpenRouter { .. } => {
                let response: ChatCompletionResponse = serde_json::from_str(body)?;
                response.choices.into_iter().next().and_then(|c| c.message.content)
            }
        };
        Ok(text.unwrap_or_default())
    }

    /// Send one extraction request and return the raw reply text.
    pub async fn call_completion(
        &self,
        prompt: &str,
        text: Option<&str>,
        images: &[ImageInput],
    ) -> Result<String, ApiConnectionError> {
        let api_key = self.api_key()?;
        let body = self.build_request_body(prompt, text, images)?;

        let client = Client::new();
        let request = client.post(self.kind().completion_url()).json(&body);
        let request = match self {
            Provider::Anthropic { .. } => request
                .header("x-api-key", api_key)
                .header("anthropic-version", ANTHROPIC_VERSION),
            Provider::OpenAi { .. } => request.bearer_auth(api_key),
            Provider::OpenRouter { .. } => request.bearer_auth(api_key).header("X-Title", APP_TITLE),
        };

        tracing::debug!(provider = %self.kind(), model = self.model(), images = images.len(), "sending extraction request");
        let response = request.send().await?;
        let status = response.status();
        let raw = response.text().await?;

        if !status.is_success() {
            tracing::warn!(provider = %self.kind(), %status, "extraction request failed");
            return Err(ApiConnectionError::ApiError {
                status,
                error_body: error_message(&raw),
            });
        }
        self.extract_response_text(&raw)
    }

    /// Models the user can pick for this provider.
    pub async fn list_models(&self) -> Result<Vec<AvailableModel>, ApiConnectionError> {
        if let Provider::Anthropic { .. } = self {
            return Ok(ANTHROPIC_MODELS
                .iter()
                .map(|(id, name)| AvailableModel {
                    id: id.to_string(),
                    name: name.to_string(),
                })
                .collect());
        }

        let api_key = self.api_key()?;
        let url = match self {
            Provider::OpenAi { .. } => OPENAI_MODELS_URL,
            _ => OPENROUTER_MODELS_URL,
        };
        let response = Client::new().get(url).bearer_auth(api_key).send().await?;
        let listing: ModelListResponse = read_json(response).await?;

        Ok(match self {
            Provider::OpenAi { .. } => filter_openai_models(listing.data),
            _ => sort_openrouter_models(listing.data),
        })
    }
}
