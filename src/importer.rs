use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde::Serialize;
use std::future::Future;
use std::path::Path;
use thiserror::Error;

use crate::api_connection::{ApiConnectionError, ImageInput, Provider};
use crate::config::AiSettings;
use crate::models::ParsedRecipe;
use crate::recipe_parser::parse_recipe_text;
use crate::structured::ai_response::{strict_extraction_prompt, EXTRACTION_PROMPT};
use crate::structured::{extract_json_ld_from_html, from_ai_response};
use crate::text_cleanup::{clean_ocr_text, extract_text_from_html};

/// Longest text handed to a parser or an AI request.
pub const MAX_TEXT_CHARS: usize = 15_000;
/// Page text shorter than this is treated as a failed extraction.
pub const MIN_PAGE_TEXT_CHARS: usize = 20;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("nothing to import: the input is empty")]
    EmptyInput,
    #[error("image import needs an AI provider; configure an API key or import OCR text instead")]
    AiRequired,
    #[error("couldn't read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("unsupported image type: {0}")]
    UnsupportedImage(String),
    #[error("couldn't fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("couldn't fetch {url}: HTTP {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
    },
    #[error("could not extract meaningful text from the page; try pasting the recipe text instead")]
    NotEnoughText,
    #[error(transparent)]
    Api(#[from] ApiConnectionError),
    #[error("could not extract a valid recipe from the AI response; try again with clearer input")]
    UnrecognizedResponse,
}

/// Where a recipe comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportSource {
    Text(String),
    /// Raw output of an external OCR engine; cleaned before parsing.
    OcrText(String),
    Url(String),
    Images(Vec<ImageInput>),
}

/// Which extraction step produced a recipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportStrategy {
    JsonLd,
    Ai,
    AiStrictRetry,
    Local,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportOutcome {
    pub recipe: ParsedRecipe,
    pub strategy: ImportStrategy,
}

impl ImportOutcome {
    /// False when the recipe lacks ingredients or steps and deserves a
    /// second look before saving.
    pub fn is_complete(&self) -> bool {
        self.recipe.is_complete()
    }
}

/// Something that answers an extraction prompt with raw text.
pub trait ExtractionBackend {
    fn complete(
        &self,
        prompt: &str,
        text: Option<&str>,
        images: &[ImageInput],
    ) -> impl Future<Output = Result<String, ApiConnectionError>> + Send;
}

impl ExtractionBackend for Provider {
    fn complete(
        &self,
        prompt: &str,
        text: Option<&str>,
        images: &[ImageInput],
    ) -> impl Future<Output = Result<String, ApiConnectionError>> + Send {
        self.call_completion(prompt, text, images)
    }
}

/// Cut text to at most `MAX_TEXT_CHARS` characters.
pub fn truncate_text(text: &str) -> &str {
    match text.char_indices().nth(MAX_TEXT_CHARS) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Add `https://` to a bare host.
pub fn normalize_url(url: &str) -> String {
    let url = url.trim();
    let lower = url.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{}", url)
    }
}

fn media_type_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

/// Read an image file and encode it for an extraction request.
pub async fn load_image(path: impl AsRef<Path>) -> Result<ImageInput, ImportError> {
    let path = path.as_ref();
    let media_type = media_type_for(path)
        .ok_or_else(|| ImportError::UnsupportedImage(path.display().to_string()))?;
    let bytes = tokio::fs::read(path).await.map_err(|source| ImportError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(ImageInput {
        media_type: media_type.to_string(),
        base64_data: STANDARD.encode(bytes),
    })
}

/// Runs the extraction chain: structured data first, then the AI backend
/// when one is configured, then the local heuristic parser.
pub struct RecipeImporter<B = Provider> {
    backend: Option<B>,
    client: Client,
}

impl RecipeImporter<Provider> {
    pub fn from_settings(settings: &AiSettings) -> Self {
        Self::new(settings.provider())
    }
}

impl<B: ExtractionBackend> RecipeImporter<B> {
    pub fn new(backend: Option<B>) -> Self {
        Self {
            backend,
            client: Client::new(),
        }
    }

    pub fn has_ai(&self) -> bool {
        self.backend.is_some()
    }

    pub async fn import(
        &self,
        source: ImportSource,
        progress_updater: impl Fn(String),
    ) -> Result<ImportOutcome, ImportError> {
        match source {
            ImportSource::Text(text) => self.import_text(&text, &progress_updater).await,
            ImportSource::OcrText(text) => {
                progress_updater("Cleaning up OCR text...".to_string());
                self.import_text(&clean_ocr_text(&text), &progress_updater).await
            }
            ImportSource::Url(url) => self.import_url(&url, &progress_updater).await,
            ImportSource::Images(images) => self.import_images(&images, &progress_updater).await,
        }
    }

    async fn import_text(
        &self,
        text: &str,
        progress_updater: &impl Fn(String),
    ) -> Result<ImportOutcome, ImportError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ImportError::EmptyInput);
        }
        let text = truncate_text(text);

        if self.has_ai() {
            progress_updater("Sending text to AI...".to_string());
            self.extract_with_ai(Some(text), &[], progress_updater).await
        } else {
            progress_updater("Extracting recipe...".to_string());
            Ok(self.parse_locally(text))
        }
    }

    async fn import_images(
        &self,
        images: &[ImageInput],
        progress_updater: &impl Fn(String),
    ) -> Result<ImportOutcome, ImportError> {
        if images.is_empty() {
            return Err(ImportError::EmptyInput);
        }
        if !self.has_ai() {
            return Err(ImportError::AiRequired);
        }
        progress_updater(format!("Sending {} image(s) to AI...", images.len()));
        self.extract_with_ai(None, images, progress_updater).await
    }

    async fn import_url(
        &self,
        url: &str,
        progress_updater: &impl Fn(String),
    ) -> Result<ImportOutcome, ImportError> {
        if url.trim().is_empty() {
            return Err(ImportError::EmptyInput);
        }
        let url = normalize_url(url);
        progress_updater(format!("Fetching {}...", url));

        let fetch_error = |source| ImportError::Fetch {
            url: url.clone(),
            source,
        };
        let response = self.client.get(&url).send().await.map_err(fetch_error)?;
        let status = response.status();
        if !status.is_success() {
            tracing::warn!(%url, %status, "recipe page fetch failed");
            return Err(ImportError::HttpStatus {
                url: url.clone(),
                status,
            });
        }
        let html = response.text().await.map_err(fetch_error)?;
        self.import_html(&html, progress_updater).await
    }

    /// Import from an already-fetched HTML page.
    pub async fn import_html(
        &self,
        html: &str,
        progress_updater: &impl Fn(String),
    ) -> Result<ImportOutcome, ImportError> {
        if let Some(recipe) = extract_json_ld_from_html(html) {
            tracing::info!(name = %recipe.name, "recipe found in structured page data");
            progress_updater("Found structured recipe data!".to_string());
            return Ok(ImportOutcome {
                recipe,
                strategy: ImportStrategy::JsonLd,
            });
        }

        let text = extract_text_from_html(html);
        if text.chars().count() < MIN_PAGE_TEXT_CHARS {
            return Err(ImportError::NotEnoughText);
        }
        let text = truncate_text(&text);

        if self.has_ai() {
            progress_updater("No structured data found. Sending to AI...".to_string());
            self.extract_with_ai(Some(text), &[], progress_updater).await
        } else {
            progress_updater("No structured data found. Parsing page text...".to_string());
            Ok(self.parse_locally(text))
        }
    }

    fn parse_locally(&self, text: &str) -> ImportOutcome {
        let recipe = parse_recipe_text(text);
        tracing::info!(
            name = %recipe.name,
            ingredients = recipe.ingredients.len(),
            steps = recipe.steps.len(),
            "recipe parsed locally"
        );
        ImportOutcome {
            recipe,
            strategy: ImportStrategy::Local,
        }
    }

    async fn extract_with_ai(
        &self,
        text: Option<&str>,
        images: &[ImageInput],
        progress_updater: &impl Fn(String),
    ) -> Result<ImportOutcome, ImportError> {
        let backend = self.backend.as_ref().ok_or(ImportError::AiRequired)?;

        let reply = backend.complete(EXTRACTION_PROMPT, text, images).await?;
        if let Some(recipe) = from_ai_response(&reply) {
            tracing::info!(name = %recipe.name, "recipe extracted by AI");
            return Ok(ImportOutcome {
                recipe,
                strategy: ImportStrategy::Ai,
            });
        }

        tracing::warn!("AI reply held no recipe, retrying with the strict prompt");
        progress_updater("AI response was not valid JSON, retrying...".to_string());
        let reply = backend
            .complete(&strict_extraction_prompt(), text, images)
            .await?;
        match from_ai_response(&reply) {
            Some(recipe) => {
                tracing::info!(name = %recipe.name, "recipe extracted by AI on retry");
                Ok(ImportOutcome {
                    recipe,
                    strategy: ImportStrategy::AiStrictRetry,
                })
            }
            None => Err(ImportError::UnrecognizedResponse),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    #[derive(Default)]
    struct ScriptedBackend {
        replies: Mutex<VecDeque<String>>,
        prompts: Mutex<Vec<String>>,
        texts: Mutex<Vec<Option<String>>>,
    }

    impl ScriptedBackend {
        fn with_replies(replies: &[&str]) -> Self {
            Self {
                replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
                ..Default::default()
            }
        }
    }

    impl ExtractionBackend for ScriptedBackend {
        fn complete(
            &self,
            prompt: &str,
            text: Option<&str>,
            _images: &[ImageInput],
        ) -> impl Future<Output = Result<String, ApiConnectionError>> + Send {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.texts.lock().unwrap().push(text.map(str::to_string));
            let reply = self.replies.lock().unwrap().pop_front().unwrap_or_default();
            async move { Ok(reply) }
        }
    }

    const GOOD_REPLY: &str = r#"```json
{"name": "Pancakes", "category": "breakfast", "servings": 2,
 "ingredients": [{"qty": "1", "unit": "cup", "item": "flour", "category": "pantry"}],
 "steps": ["Mix.", "Fry."]}
```"#;

    fn offline() -> RecipeImporter<ScriptedBackend> {
        RecipeImporter::new(None)
    }

    fn with_ai(replies: &[&str]) -> RecipeImporter<ScriptedBackend> {
        RecipeImporter::new(Some(ScriptedBackend::with_replies(replies)))
    }

    fn prompts(importer: &RecipeImporter<ScriptedBackend>) -> Vec<String> {
        importer.backend.as_ref().unwrap().prompts.lock().unwrap().clone()
    }

    #[test]
    fn test_truncate_and_normalize() {
        let long = "é".repeat(MAX_TEXT_CHARS + 10);
        assert_eq!(truncate_text(&long).chars().count(), MAX_TEXT_CHARS);
        assert_eq!(truncate_text("short"), "short");

        assert_eq!(normalize_url(" example.com/pie "), "https://example.com/pie");
        assert_eq!(normalize_url("http://example.com"), "http://example.com");
        assert_eq!(normalize_url("HTTPS://example.com"), "HTTPS://example.com");
    }

    #[tokio::test]
    async fn test_text_without_ai_parses_locally() {
        let messages = RefCell::new(Vec::new());
        let outcome = offline()
            .import(
                ImportSource::Text("Toast\nIngredients\n2 slices bread\nSteps\nToast the bread.".into()),
                |m| messages.borrow_mut().push(m),
            )
            .await
            .unwrap();
        assert_eq!(outcome.strategy, ImportStrategy::Local);
        assert_eq!(outcome.recipe.name, "Toast");
        assert!(outcome.is_complete());
        assert_eq!(messages.borrow().as_slice(), ["Extracting recipe..."]);
    }

    #[tokio::test]
    async fn test_empty_text_is_rejected() {
        let err = offline()
            .import(ImportSource::Text("  \n ".into()), |_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, ImportError::EmptyInput));
    }

    #[tokio::test]
    async fn test_ocr_text_is_cleaned_before_parsing() {
        let outcome = offline()
            .import(
                ImportSource::OcrText("Ingredients\nl/2 cup milk\n\n\n\nx\n".into()),
                |_| {},
            )
            .await
            .unwrap();
        assert_eq!(outcome.recipe.ingredients[0].qty, "1/2");
        assert_eq!(outcome.recipe.ingredients[0].item, "milk");
    }

    #[tokio::test]
    async fn test_ai_first_attempt() {
        let importer = with_ai(&[GOOD_REPLY]);
        let outcome = importer
            .import(ImportSource::Text("pancake text".into()), |_| {})
            .await
            .unwrap();
        assert_eq!(outcome.strategy, ImportStrategy::Ai);
        assert_eq!(outcome.recipe.name, "Pancakes");
        assert_eq!(prompts(&importer), vec![EXTRACTION_PROMPT.to_string()]);
    }

    #[tokio::test]
    async fn test_ai_retries_once_with_strict_prompt() {
        let importer = with_ai(&["Sorry, I can't help with that.", GOOD_REPLY]);
        let outcome = importer
            .import(ImportSource::Text("pancake text".into()), |_| {})
            .await
            .unwrap();
        assert_eq!(outcome.strategy, ImportStrategy::AiStrictRetry);
        assert_eq!(
            prompts(&importer),
            vec![EXTRACTION_PROMPT.to_string(), strict_extraction_prompt()]
        );
    }

    #[tokio::test]
    async fn test_ai_gives_up_after_retry() {
        let importer = with_ai(&["nope", r#"{"name": ""}"#, GOOD_REPLY]);
        let err = importer
            .import(ImportSource::Text("pancake text".into()), |_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, ImportError::UnrecognizedResponse));
        assert_eq!(prompts(&importer).len(), 2);
    }

    #[tokio::test]
    async fn test_images_require_ai() {
        let image = ImageInput {
            media_type: "image/png".into(),
            base64_data: "AAAA".into(),
        };
        let err = offline()
            .import(ImportSource::Images(vec![image.clone()]), |_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, ImportError::AiRequired));

        let importer = with_ai(&[GOOD_REPLY]);
        let outcome = importer
            .import(ImportSource::Images(vec![image]), |_| {})
            .await
            .unwrap();
        assert_eq!(outcome.strategy, ImportStrategy::Ai);
        let texts = importer.backend.as_ref().unwrap().texts.lock().unwrap().clone();
        assert_eq!(texts, vec![None]);
    }

    #[tokio::test]
    async fn test_html_prefers_json_ld_over_ai() {
        let html = r#"<html><head><script type="application/ld+json">
            {"@context": "https://schema.org", "@type": "Recipe", "name": "Chili",
             "recipeIngredient": ["1 lb ground beef"], "recipeInstructions": "Brown the beef."}
            </script></head><body>ignored</body></html>"#;
        let importer = with_ai(&[GOOD_REPLY]);
        let outcome = importer.import_html(html, &|_: String| {}).await.unwrap();
        assert_eq!(outcome.strategy, ImportStrategy::JsonLd);
        assert_eq!(outcome.recipe.name, "Chili");
        assert!(prompts(&importer).is_empty());
    }

    #[tokio::test]
    async fn test_html_without_structured_data() {
        let html = "<html><head><title>Best Blog Ever</title></head><body><nav>Home</nav><h1>Lemonade</h1>\
            <h2>Ingredients</h2><ul><li>4 lemons</li><li>1 cup sugar</li></ul>\
            <h2>Instructions</h2><p>Squeeze the lemons and stir in the sugar.</p></body></html>";
        let outcome = offline().import_html(html, &|_: String| {}).await.unwrap();
        assert_eq!(outcome.strategy, ImportStrategy::Local);
        assert_eq!(outcome.recipe.name, "Lemonade");
        assert_eq!(outcome.recipe.ingredients.len(), 2);

        let importer = with_ai(&[GOOD_REPLY]);
        let outcome = importer.import_html(html, &|_: String| {}).await.unwrap();
        assert_eq!(outcome.strategy, ImportStrategy::Ai);
        let texts = importer.backend.as_ref().unwrap().texts.lock().unwrap().clone();
        assert!(texts[0].as_deref().unwrap().contains("4 lemons"));
        assert!(!texts[0].as_deref().unwrap().contains("Home"));
        assert!(!texts[0].as_deref().unwrap().contains("Best Blog Ever"));
    }

    #[tokio::test]
    async fn test_html_with_too_little_text() {
        let err = offline()
            .import_html("<html><body><p>Hi</p></body></html>", &|_: String| {})
            .await
            .unwrap_err();
        assert!(matches!(err, ImportError::NotEnoughText));
    }

    #[tokio::test]
    async fn test_load_image_encodes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("card.JPG");
        tokio::fs::write(&path, b"hello").await.unwrap();
        let image = load_image(&path).await.unwrap();
        assert_eq!(image.media_type, "image/jpeg");
        assert_eq!(image.base64_data, "aGVsbG8=");

        let err = load_image(dir.path().join("notes.txt")).await.unwrap_err();
        assert!(matches!(err, ImportError::UnsupportedImage(_)));
    }
}
