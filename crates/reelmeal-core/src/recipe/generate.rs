//! LLM-based recipe generation.
//!
//! Sends the transcript, post metadata and images to an OpenAI-compatible
//! chat-completions endpoint and asks for a schema-constrained JSON answer,
//! which is then parsed and validated into a [`StructuredRecipe`].

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use thiserror::Error;

use super::{StructuredRecipe, SYSTEM_PROMPT, build_user_prompt, recipe_json_schema};

const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("model returned no content")]
    EmptyResponse,

    #[error("model output is not a recipe: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("model output failed validation: {0}")]
    Invalid(String),
}

/// Everything the generator gets to look at.
#[derive(Debug, Clone, Copy)]
pub struct GenerationInput<'a> {
    pub transcript: &'a str,
    pub description: &'a str,
    pub post_url: &'a str,
    pub thumbnail: Option<&'a str>,
    pub extra_prompt: &'a str,
    pub tags: &'a [String],
    pub images: &'a [String],
}

#[async_trait]
pub trait RecipeGenerator: Send + Sync {
    async fn generate(
        &self,
        input: &GenerationInput<'_>,
    ) -> Result<StructuredRecipe, GenerateError>;
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Message {
    #[serde(default)]
    content: Option<String>,
}

/// Recipe generator backed by an OpenAI-compatible chat model
#[derive(Debug, Clone)]
pub struct OpenAiRecipeGenerator {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl OpenAiRecipeGenerator {
    pub fn new(client: reqwest::Client, base_url: &str, model: &str, api_key: &str) -> Self {
        Self {
            client,
            api_url: format!("{}/chat/completions", base_url.trim().trim_end_matches('/')),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }

    fn request_body(&self, input: &GenerationInput<'_>) -> Value {
        let mut content = vec![json!({
            "type": "text",
            "text": build_user_prompt(input),
        })];
        content.extend(
            input
                .images
                .iter()
                .map(|url| url.trim())
                .filter(|url| !url.is_empty())
                .map(|url| json!({ "type": "image_url", "image_url": { "url": url } })),
        );

        json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": content }
            ],
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": "recipe",
                    "strict": true,
                    "schema": recipe_json_schema()
                }
            }
        })
    }
}

#[async_trait]
impl RecipeGenerator for OpenAiRecipeGenerator {
    async fn generate(
        &self,
        input: &GenerationInput<'_>,
    ) -> Result<StructuredRecipe, GenerateError> {
        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&self.request_body(input))
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(GenerateError::Api { status, body });
        }

        let chat_response: ChatResponse = response.json().await?;
        let content = chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(GenerateError::EmptyResponse)?;

        parse_recipe(&content)
    }
}

/// Parse model output into a validated recipe.
///
/// Servers without structured-output support tend to wrap the JSON in a
/// markdown code fence, so one is stripped if present.
pub(crate) fn parse_recipe(content: &str) -> Result<StructuredRecipe, GenerateError> {
    let recipe: StructuredRecipe = serde_json::from_str(strip_code_fence(content))?;
    recipe.validate().map_err(GenerateError::Invalid)?;
    Ok(recipe)
}

fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening fence line
    let inner = inner.split_once('\n').map_or("", |(_, rest)| rest);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const RECIPE_JSON: &str = r#"{
        "name": "Garlic pasta",
        "image": "https://cdn/thumb.jpg",
        "url": "https://example.com/post/1",
        "description": "Quick pasta",
        "recipeIngredient": ["200g spaghetti"],
        "recipeInstructions": [{"text": "Boil the pasta"}],
        "keywords": ["dinner"]
    }"#;

    fn input<'a>(tags: &'a [String], images: &'a [String]) -> GenerationInput<'a> {
        GenerationInput {
            transcript: "Boil the pasta",
            description: "Pasta video",
            post_url: "https://example.com/post/1",
            thumbnail: Some("https://cdn/thumb.jpg"),
            extra_prompt: "",
            tags,
            images,
        }
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("  {\"a\":1} "), "{\"a\":1}");
    }

    #[test]
    fn test_parse_recipe_validates() {
        assert!(parse_recipe(RECIPE_JSON).is_ok());
        let empty = r#"{"name":"x","description":"","recipeIngredient":[],"recipeInstructions":[]}"#;
        assert!(matches!(parse_recipe(empty), Err(GenerateError::Invalid(_))));
        assert!(matches!(parse_recipe("not json"), Err(GenerateError::Parse(_))));
    }

    #[test]
    fn test_request_body_includes_images() {
        let generator = OpenAiRecipeGenerator::new(
            reqwest::Client::new(),
            "https://api.openai.com/v1/",
            "gpt-4o-mini",
            "sk-test",
        );
        assert_eq!(generator.api_url, "https://api.openai.com/v1/chat/completions");

        let images = vec!["https://cdn/1.jpg".to_string(), String::new()];
        let body = generator.request_body(&input(&[], &images));
        let content = body["messages"][1]["content"].as_array().unwrap();
        assert_eq!(content.len(), 2);
        assert_eq!(content[1]["image_url"]["url"], "https://cdn/1.jpg");
        assert_eq!(body["response_format"]["json_schema"]["strict"], true);
        assert_eq!(body["messages"][0]["content"], SYSTEM_PROMPT);
    }

    #[tokio::test]
    async fn test_generate_parses_first_choice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "role": "assistant", "content": RECIPE_JSON } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let generator = OpenAiRecipeGenerator::new(
            reqwest::Client::new(),
            &format!("{}/v1", server.uri()),
            "gpt-4o-mini",
            "sk-test",
        );
        let tags = vec!["dinner".to_string()];
        let recipe = generator.generate(&input(&tags, &[])).await.unwrap();
        assert_eq!(recipe.name, "Garlic pasta");
        assert_eq!(recipe.keywords, Some(vec!["dinner".to_string()]));
    }

    #[tokio::test]
    async fn test_generate_empty_choices() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
            .mount(&server)
            .await;

        let generator =
            OpenAiRecipeGenerator::new(reqwest::Client::new(), &server.uri(), "m", "k");
        let err = generator.generate(&input(&[], &[])).await.unwrap_err();
        assert!(matches!(err, GenerateError::EmptyResponse));
    }

    #[tokio::test]
    async fn test_generate_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;

        let generator =
            OpenAiRecipeGenerator::new(reqwest::Client::new(), &server.uri(), "m", "k");
        let err = generator.generate(&input(&[], &[])).await.unwrap_err();
        assert!(matches!(err, GenerateError::Api { status: 429, .. }));
    }
}
