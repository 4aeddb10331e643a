//! Mealie REST API client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE, REFERER, USER_AGENT};
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};

use super::{ImageAttachError, RecipeStore, StoreError};
use crate::recipe::{RecipeSlug, RecipeSummary, StructuredRecipe};
use crate::settings::MealieSettings;

const CREATE_TIMEOUT_SECS: u64 = 120;
const REQUEST_TIMEOUT_SECS: u64 = 30;

// Image hosts (Instagram's CDN in particular) answer 403 to non-browser clients
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const IMAGE_ACCEPT: &str = "image/webp,image/apng,image/*,*/*;q=0.8";
const IMAGE_REFERER: &str = "https://www.instagram.com/";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateRequest {
    include_tags: bool,
    /// The recipe as a JSON-LD string, not a nested object
    data: String,
}

#[derive(Deserialize)]
struct StoredRecipe {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MealieClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    group_name: String,
}

impl MealieClient {
    pub fn new(client: reqwest::Client, settings: &MealieSettings) -> Self {
        Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            group_name: settings.group_name.clone(),
        }
    }

    fn summary(&self, slug: &RecipeSlug, stored: StoredRecipe) -> RecipeSummary {
        RecipeSummary {
            name: stored.name.unwrap_or_default(),
            description: stored.description.unwrap_or_default(),
            image_url: format!(
                "{}/api/media/recipes/{}/images/original.webp",
                self.base_url, stored.id
            ),
            url: format!("{}/g/{}/r/{}", self.base_url, self.group_name, slug),
        }
    }

    fn timeout_error(&self, action: &'static str, e: reqwest::Error) -> StoreError {
        if e.is_timeout() {
            StoreError::Timeout {
                action,
                url: self.base_url.clone(),
            }
        } else {
            StoreError::Request(e)
        }
    }
}

#[async_trait]
impl RecipeStore for MealieClient {
    async fn create(&self, recipe: &StructuredRecipe) -> Result<RecipeSlug, StoreError> {
        let body = CreateRequest {
            include_tags: true,
            data: serde_json::to_string(recipe)?,
        };

        let response = self
            .client
            .post(format!("{}/api/recipes/create/html-or-json", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .timeout(Duration::from_secs(CREATE_TIMEOUT_SECS))
            .send()
            .await
            .map_err(|e| self.timeout_error("creating", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Mealie create failed: {} - {}", status, body);
            return Err(StoreError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let slug: String = response
            .json()
            .await
            .map_err(|e| self.timeout_error("creating", e))?;
        tracing::info!("Created Mealie recipe {}", slug);
        Ok(RecipeSlug::new(slug))
    }

    async fn get(&self, slug: &RecipeSlug) -> Result<RecipeSummary, StoreError> {
        let response = self
            .client
            .get(format!("{}/api/recipes/{}", self.base_url, slug))
            .bearer_auth(&self.api_key)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .send()
            .await
            .map_err(|e| self.timeout_error("fetching", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let stored: StoredRecipe = response
            .json()
            .await
            .map_err(|e| self.timeout_error("fetching", e))?;
        Ok(self.summary(slug, stored))
    }

    async fn attach_image(
        &self,
        slug: &RecipeSlug,
        image_url: &str,
    ) -> Result<(), ImageAttachError> {
        let image = self
            .client
            .get(image_url)
            .header(USER_AGENT, BROWSER_USER_AGENT)
            .header(ACCEPT, IMAGE_ACCEPT)
            .header(REFERER, IMAGE_REFERER)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .send()
            .await?;

        if !image.status().is_success() {
            return Err(ImageAttachError::Download {
                status: image.status().as_u16(),
            });
        }

        let content_type = image
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("image/jpeg")
            .to_string();
        let bytes = image.bytes().await?;
        let ext = image_extension(&content_type);

        let part = Part::bytes(bytes.to_vec())
            .file_name(format!("image.{ext}"))
            .mime_str(&content_type)?;
        let form = Form::new()
            .part("image", part)
            .text("extension", ext);

        let response = self
            .client
            .put(format!("{}/api/recipes/{}/image", self.base_url, slug))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ImageAttachError::Upload { status, body });
        }

        tracing::info!("Uploaded image for recipe {}", slug);
        Ok(())
    }
}

/// File extension Mealie should store the image under
fn image_extension(content_type: &str) -> &'static str {
    if content_type.contains("png") {
        "png"
    } else if content_type.contains("webp") {
        "webp"
    } else {
        "jpg"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipe::HowToStep;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    fn client_for(server: &MockServer) -> MealieClient {
        MealieClient::new(
            reqwest::Client::new(),
            &MealieSettings {
                base_url: server.uri(),
                api_key: "mealie-key".to_string(),
                group_name: "home".to_string(),
            },
        )
    }

    fn recipe() -> StructuredRecipe {
        let mut recipe = StructuredRecipe::new("Garlic pasta");
        recipe.ingredients = vec!["pasta".to_string()];
        recipe.instructions = vec![HowToStep::new("Boil")];
        recipe
    }

    #[test]
    fn test_image_extension() {
        assert_eq!(image_extension("image/png"), "png");
        assert_eq!(image_extension("image/webp"), "webp");
        assert_eq!(image_extension("image/jpeg"), "jpg");
        assert_eq!(image_extension("application/octet-stream"), "jpg");
    }

    #[tokio::test]
    async fn test_create_posts_recipe_as_string() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/recipes/create/html-or-json"))
            .and(header("authorization", "Bearer mealie-key"))
            .and(body_partial_json(json!({ "includeTags": true })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!("garlic-pasta")))
            .expect(1)
            .mount(&server)
            .await;

        let slug = client_for(&server).create(&recipe()).await.unwrap();
        assert_eq!(slug.as_str(), "garlic-pasta");

        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = requests[0].body_json().unwrap();
        let data: StructuredRecipe =
            serde_json::from_str(body["data"].as_str().unwrap()).unwrap();
        assert_eq!(data.name, "Garlic pasta");
    }

    #[tokio::test]
    async fn test_create_surfaces_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(422).set_body_string("bad recipe"))
            .mount(&server)
            .await;

        let err = client_for(&server).create(&recipe()).await.unwrap_err();
        assert!(matches!(err, StoreError::Api { status: 422, .. }));
    }

    #[tokio::test]
    async fn test_get_builds_summary_urls() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/recipes/garlic-pasta"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "abc-123",
                "slug": "garlic-pasta",
                "name": "Garlic pasta",
                "description": "Quick",
            })))
            .mount(&server)
            .await;

        let summary = client_for(&server)
            .get(&RecipeSlug::new("garlic-pasta"))
            .await
            .unwrap();
        assert_eq!(summary.name, "Garlic pasta");
        assert_eq!(
            summary.image_url,
            format!("{}/api/media/recipes/abc-123/images/original.webp", server.uri())
        );
        assert_eq!(summary.url, format!("{}/g/home/r/garlic-pasta", server.uri()));
    }

    #[tokio::test]
    async fn test_get_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("missing"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .get(&RecipeSlug::new("nope"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Api { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_attach_image_downloads_then_uploads() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cdn/thumb"))
            .and(header("referer", IMAGE_REFERER))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/png")
                    .set_body_bytes(vec![0x89, b'P', b'N', b'G']),
            )
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/api/recipes/garlic-pasta/image"))
            .and(header("authorization", "Bearer mealie-key"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server)
            .attach_image(
                &RecipeSlug::new("garlic-pasta"),
                &format!("{}/cdn/thumb", server.uri()),
            )
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        let upload: &Request = requests
            .iter()
            .find(|r| r.method.as_str() == "PUT")
            .unwrap();
        let body = String::from_utf8_lossy(&upload.body);
        assert!(body.contains("filename=\"image.png\""));
        assert!(body.contains("name=\"extension\""));
    }

    #[tokio::test]
    async fn test_attach_image_download_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = client_for(&server)
            .attach_image(
                &RecipeSlug::new("garlic-pasta"),
                &format!("{}/cdn/thumb", server.uri()),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ImageAttachError::Download { status: 403 }));
    }
}
