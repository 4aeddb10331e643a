//! Recipe data model: the schema.org object produced by generation and the
//! summary returned to callers.

mod generate;
mod prompt;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use generate::{GenerateError, GenerationInput, OpenAiRecipeGenerator, RecipeGenerator};
pub(crate) use prompt::{SYSTEM_PROMPT, build_user_prompt, recipe_json_schema};

const SCHEMA_ORG: &str = "https://schema.org";
const RECIPE_TYPE: &str = "Recipe";
const HOW_TO_STEP_TYPE: &str = "HowToStep";

fn schema_org() -> String {
    SCHEMA_ORG.to_string()
}

fn recipe_type() -> String {
    RECIPE_TYPE.to_string()
}

fn how_to_step_type() -> String {
    HOW_TO_STEP_TYPE.to_string()
}

/// A schema.org `Recipe` in JSON-LD form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredRecipe {
    #[serde(rename = "@context", default = "schema_org")]
    pub context: String,
    #[serde(rename = "@type", default = "recipe_type")]
    pub kind: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "recipeIngredient")]
    pub ingredients: Vec<String>,
    #[serde(rename = "recipeInstructions")]
    pub instructions: Vec<HowToStep>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HowToStep {
    #[serde(rename = "@type", default = "how_to_step_type")]
    pub kind: String,
    pub text: String,
}

impl HowToStep {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            kind: how_to_step_type(),
            text: text.into(),
        }
    }
}

impl StructuredRecipe {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            context: schema_org(),
            kind: recipe_type(),
            name: name.into(),
            image: None,
            url: None,
            description: String::new(),
            ingredients: Vec::new(),
            instructions: Vec::new(),
            keywords: None,
        }
    }

    /// Check the shape the store needs before anything is persisted.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("recipe has no name".to_string());
        }
        if !self.ingredients.iter().any(|i| !i.trim().is_empty()) {
            return Err("recipe has no ingredients".to_string());
        }
        if !self.instructions.iter().any(|s| !s.text.trim().is_empty()) {
            return Err("recipe has no instructions".to_string());
        }
        Ok(())
    }

    pub fn has_image(&self) -> bool {
        self.image.as_deref().is_some_and(|i| !i.trim().is_empty())
    }
}

/// How the post thumbnail ends up on the stored recipe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ImagePolicy {
    /// Put the thumbnail URL into the recipe's `image` field and let the store fetch it
    Embed,
    /// Strip `image`, then download the thumbnail and upload it as an attachment
    #[default]
    Upload,
}

impl ImagePolicy {
    /// Apply the policy to a freshly generated recipe.
    ///
    /// Returns the URL that still has to be attached after persistence, if any.
    pub fn apply(self, recipe: &mut StructuredRecipe, thumbnail: Option<&str>) -> Option<String> {
        match self {
            ImagePolicy::Embed => {
                if !recipe.has_image()
                    && let Some(thumbnail) = thumbnail
                {
                    recipe.image = Some(thumbnail.to_string());
                }
                None
            }
            ImagePolicy::Upload => {
                recipe.image = None;
                thumbnail.map(str::to_string)
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ImagePolicy::Embed => "embed",
            ImagePolicy::Upload => "upload",
        }
    }
}

impl fmt::Display for ImagePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ImagePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "embed" => Ok(ImagePolicy::Embed),
            "upload" => Ok(ImagePolicy::Upload),
            _ => Err(format!(
                "Unknown image policy: {}. Use 'embed' or 'upload'",
                s
            )),
        }
    }
}

/// Opaque identifier the store assigns on creation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecipeSlug(String);

impl RecipeSlug {
    pub fn new(slug: impl Into<String>) -> Self {
        Self(slug.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecipeSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What the caller gets back once the recipe exists in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeSummary {
    pub name: String,
    pub description: String,
    pub image_url: String,
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> StructuredRecipe {
        let mut recipe = StructuredRecipe::new("Garlic pasta");
        recipe.description = "Quick weeknight pasta".to_string();
        recipe.ingredients = vec!["200g spaghetti".to_string(), "3 cloves garlic".to_string()];
        recipe.instructions = vec![HowToStep::new("Boil pasta"), HowToStep::new("Fry garlic")];
        recipe
    }

    #[test]
    fn test_serializes_as_json_ld() {
        let mut recipe = sample();
        recipe.keywords = Some(vec!["dinner".to_string()]);
        let value = serde_json::to_value(&recipe).unwrap();
        assert_eq!(value["@context"], "https://schema.org");
        assert_eq!(value["@type"], "Recipe");
        assert_eq!(value["recipeIngredient"][1], "3 cloves garlic");
        assert_eq!(
            value["recipeInstructions"][0],
            json!({ "@type": "HowToStep", "text": "Boil pasta" })
        );
        assert_eq!(value["keywords"], json!(["dinner"]));
        assert!(value.get("image").is_none());
    }

    #[test]
    fn test_deserializes_model_output_without_ld_markers() {
        let recipe: StructuredRecipe = serde_json::from_value(json!({
            "name": "Garlic pasta",
            "image": null,
            "url": "https://example.com/post/1",
            "description": "Quick",
            "recipeIngredient": ["pasta"],
            "recipeInstructions": [{ "text": "Boil" }],
            "keywords": null
        }))
        .unwrap();
        assert_eq!(recipe.context, "https://schema.org");
        assert_eq!(recipe.instructions[0].kind, "HowToStep");
        assert_eq!(recipe.image, None);
        assert!(recipe.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_parts() {
        assert!(sample().validate().is_ok());

        let mut nameless = sample();
        nameless.name = "  ".to_string();
        assert!(nameless.validate().is_err());

        let mut no_ingredients = sample();
        no_ingredients.ingredients = vec![String::new()];
        assert!(no_ingredients.validate().is_err());

        let mut no_steps = sample();
        no_steps.instructions.clear();
        assert!(no_steps.validate().is_err());
    }

    #[test]
    fn test_embed_fills_missing_image() {
        let mut recipe = sample();
        recipe.image = Some(String::new());
        let pending = ImagePolicy::Embed.apply(&mut recipe, Some("https://cdn/thumb.jpg"));
        assert_eq!(recipe.image.as_deref(), Some("https://cdn/thumb.jpg"));
        assert_eq!(pending, None);
    }

    #[test]
    fn test_embed_keeps_generated_image() {
        let mut recipe = sample();
        recipe.image = Some("https://cdn/other.jpg".to_string());
        ImagePolicy::Embed.apply(&mut recipe, Some("https://cdn/thumb.jpg"));
        assert_eq!(recipe.image.as_deref(), Some("https://cdn/other.jpg"));
    }

    #[test]
    fn test_upload_strips_image_and_returns_thumbnail() {
        let mut recipe = sample();
        recipe.image = Some("https://cdn/other.jpg".to_string());
        let pending = ImagePolicy::Upload.apply(&mut recipe, Some("https://cdn/thumb.jpg"));
        assert_eq!(recipe.image, None);
        assert_eq!(pending.as_deref(), Some("https://cdn/thumb.jpg"));

        let mut recipe = sample();
        assert_eq!(ImagePolicy::Upload.apply(&mut recipe, None), None);
    }

    #[test]
    fn test_image_policy_names() {
        assert_eq!("embed".parse::<ImagePolicy>(), Ok(ImagePolicy::Embed));
        assert_eq!("Upload".parse::<ImagePolicy>(), Ok(ImagePolicy::Upload));
        assert!("attach".parse::<ImagePolicy>().is_err());
        assert_eq!(ImagePolicy::default().to_string(), "upload");
    }

    #[test]
    fn test_summary_uses_camel_case() {
        let summary = RecipeSummary {
            name: "Garlic pasta".to_string(),
            description: "Quick".to_string(),
            image_url: "https://mealie/api/media/recipes/1/images/original.webp".to_string(),
            url: "https://mealie/g/home/r/garlic-pasta".to_string(),
        };
        let value = serde_json::to_value(summary).unwrap();
        assert!(value.get("imageUrl").is_some());
        assert!(value.get("image_url").is_none());
    }
}
