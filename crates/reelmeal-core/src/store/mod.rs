//! Recipe persistence.
//!
//! The pipeline only needs three things from a store: create a recipe and get
//! its slug back, read the canonical record for a slug, and attach an image to
//! an existing recipe.

mod mealie;

use async_trait::async_trait;
use thiserror::Error;

pub use mealie::MealieClient;

use crate::recipe::{RecipeSlug, RecipeSummary, StructuredRecipe};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Timeout {action} mealie recipe. Report this issue on Mealie GitHub. Input URL: {url}")]
    Timeout { action: &'static str, url: String },

    #[error("Mealie returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("could not encode recipe: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Failure to attach an image. Never fatal to a pipeline run.
#[derive(Debug, Error)]
pub enum ImageAttachError {
    #[error("failed to download image ({status})")]
    Download { status: u16 },

    #[error("failed to upload image ({status}): {body}")]
    Upload { status: u16, body: String },

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
}

#[async_trait]
pub trait RecipeStore: Send + Sync {
    /// Persist a new recipe. Called at most once per run.
    async fn create(&self, recipe: &StructuredRecipe) -> Result<RecipeSlug, StoreError>;

    /// Read back the stored recipe as the caller should see it.
    async fn get(&self, slug: &RecipeSlug) -> Result<RecipeSummary, StoreError>;

    /// Download `image_url` and attach it to the recipe.
    async fn attach_image(&self, slug: &RecipeSlug, image_url: &str)
    -> Result<(), ImageAttachError>;
}
