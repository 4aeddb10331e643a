use thiserror::Error;

use crate::media::FetchError;
use crate::provider::TranscribeError;
use crate::recipe::GenerateError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable not set: {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },

    #[error("{0} was requested but this build lacks the `{1}` feature")]
    FeatureDisabled(&'static str, &'static str),

    #[error("failed to create HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Terminal failures of a pipeline run.
///
/// Any of these aborts the remaining stages. Image attachment failures are
/// deliberately absent: they are logged where they happen and never reach
/// the caller.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Failed to download media: {0}")]
    Acquisition(#[from] FetchError),

    #[error("Failed to transcribe audio: {0}")]
    Transcription(#[from] TranscribeError),

    #[error("Failed to generate recipe structure: {0}")]
    Generation(#[from] GenerateError),

    #[error("Failed to save recipe: {0}")]
    Persistence(#[from] StoreError),
}

impl PipelineError {
    /// Whether the failure happened after the recipe reached the store
    pub fn is_persistence(&self) -> bool {
        matches!(self, PipelineError::Persistence(_))
    }
}
