//! OpenAI-compatible transcription provider
//!
//! Talks to `{OPENAI_URL}/audio/transcriptions`, so it covers both the hosted
//! OpenAI API and self-hosted whisper servers exposing the same route.

use async_trait::async_trait;

use super::{
    TranscribeError, Transcriber, TranscriptionRequest, TranscriptionResult,
    openai_compatible_transcribe,
};

#[derive(Debug, Clone)]
pub struct OpenAiTranscriber {
    client: reqwest::Client,
    api_url: String,
    model: String,
    api_key: String,
}

impl OpenAiTranscriber {
    /// `base_url` is the API root, e.g. `https://api.openai.com/v1`
    pub fn new(client: reqwest::Client, base_url: &str, model: &str, api_key: &str) -> Self {
        Self {
            client,
            api_url: build_api_url(base_url),
            model: model.to_string(),
            api_key: api_key.to_string(),
        }
    }
}

#[async_trait]
impl Transcriber for OpenAiTranscriber {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn transcribe(
        &self,
        request: TranscriptionRequest,
    ) -> Result<TranscriptionResult, TranscribeError> {
        openai_compatible_transcribe(
            &self.client,
            &self.api_url,
            &self.model,
            &self.api_key,
            request,
        )
        .await
    }
}

/// Normalize the base URL and append the transcriptions endpoint
fn build_api_url(base_url: &str) -> String {
    format!(
        "{}/audio/transcriptions",
        base_url.trim().trim_end_matches('/')
    )
}
