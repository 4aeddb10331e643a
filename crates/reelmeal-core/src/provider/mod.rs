//! Speech-to-text providers.
//!
//! Each provider implements [`Transcriber`]; [`transcriber_for`] picks the
//! one selected by the settings.

mod base;
#[cfg(feature = "local-transcription")]
mod local_whisper;
mod openai;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

pub(crate) use base::openai_compatible_transcribe;
#[cfg(feature = "local-transcription")]
pub use local_whisper::LocalWhisperTranscriber;
pub use openai::OpenAiTranscriber;

use crate::error::ConfigError;
use crate::settings::{Settings, TranscriptionProvider};

/// Default timeout for transcription API requests
pub(crate) const DEFAULT_TIMEOUT_SECS: u64 = 300;

#[derive(Debug, Error)]
pub enum TranscribeError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("failed to decode audio: {0}")]
    Audio(String),

    #[error("model error: {0}")]
    Model(String),
}

/// Audio handed to a provider
#[derive(Debug, Clone)]
pub struct TranscriptionRequest {
    pub audio_data: Vec<u8>,
    pub filename: String,
    pub mime_type: String,
}

impl TranscriptionRequest {
    /// A request for a WAV track as produced by the media fetcher.
    pub fn wav(audio_data: Vec<u8>) -> Self {
        Self {
            audio_data,
            filename: "audio.wav".to_string(),
            mime_type: "audio/wav".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptionResult {
    pub text: String,
}

#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Short identifier used in logs
    fn name(&self) -> &'static str;

    async fn transcribe(
        &self,
        request: TranscriptionRequest,
    ) -> Result<TranscriptionResult, TranscribeError>;
}

/// Build the transcriber selected by `settings`.
pub fn transcriber_for(
    settings: &Settings,
    client: &reqwest::Client,
) -> Result<Arc<dyn Transcriber>, ConfigError> {
    match settings.transcription_provider() {
        TranscriptionProvider::OpenAI => Ok(Arc::new(OpenAiTranscriber::new(
            client.clone(),
            &settings.openai.base_url,
            &settings.openai.transcription_model,
            &settings.openai.api_key,
        ))),
        #[cfg(feature = "local-transcription")]
        TranscriptionProvider::LocalWhisper => {
            let model_path = settings
                .local_transcription_model
                .clone()
                .ok_or(ConfigError::Missing(TranscriptionProvider::LocalWhisper.env_var()))?;
            Ok(Arc::new(LocalWhisperTranscriber::new(model_path)?))
        }
        #[cfg(not(feature = "local-transcription"))]
        TranscriptionProvider::LocalWhisper => Err(ConfigError::FeatureDisabled(
            TranscriptionProvider::LocalWhisper.env_var(),
            "local-transcription",
        )),
    }
}
