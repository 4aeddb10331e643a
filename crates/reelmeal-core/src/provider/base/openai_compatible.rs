//! Shared implementation for OpenAI-compatible transcription APIs.
//!
//! Works against OpenAI itself and any self-hosted server that mirrors the
//! `/audio/transcriptions` endpoint (faster-whisper-server, LocalAI, ...):
//! - Multipart form upload with `model` and `file` fields
//! - Authorization via `Bearer` token
//! - JSON response with `text` field

use std::time::Duration;

use serde::Deserialize;

use super::super::{
    DEFAULT_TIMEOUT_SECS, TranscribeError, TranscriptionRequest, TranscriptionResult,
};

/// Response structure for OpenAI-compatible APIs
#[derive(Deserialize)]
struct OpenAICompatibleResponse {
    text: String,
}

/// Transcribe audio using an OpenAI-compatible API.
///
/// # Parameters
/// - `client`: Shared reqwest client for connection pooling
/// - `api_url`: The full endpoint URL
/// - `model`: The model name to use
/// - `api_key`: Bearer token for authentication
/// - `request`: Transcription request with audio data and options
pub(crate) async fn openai_compatible_transcribe(
    client: &reqwest::Client,
    api_url: &str,
    model: &str,
    api_key: &str,
    request: TranscriptionRequest,
) -> Result<TranscriptionResult, TranscribeError> {
    let TranscriptionRequest {
        audio_data,
        filename,
        mime_type,
    } = request;

    let form = reqwest::multipart::Form::new()
        .text("model", model.to_string())
        .part(
            "file",
            reqwest::multipart::Part::bytes(audio_data)
                .file_name(filename)
                .mime_str(&mime_type)?,
        );

    let response = client
        .post(api_url)
        .header("Authorization", format!("Bearer {api_key}"))
        .multipart(form)
        .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
        .send()
        .await?;

    if !response.status().is_success() {
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(TranscribeError::Api { status, body });
    }

    let resp: OpenAICompatibleResponse = response.json().await?;

    Ok(TranscriptionResult {
        text: resp.text.trim().to_string(),
    })
}
