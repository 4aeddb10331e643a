//! Local transcription using whisper.cpp via whisper-rs
//!
//! Enables transcription without sending audio to an API. Expects the
//! 16 kHz mono WAV track that the media fetcher extracts.

use std::io::Cursor;
use std::path::PathBuf;

use async_trait::async_trait;

use super::{TranscribeError, Transcriber, TranscriptionRequest, TranscriptionResult};
use crate::error::ConfigError;
use crate::settings::vars;

/// Target sample rate for whisper.cpp
const WHISPER_SAMPLE_RATE: u32 = 16000;

/// Local whisper.cpp transcription provider
#[derive(Debug, Clone)]
pub struct LocalWhisperTranscriber {
    model_path: PathBuf,
}

impl LocalWhisperTranscriber {
    pub fn new(model_path: PathBuf) -> Result<Self, ConfigError> {
        if !model_path.is_file() {
            return Err(ConfigError::Invalid {
                name: vars::LOCAL_TRANSCRIPTION_MODEL,
                reason: format!(
                    "whisper model not found at {}. Download one from https://huggingface.co/ggerganov/whisper.cpp/tree/main",
                    model_path.display()
                ),
            });
        }
        Ok(Self { model_path })
    }
}

#[async_trait]
impl Transcriber for LocalWhisperTranscriber {
    fn name(&self) -> &'static str {
        "local-whisper"
    }

    async fn transcribe(
        &self,
        request: TranscriptionRequest,
    ) -> Result<TranscriptionResult, TranscribeError> {
        // Run CPU-bound transcription in blocking task
        let model_path = self.model_path.clone();
        tokio::task::spawn_blocking(move || transcribe_local(&model_path, request))
            .await
            .map_err(|e| TranscribeError::Model(format!("transcription task failed: {e}")))?
    }
}

/// Perform local transcription using whisper-rs
fn transcribe_local(
    model_path: &std::path::Path,
    request: TranscriptionRequest,
) -> Result<TranscriptionResult, TranscribeError> {
    use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

    // Suppress verbose whisper.cpp logging
    whisper_rs::install_logging_hooks();

    let samples = decode_wav(&request.audio_data)?;

    let model_path = model_path
        .to_str()
        .ok_or_else(|| TranscribeError::Model("model path is not valid UTF-8".to_string()))?;
    let ctx = WhisperContext::new_with_params(model_path, WhisperContextParameters::default())
        .map_err(|e| TranscribeError::Model(format!("failed to load whisper model: {e}")))?;

    let mut state = ctx
        .create_state()
        .map_err(|e| TranscribeError::Model(format!("failed to create whisper state: {e}")))?;

    let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
    params.set_print_special(false);
    params.set_print_progress(false);
    params.set_print_realtime(false);
    params.set_print_timestamps(false);

    state
        .full(params, &samples)
        .map_err(|e| TranscribeError::Model(format!("transcription failed: {e}")))?;

    let mut text = String::new();
    for i in 0..state.full_n_segments() {
        if let Some(segment) = state.get_segment(i)
            && let Ok(segment_text) = segment.to_str()
        {
            text.push_str(segment_text);
        }
    }

    Ok(TranscriptionResult {
        text: text.trim().to_string(),
    })
}

/// Decode a 16 kHz WAV into mono f32 samples
fn decode_wav(bytes: &[u8]) -> Result<Vec<f32>, TranscribeError> {
    let mut reader = hound::WavReader::new(Cursor::new(bytes))
        .map_err(|e| TranscribeError::Audio(e.to_string()))?;
    let spec = reader.spec();

    if spec.sample_rate != WHISPER_SAMPLE_RATE {
        return Err(TranscribeError::Audio(format!(
            "expected {WHISPER_SAMPLE_RATE} Hz audio, got {} Hz",
            spec.sample_rate
        )));
    }

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| TranscribeError::Audio(e.to_string()))?,
        hound::SampleFormat::Int => {
            let max_val = (1u32 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| TranscribeError::Audio(e.to_string()))?
        }
    };

    if samples.is_empty() {
        return Err(TranscribeError::Audio("no audio samples decoded".to_string()));
    }

    Ok(to_mono(&samples, spec.channels))
}

/// Convert multichannel audio to mono by averaging all channels
fn to_mono(samples: &[f32], channels: u16) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    samples
        .chunks(channels as usize)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wav_bytes(sample_rate: u32, channels: u16, samples: &[i16]) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for &s in samples {
                writer.write_sample(s).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn test_to_mono() {
        let stereo = vec![0.5, 0.3, 0.8, 0.2, 1.0, 0.0];
        let mono = to_mono(&stereo, 2);
        assert_eq!(mono.len(), 3);
        assert!((mono[0] - 0.4).abs() < 0.001);
        assert!((mono[1] - 0.5).abs() < 0.001);
        assert!((mono[2] - 0.5).abs() < 0.001);
    }

    #[test]
    fn test_decode_wav_stereo() {
        let bytes = wav_bytes(16000, 2, &[16384, 0, -16384, 0]);
        let samples = decode_wav(&bytes).unwrap();
        assert_eq!(samples.len(), 2);
        assert!((samples[0] - 0.25).abs() < 0.001);
        assert!((samples[1] + 0.25).abs() < 0.001);
    }

    #[test]
    fn test_decode_wav_rejects_wrong_rate() {
        let bytes = wav_bytes(44100, 1, &[0, 1, 2]);
        assert!(matches!(decode_wav(&bytes), Err(TranscribeError::Audio(_))));
    }

    #[test]
    fn test_missing_model_rejected() {
        let err = LocalWhisperTranscriber::new(PathBuf::from("/nonexistent/ggml-small.bin"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }
}
