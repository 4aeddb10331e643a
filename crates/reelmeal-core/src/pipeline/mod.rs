//! The import pipeline: post URL in, stored recipe out.
//!
//! Stages run strictly in order: fetch media, transcribe (when the post has
//! audio), generate, apply the image policy, create in the store, attach the
//! thumbnail (best-effort), then read back the canonical record. Progress is
//! reported through a [`ProgressSink`] after every completed stage.

mod sink;

use std::sync::Arc;

use crate::error::{ConfigError, PipelineError};
use crate::http::get_http_client;
use crate::media::{MediaFetcher, YtDlpFetcher};
use crate::progress::ProgressState;
use crate::provider::{Transcriber, TranscriptionRequest, transcriber_for};
use crate::recipe::{
    GenerationInput, ImagePolicy, OpenAiRecipeGenerator, RecipeGenerator, RecipeSummary,
};
use crate::settings::Settings;
use crate::store::{MealieClient, RecipeStore};

pub use sink::{ChannelSink, Frame, NullSink, ProgressSink};

/// Transcript handed to the generator when the post has no audio
pub const TRANSCRIPT_PLACEHOLDER: &str = "There is not transcriptions";

/// One import request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeRequest {
    pub url: String,
    pub tags: Vec<String>,
}

/// Final state of a run. `progress` is the last snapshot either way.
#[derive(Debug)]
pub struct RunOutcome {
    pub progress: ProgressState,
    pub result: Result<RecipeSummary, PipelineError>,
}

#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    /// Appended to the generation prompt
    pub extra_prompt: String,
    pub image_policy: ImagePolicy,
}

#[derive(Clone)]
pub struct Pipeline {
    fetcher: Arc<dyn MediaFetcher>,
    transcriber: Arc<dyn Transcriber>,
    generator: Arc<dyn RecipeGenerator>,
    store: Arc<dyn RecipeStore>,
    options: PipelineOptions,
}

impl Pipeline {
    pub fn new(
        fetcher: Arc<dyn MediaFetcher>,
        transcriber: Arc<dyn Transcriber>,
        generator: Arc<dyn RecipeGenerator>,
        store: Arc<dyn RecipeStore>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            fetcher,
            transcriber,
            generator,
            store,
            options,
        }
    }

    /// Wire up the production adapters.
    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigError> {
        let client = get_http_client()?;

        let transcriber = transcriber_for(settings, client)?;
        tracing::info!("Using {} transcription", transcriber.name());

        let generator = OpenAiRecipeGenerator::new(
            client.clone(),
            &settings.openai.base_url,
            &settings.openai.text_model,
            &settings.openai.api_key,
        );

        Ok(Self::new(
            Arc::new(YtDlpFetcher::new(settings.ytdlp_path.clone())),
            transcriber,
            Arc::new(generator),
            Arc::new(MealieClient::new(client.clone(), &settings.mealie)),
            PipelineOptions {
                extra_prompt: settings.extra_prompt.clone(),
                image_policy: settings.image_policy,
            },
        ))
    }

    /// Run the whole pipeline for one request.
    ///
    /// Never fails itself: the outcome carries either the stored recipe or the
    /// terminal error, and the sink has seen the matching terminal frame and
    /// been closed by the time this returns.
    pub async fn run(&self, request: &RecipeRequest, sink: &dyn ProgressSink) -> RunOutcome {
        let mut progress = ProgressState::new();
        sink.send(Frame::Progress { progress }).await;

        let result = self.execute(request, &mut progress, sink).await;

        match &result {
            Ok(summary) => {
                tracing::info!(url = %request.url, recipe = %summary.url, "recipe imported");
                sink.send(Frame::Recipe(summary.clone())).await;
            }
            Err(e) => {
                if e.is_persistence() {
                    progress.mark_recipe_failed();
                }
                tracing::error!(url = %request.url, "recipe import failed: {}", e);
                sink.send(Frame::Error {
                    error: e.to_string(),
                    progress,
                })
                .await;
            }
        }
        sink.close().await;

        RunOutcome { progress, result }
    }

    async fn execute(
        &self,
        request: &RecipeRequest,
        progress: &mut ProgressState,
        sink: &dyn ProgressSink,
    ) -> Result<RecipeSummary, PipelineError> {
        tracing::info!(url = %request.url, "fetching media");
        let media = self.fetcher.fetch(&request.url).await?;
        progress.mark_media_downloaded();
        sink.send(Frame::Progress {
            progress: *progress,
        })
        .await;

        let transcript = match media.audio.clone() {
            Some(audio) => {
                tracing::debug!("transcribing {} bytes with {}", audio.len(), self.transcriber.name());
                let result = self
                    .transcriber
                    .transcribe(TranscriptionRequest::wav(audio))
                    .await?;
                progress.mark_audio_transcribed();
                sink.send(Frame::Progress {
                    progress: *progress,
                })
                .await;
                result.text
            }
            None => {
                tracing::debug!("post has no audio, skipping transcription");
                TRANSCRIPT_PLACEHOLDER.to_string()
            }
        };

        let thumbnail = media.usable_thumbnail();
        let input = GenerationInput {
            transcript: &transcript,
            description: &media.description,
            post_url: &request.url,
            thumbnail,
            extra_prompt: &self.options.extra_prompt,
            tags: &request.tags,
            images: &media.image_urls,
        };
        let mut recipe = self.generator.generate(&input).await?;
        tracing::debug!("generated recipe {:?}", recipe.name);

        let pending_image = self.options.image_policy.apply(&mut recipe, thumbnail);

        let slug = self.store.create(&recipe).await?;

        if let Some(image_url) = pending_image
            && let Err(e) = self.store.attach_image(&slug, &image_url).await
        {
            tracing::warn!(slug = %slug, "skipping recipe image: {}", e);
        }

        let summary = self.store.get(&slug).await?;
        progress.mark_recipe_created();
        sink.send(Frame::Progress {
            progress: *progress,
        })
        .await;

        Ok(summary)
    }
}
