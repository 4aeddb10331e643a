pub mod error;
pub mod http;
pub mod media;
pub mod pipeline;
pub mod progress;
pub mod provider;
pub mod recipe;
pub mod settings;
pub mod store;

pub use error::{ConfigError, PipelineError};
pub use media::{FetchError, MediaFetcher, MediaResult, YtDlpFetcher};
pub use pipeline::{
    ChannelSink, Frame, NullSink, Pipeline, PipelineOptions, ProgressSink, RecipeRequest,
    RunOutcome, TRANSCRIPT_PLACEHOLDER,
};
pub use progress::ProgressState;
pub use provider::{
    TranscribeError, Transcriber, TranscriptionRequest, TranscriptionResult, transcriber_for,
};
pub use recipe::{
    GenerateError, GenerationInput, HowToStep, ImagePolicy, OpenAiRecipeGenerator,
    RecipeGenerator, RecipeSlug, RecipeSummary, StructuredRecipe,
};
pub use settings::{Settings, TranscriptionProvider};
pub use store::{ImageAttachError, MealieClient, RecipeStore, StoreError};
