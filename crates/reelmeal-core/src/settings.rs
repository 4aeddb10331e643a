//! Process-wide configuration read from the environment at startup.
//!
//! Every value is looked up once by [`Settings::from_env`] and then passed
//! explicitly into the pipeline; nothing in the pipeline reads the environment
//! mid-request.

use std::fmt;
use std::path::PathBuf;

use crate::error::ConfigError;
use crate::recipe::ImagePolicy;

pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_TRANSCRIPTION_MODEL: &str = "whisper-1";
pub const DEFAULT_TEXT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_GROUP_NAME: &str = "home";
pub const DEFAULT_YTDLP_PATH: &str = "yt-dlp";

/// Environment variable names
pub mod vars {
    pub const MEALIE_URL: &str = "MEALIE_URL";
    pub const MEALIE_API_KEY: &str = "MEALIE_API_KEY";
    pub const MEALIE_GROUP_NAME: &str = "MEALIE_GROUP_NAME";
    pub const OPENAI_URL: &str = "OPENAI_URL";
    pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
    pub const TRANSCRIPTION_MODEL: &str = "TRANSCRIPTION_MODEL";
    pub const TEXT_MODEL: &str = "TEXT_MODEL";
    pub const EXTRA_PROMPT: &str = "EXTRA_PROMPT";
    pub const LOCAL_TRANSCRIPTION_MODEL: &str = "LOCAL_TRANSCRIPTION_MODEL";
    pub const YTDLP_PATH: &str = "YTDLP_PATH";
    pub const IMAGE_POLICY: &str = "IMAGE_POLICY";
}

/// Available transcription providers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TranscriptionProvider {
    /// Any server speaking the OpenAI `/audio/transcriptions` API
    #[default]
    OpenAI,
    /// whisper.cpp model on local disk
    LocalWhisper,
}

impl TranscriptionProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            TranscriptionProvider::OpenAI => "openai",
            TranscriptionProvider::LocalWhisper => "local-whisper",
        }
    }

    /// The environment variable that carries this provider's credential or model path
    pub fn env_var(&self) -> &'static str {
        match self {
            TranscriptionProvider::OpenAI => vars::OPENAI_API_KEY,
            TranscriptionProvider::LocalWhisper => vars::LOCAL_TRANSCRIPTION_MODEL,
        }
    }
}

impl fmt::Display for TranscriptionProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Connection details for the Mealie recipe store.
#[derive(Debug, Clone)]
pub struct MealieSettings {
    pub base_url: String,
    pub api_key: String,
    pub group_name: String,
}

/// Connection details for the OpenAI-compatible model server.
#[derive(Debug, Clone)]
pub struct OpenAiSettings {
    pub base_url: String,
    pub api_key: String,
    pub transcription_model: String,
    pub text_model: String,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub mealie: MealieSettings,
    pub openai: OpenAiSettings,
    /// Extra generation instructions appended to the user prompt
    pub extra_prompt: String,
    /// Path to a whisper.cpp model; selects local transcription when set
    pub local_transcription_model: Option<PathBuf>,
    pub ytdlp_path: PathBuf,
    pub image_policy: ImagePolicy,
}

impl Settings {
    /// Load settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load settings through an arbitrary variable lookup.
    ///
    /// Blank values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let require = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));

        let mealie = MealieSettings {
            base_url: validate_base_url(vars::MEALIE_URL, &require(vars::MEALIE_URL)?)?,
            api_key: require(vars::MEALIE_API_KEY)?,
            group_name: get(vars::MEALIE_GROUP_NAME)
                .unwrap_or_else(|| DEFAULT_GROUP_NAME.to_string()),
        };

        let local_transcription_model = get(vars::LOCAL_TRANSCRIPTION_MODEL).map(PathBuf::from);

        let openai = OpenAiSettings {
            base_url: validate_base_url(
                vars::OPENAI_URL,
                &get(vars::OPENAI_URL).unwrap_or_else(|| DEFAULT_OPENAI_URL.to_string()),
            )?,
            // Generation always goes through the API, so the key is required
            // even when transcription runs locally.
            api_key: require(vars::OPENAI_API_KEY)?,
            transcription_model: get(vars::TRANSCRIPTION_MODEL)
                .unwrap_or_else(|| DEFAULT_TRANSCRIPTION_MODEL.to_string()),
            text_model: get(vars::TEXT_MODEL).unwrap_or_else(|| DEFAULT_TEXT_MODEL.to_string()),
        };

        let image_policy = match get(vars::IMAGE_POLICY) {
            Some(raw) => raw.parse().map_err(|reason| ConfigError::Invalid {
                name: vars::IMAGE_POLICY,
                reason,
            })?,
            None => ImagePolicy::default(),
        };

        Ok(Self {
            mealie,
            openai,
            extra_prompt: get(vars::EXTRA_PROMPT).unwrap_or_default(),
            local_transcription_model,
            ytdlp_path: get(vars::YTDLP_PATH)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_YTDLP_PATH)),
            image_policy,
        })
    }

    pub fn transcription_provider(&self) -> TranscriptionProvider {
        if self.local_transcription_model.is_some() {
            TranscriptionProvider::LocalWhisper
        } else {
            TranscriptionProvider::OpenAI
        }
    }
}

/// Check that a base URL is absolute http(s) with a host, and drop any trailing slash.
fn validate_base_url(name: &'static str, raw: &str) -> Result<String, ConfigError> {
    let parsed = url::Url::parse(raw).map_err(|e| ConfigError::Invalid {
        name,
        reason: format!("{raw} is not a valid URL: {e}"),
    })?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::Invalid {
            name,
            reason: format!("{raw} must start with http:// or https://"),
        });
    }
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(ConfigError::Invalid {
            name,
            reason: format!("{raw} is missing a host"),
        });
    }

    Ok(raw.trim_end_matches('/').to_string())
}
