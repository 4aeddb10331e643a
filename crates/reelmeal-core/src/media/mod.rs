//! Media acquisition: resolve a post URL to audio plus descriptive metadata.

mod ytdlp;

use async_trait::async_trait;
use thiserror::Error;

pub use ytdlp::YtDlpFetcher;

/// Value some extractors report when a post has no thumbnail
pub const THUMBNAIL_NOT_FOUND: &str = "not found";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("yt-dlp exited with {status}: {stderr}")]
    Extractor { status: String, stderr: String },

    #[error("failed to parse yt-dlp metadata: {0}")]
    Metadata(#[from] serde_json::Error),

    #[error("audio download produced no file")]
    MissingAudio,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything the rest of the pipeline needs from a post.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaResult {
    /// Audio track (16 kHz mono WAV), absent for image-only posts
    pub audio: Option<Vec<u8>>,
    pub description: String,
    pub thumbnail_url: Option<String>,
    pub image_urls: Vec<String>,
}

impl MediaResult {
    /// The thumbnail URL, unless it is missing, blank or the "not found" sentinel.
    pub fn usable_thumbnail(&self) -> Option<&str> {
        self.thumbnail_url
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty() && *t != THUMBNAIL_NOT_FOUND)
    }
}

#[async_trait]
pub trait MediaFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<MediaResult, FetchError>;
}

/// Reject anything that is not an absolute http(s) URL before handing it to a subprocess.
pub(crate) fn validate_post_url(url: &str) -> Result<url::Url, FetchError> {
    let parsed =
        url::Url::parse(url.trim()).map_err(|e| FetchError::InvalidUrl(format!("{url}: {e}")))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(FetchError::InvalidUrl(format!(
            "{url}: only http and https are supported"
        )));
    }
    if parsed.host_str().is_none() {
        return Err(FetchError::InvalidUrl(format!("{url}: no host")));
    }

    Ok(parsed)
}
