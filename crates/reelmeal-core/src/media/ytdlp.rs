//! yt-dlp backed media fetcher.
//!
//! Two subprocess calls per post: one `--dump-single-json` for metadata, and
//! (only when the post carries an audio stream) one extraction of the audio
//! track into a per-request temp directory.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;

use super::{FetchError, MediaFetcher, MediaResult, validate_post_url};

const AUDIO_EXTENSION: &str = "wav";

/// Subset of the yt-dlp info dict we care about
#[derive(Debug, Default, Deserialize)]
struct InfoDict {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    thumbnail: Option<String>,
    #[serde(default)]
    acodec: Option<String>,
    #[serde(default)]
    formats: Vec<Format>,
    /// Carousel / playlist items
    #[serde(default)]
    entries: Vec<InfoDict>,
}

#[derive(Debug, Default, Deserialize)]
struct Format {
    #[serde(default)]
    acodec: Option<String>,
}

impl InfoDict {
    fn has_audio(&self) -> bool {
        let codec_present = |c: &Option<String>| c.as_deref().is_some_and(|c| c != "none");
        codec_present(&self.acodec)
            || self.formats.iter().any(|f| codec_present(&f.acodec))
            || self.entries.iter().any(InfoDict::has_audio)
    }

    fn description(&self) -> String {
        self.description
            .as_deref()
            .or_else(|| self.entries.iter().find_map(|e| e.description.as_deref()))
            .or(self.title.as_deref())
            .unwrap_or_default()
            .trim()
            .to_string()
    }

    fn thumbnail(&self) -> Option<String> {
        self.thumbnail
            .clone()
            .or_else(|| self.entries.iter().find_map(|e| e.thumbnail.clone()))
    }

    /// Thumbnails of every carousel item, in post order, without duplicates.
    fn image_urls(&self) -> Vec<String> {
        let mut urls: Vec<String> = Vec::new();
        for url in self.entries.iter().filter_map(|e| e.thumbnail.as_ref()) {
            if !url.trim().is_empty() && !urls.contains(url) {
                urls.push(url.clone());
            }
        }
        urls
    }
}

/// Media fetcher that shells out to yt-dlp.
#[derive(Debug, Clone)]
pub struct YtDlpFetcher {
    binary: PathBuf,
}

impl YtDlpFetcher {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    async fn run(&self, args: &[&str]) -> Result<Vec<u8>, FetchError> {
        let output = Command::new(&self.binary)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| FetchError::Spawn {
                program: self.binary.display().to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(FetchError::Extractor {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(output.stdout)
    }

    async fn dump_info(&self, url: &str) -> Result<InfoDict, FetchError> {
        let stdout = self
            .run(&["--dump-single-json", "--no-warnings", "--", url])
            .await?;
        Ok(serde_json::from_slice(&stdout)?)
    }

    async fn download_audio(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let dir = tempfile::Builder::new().prefix("reelmeal-").tempdir()?;
        let template = dir.path().join("audio-%(autonumber)s.%(ext)s");
        let template = template.to_string_lossy().into_owned();

        self.run(&[
            "--no-warnings",
            "--no-playlist",
            "--format",
            "bestaudio/best",
            "--extract-audio",
            "--audio-format",
            AUDIO_EXTENSION,
            "--postprocessor-args",
            "ffmpeg:-ar 16000 -ac 1",
            "--output",
            template.as_str(),
            "--",
            url,
        ])
        .await?;

        let path = first_audio_file(dir.path())
            .await?
            .ok_or(FetchError::MissingAudio)?;
        let bytes = tokio::fs::read(&path).await?;
        tracing::debug!(size_kb = bytes.len() / 1024, "downloaded audio track");
        Ok(bytes)
    }
}

#[async_trait]
impl MediaFetcher for YtDlpFetcher {
    async fn fetch(&self, url: &str) -> Result<MediaResult, FetchError> {
        let url = validate_post_url(url)?;
        let info = self.dump_info(url.as_str()).await?;

        let audio = if info.has_audio() {
            Some(self.download_audio(url.as_str()).await?)
        } else {
            tracing::info!(%url, "post has no audio stream, skipping audio download");
            None
        };

        Ok(into_media_result(info, audio))
    }
}

fn into_media_result(info: InfoDict, audio: Option<Vec<u8>>) -> MediaResult {
    MediaResult {
        audio,
        description: info.description(),
        thumbnail_url: info.thumbnail(),
        image_urls: info.image_urls(),
    }
}

/// Find the first extracted audio file, in name order.
async fn first_audio_file(dir: &Path) -> Result<Option<PathBuf>, FetchError> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut found = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some(AUDIO_EXTENSION) {
            found.push(path);
        }
    }
    found.sort();
    Ok(found.into_iter().next())
}
