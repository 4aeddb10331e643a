//! Request-scoped progress tracking.
//!
//! Each field is tri-state: `None` (not reached yet), `Some(true)` (stage
//! done) or `Some(false)` (stage failed). Serialized as `null`/`true`/`false`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressState {
    media_downloaded: Option<bool>,
    audio_transcribed: Option<bool>,
    recipe_created: Option<bool>,
}

impl ProgressState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn media_downloaded(&self) -> Option<bool> {
        self.media_downloaded
    }

    pub fn audio_transcribed(&self) -> Option<bool> {
        self.audio_transcribed
    }

    pub fn recipe_created(&self) -> Option<bool> {
        self.recipe_created
    }

    pub fn mark_media_downloaded(&mut self) {
        debug_assert!(self.media_downloaded.is_none());
        self.media_downloaded = Some(true);
    }

    pub fn mark_audio_transcribed(&mut self) {
        debug_assert_eq!(self.media_downloaded, Some(true));
        debug_assert!(self.audio_transcribed.is_none());
        self.audio_transcribed = Some(true);
    }

    pub fn mark_recipe_created(&mut self) {
        debug_assert_eq!(self.media_downloaded, Some(true));
        debug_assert!(self.recipe_created.is_none());
        self.recipe_created = Some(true);
    }

    /// Record a terminal persistence failure. A recipe already marked as
    /// created stays created.
    pub fn mark_recipe_failed(&mut self) {
        if self.recipe_created.is_none() {
            self.recipe_created = Some(false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fresh_state_serializes_as_nulls() {
        let value = serde_json::to_value(ProgressState::new()).unwrap();
        assert_eq!(
            value,
            json!({
                "mediaDownloaded": null,
                "audioTranscribed": null,
                "recipeCreated": null,
            })
        );
    }

    #[test]
    fn test_transitions_in_order() {
        let mut progress = ProgressState::new();
        progress.mark_media_downloaded();
        progress.mark_audio_transcribed();
        progress.mark_recipe_created();
        assert_eq!(
            serde_json::to_value(progress).unwrap(),
            json!({
                "mediaDownloaded": true,
                "audioTranscribed": true,
                "recipeCreated": true,
            })
        );
    }

    #[test]
    fn test_failure_never_overrides_success() {
        let mut progress = ProgressState::new();
        progress.mark_media_downloaded();
        progress.mark_recipe_created();
        progress.mark_recipe_failed();
        assert_eq!(progress.recipe_created(), Some(true));
    }

    #[test]
    fn test_failure_from_unset() {
        let mut progress = ProgressState::new();
        progress.mark_media_downloaded();
        progress.mark_recipe_failed();
        assert_eq!(progress.recipe_created(), Some(false));
        assert_eq!(progress.audio_transcribed(), None);
    }
}
