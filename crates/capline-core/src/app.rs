//! Page state: the URL field, the caption editor and the player view

use crate::captions::CaptionParser;
use crate::clock::ClockEvent;
use crate::error::{Error, Result};
use crate::source::PlaybackSource;
use crate::state::{Overlay, PlayerView};
use crate::types::{CaptionList, PlayerConfig};
use std::sync::Arc;
use tracing::{info, warn};

/// Outcome of the load-video action
#[derive(Debug, Clone, PartialEq)]
pub enum UrlChange {
    /// A new source was loaded under a new generation
    Loaded {
        generation: u64,
        source: PlaybackSource,
    },
    /// The URL is the one already loaded
    Unchanged,
}

/// Page level state.
///
/// Both user actions are validated here. A failed action records an inline
/// error message and leaves everything else as it was.
#[derive(Debug, Clone)]
pub struct AppState {
    parser: CaptionParser,
    url: String,
    url_error: Option<String>,
    draft: String,
    caption_error: Option<String>,
    captions: Arc<CaptionList>,
    player: PlayerView,
}

impl AppState {
    pub fn new(config: &PlayerConfig) -> Self {
        Self {
            parser: CaptionParser::new().blank_lines(config.blank_lines),
            url: String::new(),
            url_error: None,
            draft: String::new(),
            caption_error: None,
            captions: Arc::new(CaptionList::new()),
            player: PlayerView::new(config.tolerance_secs),
        }
    }

    /// Load a video URL.
    ///
    /// An empty (or all whitespace) URL fails with [`Error::EmptyUrl`] and the
    /// current video keeps playing.
    pub fn load_video(&mut self, url: &str) -> Result<UrlChange> {
        let url = url.trim();
        let Some(source) = PlaybackSource::classify(url) else {
            warn!("Load requested with an empty URL");
            self.url_error = Some(Error::EmptyUrl.to_string());
            return Err(Error::EmptyUrl);
        };
        self.url_error = None;

        if url == self.url && self.player.source().is_some() {
            return Ok(UrlChange::Unchanged);
        }

        let generation = self.player.load(source.clone())?;
        self.url = url.to_string();
        Ok(UrlChange::Loaded { generation, source })
    }

    /// Update the caption editor text without submitting it
    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    /// Parse `text` and replace the caption list.
    ///
    /// On error the list is untouched and `text` stays in the editor for
    /// correction. On success the editor is cleared.
    pub fn add_captions(&mut self, text: &str) -> Result<usize> {
        match self.parser.parse(text) {
            Ok(captions) => {
                let count = captions.len();
                info!(count, "Captions replaced");
                self.captions = Arc::new(captions);
                self.player.set_captions(Arc::clone(&self.captions));
                self.draft.clear();
                self.caption_error = None;
                Ok(count)
            }
            Err(err) => {
                warn!(error = %err, "Rejected caption input");
                self.draft = text.to_string();
                self.caption_error = Some(err.to_string());
                Err(err)
            }
        }
    }

    /// Submit whatever is in the caption editor
    pub fn submit_draft(&mut self) -> Result<usize> {
        let text = std::mem::take(&mut self.draft);
        self.add_captions(&text)
    }

    /// Forward a clock event to the player view
    pub fn apply(&mut self, event: ClockEvent) -> bool {
        self.player.apply(event)
    }

    /// Tear down the current source
    pub fn unload(&mut self) {
        self.url.clear();
        self.player.unload();
    }

    pub fn overlay(&self) -> Overlay {
        self.player.overlay()
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn url_error(&self) -> Option<&str> {
        self.url_error.as_deref()
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn caption_error(&self) -> Option<&str> {
        self.caption_error.as_deref()
    }

    pub fn captions(&self) -> &Arc<CaptionList> {
        &self.captions
    }

    pub fn player(&self) -> &PlayerView {
        &self.player
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(&PlayerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::PlaybackKind;
    use crate::types::{BlankLines, PlayerState};

    #[test]
    fn test_empty_url_keeps_current_video() {
        let mut app = AppState::default();
        app.load_video("https://example.com/a.webm").unwrap();
        let generation = app.player().generation();

        let err = app.load_video("   ").unwrap_err();
        assert!(matches!(err, Error::EmptyUrl));
        assert_eq!(app.url_error(), Some("Please enter a valid video URL."));
        assert_eq!(app.url(), "https://example.com/a.webm");
        assert_eq!(app.player().generation(), generation);

        app.load_video("https://example.com/b.mp4").unwrap();
        assert_eq!(app.url_error(), None);
    }

    #[test]
    fn test_load_classifies_source() {
        let mut app = AppState::default();
        match app.load_video("https://youtu.be/dQw4w9WgXcQ").unwrap() {
            UrlChange::Loaded { generation, source } => {
                assert_eq!(generation, 1);
                assert_eq!(source.kind(), PlaybackKind::Embedded);
                assert_eq!(source.video_id(), Some("dQw4w9WgXcQ"));
            }
            UrlChange::Unchanged => panic!("expected a new load"),
        }
        assert_eq!(app.player().state(), PlayerState::Loading);
    }

    #[test]
    fn test_same_url_is_unchanged() {
        let mut app = AppState::default();
        app.load_video("movie.mp4").unwrap();
        assert_eq!(app.load_video("movie.mp4").unwrap(), UrlChange::Unchanged);
        assert_eq!(app.player().generation(), 1);
    }

    #[test]
    fn test_bad_captions_keep_list_and_draft() {
        let mut app = AppState::default();
        assert_eq!(app.add_captions("00:00:01 first").unwrap(), 1);

        let input = "00:00:05 fine\n00:05 broken";
        let err = app.add_captions(input).unwrap_err();
        assert!(err.is_user_correctable());
        assert_eq!(app.draft(), input);
        assert!(app.caption_error().unwrap().starts_with("Line 2:"));
        assert_eq!(app.captions().len(), 1);
        assert_eq!(app.captions().as_slice()[0].text, "first");
    }

    #[test]
    fn test_submit_draft_clears_editor() {
        let mut app = AppState::default();
        app.set_draft("00:01:00 Caption text");
        assert_eq!(app.submit_draft().unwrap(), 1);
        assert_eq!(app.draft(), "");
        assert_eq!(app.caption_error(), None);
        assert_eq!(app.captions().as_slice()[0].time, 60.0);
    }

    #[test]
    fn test_config_blank_line_policy() {
        let config = PlayerConfig {
            blank_lines: BlankLines::Skip,
            ..Default::default()
        };
        let mut app = AppState::new(&config);
        assert_eq!(app.add_captions("00:00:01 a\n\n00:00:02 b\n").unwrap(), 2);
    }

    #[test]
    fn test_overlay_follows_clock() {
        let mut app = AppState::default();
        app.add_captions("00:01:05 Hello").unwrap();
        let UrlChange::Loaded { generation, .. } = app.load_video("clip.mov").unwrap() else {
            panic!("expected a new load");
        };

        app.apply(ClockEvent::ready(generation));
        app.apply(ClockEvent::tick(generation, 65.3));
        assert_eq!(
            app.overlay(),
            Overlay {
                text: "Hello".to_string(),
                loading: false,
                state: PlayerState::Ready,
            }
        );
    }
}
