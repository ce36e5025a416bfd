//! Player view state
//!
//! Everything the overlay needs between clock events: the active source,
//! the `Idle -> Loading -> Ready` state, the load generation, the caption
//! list and the caption currently shown. Clock events from an older
//! generation are dropped here, so a late callback from a previous video can
//! never put its caption on the current one.

use crate::captions::resolve_caption_within;
use crate::clock::{ClockEvent, ClockEventKind};
use crate::error::{Error, Result};
use crate::source::PlaybackSource;
use crate::types::{CaptionList, PlayerState};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, trace};

/// What the page renders on top of the video
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Overlay {
    /// Caption text, empty when no caption is active
    pub text: String,
    /// Show the loading indicator
    pub loading: bool,
    pub state: PlayerState,
}

/// State of the player view for the current URL
#[derive(Debug, Clone)]
pub struct PlayerView {
    source: Option<PlaybackSource>,
    state: PlayerState,
    generation: u64,
    captions: Arc<CaptionList>,
    tolerance: f64,
    last_time: Option<f64>,
    caption: String,
}

impl PlayerView {
    pub fn new(tolerance: f64) -> Self {
        Self {
            source: None,
            state: PlayerState::Idle,
            generation: 0,
            captions: Arc::new(CaptionList::new()),
            tolerance,
            last_time: None,
            caption: String::new(),
        }
    }

    /// Start a new load. Returns the generation clock events for this source
    /// must carry.
    pub fn load(&mut self, source: PlaybackSource) -> Result<u64> {
        self.transition(PlayerState::Loading)?;
        self.generation += 1;
        self.last_time = None;
        self.caption.clear();

        info!(
            url = source.url(),
            kind = %source.kind(),
            generation = self.generation,
            "Loading source"
        );
        self.source = Some(source);
        Ok(self.generation)
    }

    /// Tear the source down and return to idle
    pub fn unload(&mut self) {
        self.generation += 1;
        self.source = None;
        self.last_time = None;
        self.caption.clear();
        self.state = PlayerState::Idle;
    }

    /// Replace the caption list. The caption is re-resolved against the last
    /// sample so the overlay does not wait for the next tick.
    pub fn set_captions(&mut self, captions: Arc<CaptionList>) -> bool {
        self.captions = captions;
        match self.last_time {
            Some(time) => self.show_caption_at(time),
            None => false,
        }
    }

    /// Apply a clock event. Returns true if the overlay changed.
    pub fn apply(&mut self, event: ClockEvent) -> bool {
        if event.generation != self.generation || self.state == PlayerState::Idle {
            trace!(
                event_generation = event.generation,
                generation = self.generation,
                "Dropping stale clock event"
            );
            return false;
        }

        match event.kind {
            ClockEventKind::Ready => {
                if self.state == PlayerState::Ready {
                    return false;
                }
                // Loading -> Ready is always allowed.
                self.state = PlayerState::Ready;
                info!(generation = self.generation, "Source ready");
                true
            }
            ClockEventKind::Tick(time) => {
                self.last_time = Some(time);
                self.show_caption_at(time)
            }
        }
    }

    fn show_caption_at(&mut self, time: f64) -> bool {
        let text = resolve_caption_within(time, &self.captions, self.tolerance);
        if text == self.caption {
            return false;
        }
        debug!(time, caption = text, "Caption changed");
        self.caption = text.to_string();
        true
    }

    fn transition(&mut self, to: PlayerState) -> Result<()> {
        if !self.state.can_transition_to(to) {
            return Err(Error::InvalidStateTransition {
                from: self.state.to_string(),
                to: to.to_string(),
            });
        }
        self.state = to;
        Ok(())
    }

    pub fn overlay(&self) -> Overlay {
        Overlay {
            text: self.caption.clone(),
            loading: self.state.is_loading(),
            state: self.state,
        }
    }

    pub fn source(&self) -> Option<&PlaybackSource> {
        self.source.as_ref()
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn caption(&self) -> &str {
        &self.caption
    }

    pub fn captions(&self) -> &Arc<CaptionList> {
        &self.captions
    }

    pub fn last_time(&self) -> Option<f64> {
        self.last_time
    }
}

impl Default for PlayerView {
    fn default() -> Self {
        Self::new(crate::captions::TOLERANCE_SECS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Caption;

    fn captions() -> Arc<CaptionList> {
        Arc::new(CaptionList::from(vec![
            Caption::new(10.0, "ten"),
            Caption::new(20.0, "twenty"),
        ]))
    }

    fn source(url: &str) -> PlaybackSource {
        PlaybackSource::classify(url).unwrap()
    }

    #[test]
    fn test_load_enters_loading() {
        let mut view = PlayerView::default();
        assert_eq!(view.state(), PlayerState::Idle);
        assert!(!view.overlay().loading);

        let generation = view.load(source("movie.mp4")).unwrap();
        assert_eq!(generation, 1);
        assert_eq!(view.state(), PlayerState::Loading);
        assert!(view.overlay().loading);
    }

    #[test]
    fn test_ready_clears_loading_once() {
        let mut view = PlayerView::default();
        let generation = view.load(source("movie.mp4")).unwrap();

        assert!(view.apply(ClockEvent::ready(generation)));
        assert!(!view.overlay().loading);
        assert!(!view.apply(ClockEvent::ready(generation)));
    }

    #[test]
    fn test_ticks_resolve_captions() {
        let mut view = PlayerView::default();
        view.set_captions(captions());
        let generation = view.load(source("movie.mp4")).unwrap();

        assert!(view.apply(ClockEvent::tick(generation, 10.2)));
        assert_eq!(view.caption(), "ten");
        assert!(!view.apply(ClockEvent::tick(generation, 10.3)));
        assert!(view.apply(ClockEvent::tick(generation, 15.0)));
        assert_eq!(view.caption(), "");
    }

    #[test]
    fn test_ticks_resolve_while_loading() {
        let mut view = PlayerView::default();
        view.set_captions(captions());
        let generation = view.load(source("movie.mp4")).unwrap();

        view.apply(ClockEvent::tick(generation, 20.0));
        assert_eq!(view.overlay().text, "twenty");
        assert!(view.overlay().loading);
    }

    #[test]
    fn test_stale_generation_ignored() {
        let mut view = PlayerView::default();
        view.set_captions(captions());
        let old = view.load(source("first.mp4")).unwrap();
        let new = view.load(source("https://youtu.be/dQw4w9WgXcQ")).unwrap();
        assert_ne!(old, new);

        assert!(!view.apply(ClockEvent::tick(old, 10.0)));
        assert!(!view.apply(ClockEvent::ready(old)));
        assert_eq!(view.caption(), "");
        assert_eq!(view.state(), PlayerState::Loading);
    }

    #[test]
    fn test_reload_clears_caption() {
        let mut view = PlayerView::default();
        view.set_captions(captions());
        let generation = view.load(source("first.mp4")).unwrap();
        view.apply(ClockEvent::ready(generation));
        view.apply(ClockEvent::tick(generation, 10.0));
        assert_eq!(view.caption(), "ten");

        view.load(source("second.mp4")).unwrap();
        assert_eq!(view.caption(), "");
        assert_eq!(view.state(), PlayerState::Loading);
    }

    #[test]
    fn test_unload_drops_events() {
        let mut view = PlayerView::default();
        let generation = view.load(source("first.mp4")).unwrap();
        view.unload();

        assert_eq!(view.state(), PlayerState::Idle);
        assert!(view.source().is_none());
        assert!(!view.apply(ClockEvent::ready(generation)));
        assert!(!view.apply(ClockEvent::ready(view.generation())));
    }

    #[test]
    fn test_new_captions_apply_to_last_sample() {
        let mut view = PlayerView::default();
        let generation = view.load(source("movie.mp4")).unwrap();
        view.apply(ClockEvent::tick(generation, 20.1));
        assert_eq!(view.caption(), "");

        assert!(view.set_captions(captions()));
        assert_eq!(view.caption(), "twenty");
    }
}
