//! Player Session - runtime orchestrator for one caption overlay
//!
//! Coordinates:
//! - URL classification and backend creation
//! - Clock attachment and teardown on every URL change
//! - Caption list replacement
//! - Overlay broadcasting
//!
//! Backend callbacks never touch the state directly. They push
//! [`ClockEvent`]s into a channel, and a single task applies them in order
//! and publishes the resulting [`Overlay`].

use crate::{
    app::{AppState, UrlChange},
    clock::{ClockEvent, ClockGuard, ClockSink, DirectMediaClock, EmbeddedPlayer, MediaElement, PollingClock},
    source::{MediaType, PlaybackSource},
    state::Overlay,
    types::{CaptionList, PlayerConfig, SessionId},
    Result,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument};

/// Creates playback backends for classified URLs
pub trait BackendFactory: Send + Sync {
    /// A push-based element playing a direct media file
    fn media_element(&self, url: &str, media_type: MediaType) -> Arc<dyn MediaElement>;

    /// A pull-based embedded player for a YouTube video
    fn embedded_player(&self, url: &str, video_id: Option<&str>) -> Arc<dyn EmbeddedPlayer>;
}

/// Player session driving one overlay
pub struct PlayerSession {
    /// Unique session ID
    id: SessionId,
    /// Session configuration
    config: PlayerConfig,
    /// Page and player state
    app: Arc<RwLock<AppState>>,
    /// Overlay broadcaster
    overlay_tx: watch::Sender<Overlay>,
    /// Clock event intake
    events_tx: mpsc::UnboundedSender<ClockEvent>,
    /// Backend construction
    factory: Arc<dyn BackendFactory>,
    /// Listeners and timers of the current source
    clock: Mutex<Option<ClockGuard>>,
    /// Event loop task
    event_loop: JoinHandle<()>,
}

impl PlayerSession {
    /// Create a new session. Must be called from within a tokio runtime.
    pub fn new(config: PlayerConfig, factory: Arc<dyn BackendFactory>) -> Self {
        let app = Arc::new(RwLock::new(AppState::new(&config)));
        let (overlay_tx, _) = watch::channel(Overlay::default());
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let event_loop = tokio::spawn(run_event_loop(
            Arc::clone(&app),
            events_rx,
            overlay_tx.clone(),
        ));

        let id = SessionId::new();
        info!(session_id = %id, "Player session created");

        Self {
            id,
            config,
            app,
            overlay_tx,
            events_tx,
            factory,
            clock: Mutex::new(None),
            event_loop,
        }
    }

    /// Get session ID
    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    /// Load a video URL, replacing the current source
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub async fn load_video(&self, url: &str) -> Result<UrlChange> {
        // Held across the state change so concurrent loads attach their
        // clocks in generation order.
        let mut clock = self.clock.lock().await;
        let change = self.app.write().await.load_video(url)?;

        if let UrlChange::Loaded { generation, source } = &change {
            // Old listeners and timers go before the new backend attaches.
            drop(clock.take());
            *clock = Some(self.attach(source, *generation));
            self.publish().await;
        }

        Ok(change)
    }

    fn attach(&self, source: &PlaybackSource, generation: u64) -> ClockGuard {
        let sink: Arc<dyn ClockSink> = Arc::new(self.events_tx.clone());

        match source {
            PlaybackSource::DirectMedia { url, media_type } => {
                debug!(url = %url, mime = media_type.mime_type(), "Attaching media element");
                let element = self.factory.media_element(url, *media_type);
                DirectMediaClock::attach(element, generation, sink)
            }
            PlaybackSource::Embedded { url, video_id } => {
                debug!(url = %url, video_id = ?video_id, "Attaching embedded player");
                let player = self.factory.embedded_player(url, video_id.as_deref());
                PollingClock::attach(
                    player,
                    generation,
                    sink,
                    Duration::from_millis(self.config.poll_interval_ms),
                )
            }
        }
    }

    /// Parse caption text and replace the caption list
    #[instrument(skip(self, text), fields(session_id = %self.id))]
    pub async fn add_captions(&self, text: &str) -> Result<usize> {
        let count = self.app.write().await.add_captions(text)?;
        self.publish().await;
        Ok(count)
    }

    /// Detach the current source and return to idle
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub async fn shutdown(&self) {
        drop(self.clock.lock().await.take());
        self.app.write().await.unload();
        self.publish().await;
        info!("Session shut down");
    }

    /// Current overlay
    pub fn overlay(&self) -> Overlay {
        self.overlay_tx.borrow().clone()
    }

    /// Subscribe to overlay changes
    pub fn subscribe(&self) -> watch::Receiver<Overlay> {
        self.overlay_tx.subscribe()
    }

    /// Current caption list
    pub async fn captions(&self) -> Arc<CaptionList> {
        Arc::clone(self.app.read().await.captions())
    }

    /// Current source, if any
    pub async fn source(&self) -> Option<PlaybackSource> {
        self.app.read().await.player().source().cloned()
    }

    /// Generation of the current load
    pub async fn generation(&self) -> u64 {
        self.app.read().await.player().generation()
    }

    /// Generation the attached clock delivers events for
    pub async fn clock_generation(&self) -> Option<u64> {
        self.clock.lock().await.as_ref().map(ClockGuard::generation)
    }

    /// Last sampled playback position
    pub async fn position(&self) -> Option<f64> {
        self.app.read().await.player().last_time()
    }

    async fn publish(&self) {
        // Hold the read lock while sending so the event loop cannot publish
        // a newer overlay in between.
        let app = self.app.read().await;
        let overlay = app.overlay();
        self.overlay_tx.send_if_modified(|current| {
            if *current == overlay {
                return false;
            }
            *current = overlay;
            true
        });
    }
}

impl Drop for PlayerSession {
    fn drop(&mut self) {
        self.event_loop.abort();
    }
}

async fn run_event_loop(
    app: Arc<RwLock<AppState>>,
    mut events: mpsc::UnboundedReceiver<ClockEvent>,
    overlay_tx: watch::Sender<Overlay>,
) {
    while let Some(event) = events.recv().await {
        let mut app = app.write().await;
        if app.apply(event) {
            let overlay = app.overlay();
            overlay_tx.send_replace(overlay);
        }
    }
}
