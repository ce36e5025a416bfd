//! Headless playback backends
//!
//! Simulated stand-ins for a browser video element and an embedded YouTube
//! player, driven by tokio time. The CLI plays captions against them, and
//! with a paused tokio clock they make session tests deterministic.

use crate::clock::{
    EmbeddedPlayer, Listener, ListenerId, ListenerSet, MediaElement, MediaEvent, PlayerSignal,
    RemoteState,
};
use crate::session::BackendFactory;
use crate::source::MediaType;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

/// Timing of a simulated backend
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadlessTiming {
    /// Delay before the backend reports ready; `None` never becomes ready
    pub ready_after: Option<Duration>,
    /// Period of `TimeUpdate` events from a headless video
    pub time_update_every: Duration,
    /// Playback speed
    pub rate: f64,
}

impl Default for HeadlessTiming {
    fn default() -> Self {
        Self {
            ready_after: Some(Duration::from_millis(200)),
            // Browsers fire timeupdate roughly every 250ms.
            time_update_every: Duration::from_millis(250),
            rate: 1.0,
        }
    }
}

/// Playback position that starts advancing once the backend is ready
#[derive(Debug, Default)]
struct PlayClock {
    started: Mutex<Option<Instant>>,
}

impl PlayClock {
    fn start(&self) {
        if let Ok(mut started) = self.started.lock() {
            started.get_or_insert_with(Instant::now);
        }
    }

    fn position(&self, rate: f64) -> f64 {
        self.started
            .lock()
            .ok()
            .and_then(|started| *started)
            .map(|at| at.elapsed().as_secs_f64() * rate)
            .unwrap_or(0.0)
    }
}

/// Simulated direct media element
pub struct HeadlessVideo {
    url: String,
    media_type: MediaType,
    timing: HeadlessTiming,
    clock: PlayClock,
    time_update: ListenerSet<()>,
    data_ready: ListenerSet<()>,
    driver: Mutex<Option<JoinHandle<()>>>,
}

impl HeadlessVideo {
    /// Create and start the element. Must be called from within a tokio
    /// runtime.
    pub fn spawn(url: &str, media_type: MediaType, timing: HeadlessTiming) -> Arc<Self> {
        let video = Arc::new(Self {
            url: url.to_string(),
            media_type,
            timing,
            clock: PlayClock::default(),
            time_update: ListenerSet::new(),
            data_ready: ListenerSet::new(),
            driver: Mutex::new(None),
        });

        let task = tokio::spawn(drive_video(Arc::downgrade(&video), timing));
        if let Ok(mut driver) = video.driver.lock() {
            *driver = Some(task);
        }
        video
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn media_type(&self) -> MediaType {
        self.media_type
    }

    /// Number of registered listeners
    pub fn listener_count(&self) -> usize {
        self.time_update.len() + self.data_ready.len()
    }
}

impl MediaElement for HeadlessVideo {
    fn current_time(&self) -> f64 {
        self.clock.position(self.timing.rate)
    }

    fn add_listener(&self, event: MediaEvent, listener: Listener<()>) -> ListenerId {
        match event {
            MediaEvent::TimeUpdate => self.time_update.add(listener),
            MediaEvent::DataReady => self.data_ready.add(listener),
        }
    }

    fn remove_listener(&self, id: ListenerId) {
        if !self.time_update.remove(id) {
            self.data_ready.remove(id);
        }
    }
}

impl Drop for HeadlessVideo {
    fn drop(&mut self) {
        if let Ok(mut driver) = self.driver.lock() {
            if let Some(task) = driver.take() {
                task.abort();
            }
        }
    }
}

async fn drive_video(video: Weak<HeadlessVideo>, timing: HeadlessTiming) {
    let Some(delay) = timing.ready_after else {
        return;
    };
    tokio::time::sleep(delay).await;

    match video.upgrade() {
        Some(video) => {
            debug!(url = %video.url, "Headless video ready");
            video.clock.start();
            video.data_ready.emit(());
        }
        None => return,
    }

    let mut ticker = tokio::time::interval(timing.time_update_every);
    loop {
        ticker.tick().await;
        let Some(video) = video.upgrade() else {
            break;
        };
        video.time_update.emit(());
    }
}

/// Simulated embedded player
pub struct HeadlessPlayer {
    video_id: Option<String>,
    timing: HeadlessTiming,
    clock: PlayClock,
    signals: ListenerSet<PlayerSignal>,
    driver: Mutex<Option<JoinHandle<()>>>,
}

impl HeadlessPlayer {
    /// Create and start the player. Must be called from within a tokio
    /// runtime.
    pub fn spawn(video_id: Option<&str>, timing: HeadlessTiming) -> Arc<Self> {
        let player = Arc::new(Self {
            video_id: video_id.map(str::to_string),
            timing,
            clock: PlayClock::default(),
            signals: ListenerSet::new(),
            driver: Mutex::new(None),
        });

        let task = tokio::spawn(drive_player(Arc::downgrade(&player), timing));
        if let Ok(mut driver) = player.driver.lock() {
            *driver = Some(task);
        }
        player
    }

    pub fn video_id(&self) -> Option<&str> {
        self.video_id.as_deref()
    }

    /// Number of registered listeners
    pub fn listener_count(&self) -> usize {
        self.signals.len()
    }
}

impl EmbeddedPlayer for HeadlessPlayer {
    fn current_time(&self) -> f64 {
        self.clock.position(self.timing.rate)
    }

    fn subscribe(&self, listener: Listener<PlayerSignal>) -> ListenerId {
        self.signals.add(listener)
    }

    fn unsubscribe(&self, id: ListenerId) {
        self.signals.remove(id);
    }
}

impl Drop for HeadlessPlayer {
    fn drop(&mut self) {
        if let Ok(mut driver) = self.driver.lock() {
            if let Some(task) = driver.take() {
                task.abort();
            }
        }
    }
}

async fn drive_player(player: Weak<HeadlessPlayer>, timing: HeadlessTiming) {
    let Some(delay) = timing.ready_after else {
        return;
    };
    tokio::time::sleep(delay).await;

    if let Some(player) = player.upgrade() {
        debug!(video_id = ?player.video_id, "Headless player ready");
        player.signals.emit(PlayerSignal::Ready);
        player.clock.start();
        player.signals.emit(PlayerSignal::StateChange(RemoteState::Playing));
    }
}

/// Builds headless backends and remembers the latest of each kind
#[derive(Default)]
pub struct HeadlessFactory {
    timing: HeadlessTiming,
    last_video: Mutex<Option<Arc<HeadlessVideo>>>,
    last_player: Mutex<Option<Arc<HeadlessPlayer>>>,
}

impl HeadlessFactory {
    pub fn new(timing: HeadlessTiming) -> Self {
        Self {
            timing,
            ..Default::default()
        }
    }

    pub fn last_video(&self) -> Option<Arc<HeadlessVideo>> {
        self.last_video.lock().ok().and_then(|v| v.clone())
    }

    pub fn last_player(&self) -> Option<Arc<HeadlessPlayer>> {
        self.last_player.lock().ok().and_then(|p| p.clone())
    }
}

impl BackendFactory for HeadlessFactory {
    fn media_element(&self, url: &str, media_type: MediaType) -> Arc<dyn MediaElement> {
        let video = HeadlessVideo::spawn(url, media_type, self.timing);
        if let Ok(mut last) = self.last_video.lock() {
            *last = Some(Arc::clone(&video));
        }
        video
    }

    fn embedded_player(&self, _url: &str, video_id: Option<&str>) -> Arc<dyn EmbeddedPlayer> {
        let player = HeadlessPlayer::spawn(video_id, self.timing);
        if let Ok(mut last) = self.last_player.lock() {
            *last = Some(Arc::clone(&player));
        }
        player
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_video_position_starts_at_ready() {
        let video = HeadlessVideo::spawn("a.mp4", MediaType::Mp4, HeadlessTiming::default());
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(video.current_time(), 0.0);

        tokio::time::sleep(Duration::from_millis(1100)).await;
        let position = video.current_time();
        assert!((position - 1.0).abs() < 1e-6, "position was {position}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_ready_player_stays_at_zero() {
        let timing = HeadlessTiming {
            ready_after: None,
            ..Default::default()
        };
        let player = HeadlessPlayer::spawn(Some("dQw4w9WgXcQ"), timing);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(player.current_time(), 0.0);
        assert_eq!(player.video_id(), Some("dQw4w9WgXcQ"));
    }
}
