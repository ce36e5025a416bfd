//! Playback clocks
//!
//! Two backends report playback position in different ways:
//!
//! - a [`MediaElement`] pushes `TimeUpdate` events and the position is read
//!   when one arrives ([`DirectMediaClock`])
//! - an [`EmbeddedPlayer`] only answers position queries, so it is sampled on
//!   a timer once it reports ready (`PollingClock`, `runtime` feature)
//!
//! Both turn into [`ClockEvent`]s tagged with the load generation they belong
//! to, delivered to a [`ClockSink`]. Attaching a clock returns a
//! [`ClockGuard`]; dropping the guard removes every listener and stops every
//! timer the clock created.

mod direct;
#[cfg(feature = "runtime")]
mod polling;

pub use direct::DirectMediaClock;
#[cfg(feature = "runtime")]
pub use polling::PollingClock;

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Handle returned when registering a listener
pub type ListenerId = u64;

/// Callback registered with a backend
pub type Listener<T> = Box<dyn Fn(T) + Send + Sync>;

/// Events a media element emits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaEvent {
    /// Playback position advanced
    TimeUpdate,
    /// Enough data is loaded to render
    DataReady,
}

/// A locally controlled, push-based playback element
pub trait MediaElement: Send + Sync {
    /// Current playback position in seconds
    fn current_time(&self) -> f64;

    /// Register a listener for an event
    fn add_listener(&self, event: MediaEvent, listener: Listener<()>) -> ListenerId;

    /// Remove a listener previously returned by [`MediaElement::add_listener`]
    fn remove_listener(&self, id: ListenerId);
}

/// Embedded player states, numbered like the YouTube IFrame API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RemoteState {
    Unstarted,
    Ended,
    Playing,
    Paused,
    Buffering,
    Cued,
}

impl RemoteState {
    /// Map an IFrame API state code
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            -1 => Some(RemoteState::Unstarted),
            0 => Some(RemoteState::Ended),
            1 => Some(RemoteState::Playing),
            2 => Some(RemoteState::Paused),
            3 => Some(RemoteState::Buffering),
            5 => Some(RemoteState::Cued),
            _ => None,
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            RemoteState::Unstarted => -1,
            RemoteState::Ended => 0,
            RemoteState::Playing => 1,
            RemoteState::Paused => 2,
            RemoteState::Buffering => 3,
            RemoteState::Cued => 5,
        }
    }
}

/// Signals an embedded player emits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerSignal {
    Ready,
    StateChange(RemoteState),
}

/// A third-party hosted, pull-based player
pub trait EmbeddedPlayer: Send + Sync {
    /// Current playback position in seconds
    fn current_time(&self) -> f64;

    /// Register a listener for ready and state change signals
    fn subscribe(&self, listener: Listener<PlayerSignal>) -> ListenerId;

    /// Remove a listener previously returned by [`EmbeddedPlayer::subscribe`]
    fn unsubscribe(&self, id: ListenerId);
}

/// What a clock observed
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ClockEventKind {
    /// A position sample in seconds
    Tick(f64),
    /// The backend can play
    Ready,
}

/// A clock observation, tagged with the load it belongs to
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClockEvent {
    pub generation: u64,
    pub kind: ClockEventKind,
}

impl ClockEvent {
    pub fn tick(generation: u64, time: f64) -> Self {
        Self {
            generation,
            kind: ClockEventKind::Tick(time),
        }
    }

    pub fn ready(generation: u64) -> Self {
        Self {
            generation,
            kind: ClockEventKind::Ready,
        }
    }
}

/// Receiver of clock events
pub trait ClockSink: Send + Sync {
    fn deliver(&self, event: ClockEvent);
}

#[cfg(feature = "runtime")]
impl ClockSink for tokio::sync::mpsc::UnboundedSender<ClockEvent> {
    fn deliver(&self, event: ClockEvent) {
        // The receiver only goes away when the session shuts down.
        let _ = self.send(event);
    }
}

type Release = Box<dyn FnOnce() + Send>;

/// Scoped ownership of a clock's listeners and timers.
///
/// Everything registered on behalf of one load is released when the guard
/// is dropped, before the next load attaches its own clock.
pub struct ClockGuard {
    generation: u64,
    releases: Vec<Release>,
}

impl ClockGuard {
    pub(crate) fn new(generation: u64) -> Self {
        Self {
            generation,
            releases: Vec::new(),
        }
    }

    pub(crate) fn on_release(&mut self, release: impl FnOnce() + Send + 'static) {
        self.releases.push(Box::new(release));
    }

    /// Generation of the load this guard belongs to
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl Drop for ClockGuard {
    fn drop(&mut self) {
        debug!(generation = self.generation, "Releasing clock");
        for release in self.releases.drain(..) {
            release();
        }
    }
}

impl std::fmt::Debug for ClockGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClockGuard")
            .field("generation", &self.generation)
            .field("releases", &self.releases.len())
            .finish()
    }
}

static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);

/// Listener registry for backend implementations.
///
/// Ids are unique across every set in the process, so a backend holding
/// several sets can remove an id from all of them.
pub struct ListenerSet<T> {
    entries: Mutex<Vec<(ListenerId, Arc<dyn Fn(T) + Send + Sync>)>>,
}

impl<T: Clone> ListenerSet<T> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }

    pub fn add(&self, listener: Listener<T>) -> ListenerId {
        let id = NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut entries) = self.entries.lock() {
            entries.push((id, Arc::from(listener)));
        }
        id
    }

    /// Returns true if the id was registered here
    pub fn remove(&self, id: ListenerId) -> bool {
        match self.entries.lock() {
            Ok(mut entries) => {
                let before = entries.len();
                entries.retain(|(existing, _)| *existing != id);
                entries.len() != before
            }
            Err(_) => false,
        }
    }

    /// Call every listener. Listeners run outside the lock, so they may add
    /// or remove listeners themselves.
    pub fn emit(&self, value: T) {
        let listeners: Vec<_> = match self.entries.lock() {
            Ok(entries) => entries.iter().map(|(_, l)| Arc::clone(l)).collect(),
            Err(_) => return,
        };
        for listener in listeners {
            listener(value.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Clone> Default for ListenerSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_remote_state_codes() {
        for code in [-1, 0, 1, 2, 3, 5] {
            assert_eq!(RemoteState::from_code(code).unwrap().code(), code);
        }
        assert_eq!(RemoteState::from_code(4), None);
    }

    #[test]
    fn test_listener_set_add_remove() {
        let set: ListenerSet<()> = ListenerSet::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&hits);
        let id = set.add(Box::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        set.emit(());
        assert!(set.remove(id));
        assert!(!set.remove(id));
        set.emit(());

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(set.is_empty());
    }

    #[test]
    fn test_guard_runs_releases_once() {
        let released = Arc::new(AtomicUsize::new(0));
        {
            let mut guard = ClockGuard::new(7);
            for _ in 0..2 {
                let released = Arc::clone(&released);
                guard.on_release(move || {
                    released.fetch_add(1, Ordering::SeqCst);
                });
            }
            assert_eq!(guard.generation(), 7);
        }
        assert_eq!(released.load(Ordering::SeqCst), 2);
    }
}
