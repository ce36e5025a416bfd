//! Capline Core - caption overlay library
//!
//! This crate provides the core functionality for overlaying typed captions
//! on a playing video:
//! - Caption text parsing (`HH:MM:SS text` per line)
//! - Caption resolution against the playback position
//! - URL classification (direct media vs. embedded YouTube player)
//! - Push and pull playback clocks with scoped teardown
//! - Page and player state containers
//! - A tokio-driven player session and headless backends (`runtime` feature)
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                          Capline Core                          │
//! ├────────────────────────────────────────────────────────────────┤
//! │                                                                │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐          │
//! │  │   Caption    │  │    Source    │  │   Playback   │          │
//! │  │    Parser    │  │  Classifier  │  │    Clocks    │          │
//! │  └──────┬───────┘  └──────┬───────┘  └──────┬───────┘          │
//! │         │                 │                 │                  │
//! │         └─────────────────┼─────────────────┘                  │
//! │                           │                                    │
//! │                    ┌──────┴──────┐                             │
//! │                    │  App State  │──── Caption Resolver        │
//! │                    └──────┬──────┘                             │
//! │                           │                                    │
//! │                    ┌──────┴──────┐                             │
//! │                    │   Player    │                             │
//! │                    │   Session   │                             │
//! │                    └─────────────┘                             │
//! └────────────────────────────────────────────────────────────────┘
//! ```

pub mod app;
pub mod captions;
pub mod clock;
pub mod error;
#[cfg(feature = "runtime")]
pub mod headless;
#[cfg(feature = "runtime")]
pub mod session;
pub mod source;
pub mod state;
pub mod types;

pub use app::{AppState, UrlChange};
pub use captions::{
    format_timestamp, parse_captions, resolve_caption, resolve_caption_within, CaptionParser,
    TOLERANCE_SECS,
};
pub use clock::{
    ClockEvent, ClockEventKind, ClockGuard, ClockSink, DirectMediaClock, EmbeddedPlayer,
    MediaElement, MediaEvent, PlayerSignal, RemoteState,
};
pub use error::{Error, Result, TimestampIssue};
#[cfg(feature = "runtime")]
pub use clock::PollingClock;
#[cfg(feature = "runtime")]
pub use headless::{HeadlessFactory, HeadlessPlayer, HeadlessTiming, HeadlessVideo};
#[cfg(feature = "runtime")]
pub use session::{BackendFactory, PlayerSession};
pub use source::{is_youtube_url, youtube_id, MediaType, PlaybackKind, PlaybackSource};
pub use state::{Overlay, PlayerView};
pub use types::*;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the library
pub fn init() {
    tracing::info!(version = VERSION, "Capline Core initialized");
}
