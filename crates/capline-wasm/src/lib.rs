//! Capline WASM - WebAssembly caption overlay bindings
//!
//! Exposes the caption parser, resolver and URL classifier to the browser,
//! plus a [`CaptionOverlay`] that drives captions from a `<video>` element
//! or an embedded YouTube player.
//!
//! ## Usage
//!
//! ```javascript
//! import init, { CaptionOverlay } from '@capline/wasm';
//!
//! await init();
//! const overlay = new CaptionOverlay();
//! overlay.onChange(({ text, loading }) => render(text, loading));
//!
//! const load = overlay.loadVideo(url);
//! if (!load.changed) {
//!   // already playing
//! } else if (load.source.kind === 'direct_media') {
//!   video.src = load.source.url;
//!   overlay.attachVideo(video);
//! } else {
//!   const player = new YT.Player('player', {
//!     videoId: load.source.video_id,
//!     events: {
//!       onReady: () => overlay.youtubeReady(),
//!       onStateChange: (e) => overlay.youtubeStateChange(e.data),
//!     },
//!   });
//!   overlay.attachYoutube(player);
//! }
//! ```

use capline_core::{CaptionList, PlaybackSource};
use wasm_bindgen::prelude::*;

mod overlay;

pub use overlay::CaptionOverlay;

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
    web_sys::console::log_1(&"[Capline WASM] Initialized".into());
}

/// Library version
#[wasm_bindgen]
pub fn version() -> String {
    capline_core::VERSION.to_string()
}

/// Parse caption text into an array of `{ time, text }` objects
#[wasm_bindgen(js_name = parseCaptions)]
pub fn parse_captions(text: &str) -> Result<JsValue, JsError> {
    let captions = capline_core::parse_captions(text)?;
    Ok(serde_wasm_bindgen::to_value(&captions)?)
}

/// Caption text to show at `time` seconds, empty if none
#[wasm_bindgen(js_name = resolveCaption)]
pub fn resolve_caption(time: f64, captions: JsValue) -> Result<String, JsError> {
    let captions: CaptionList = serde_wasm_bindgen::from_value(captions)?;
    Ok(capline_core::resolve_caption(time, &captions).to_string())
}

/// Classify a video URL, `undefined` for an empty URL
#[wasm_bindgen(js_name = classifyUrl)]
pub fn classify_url(url: &str) -> Result<JsValue, JsError> {
    match PlaybackSource::classify(url.trim()) {
        Some(source) => Ok(serde_wasm_bindgen::to_value(&source)?),
        None => Ok(JsValue::UNDEFINED),
    }
}

/// Format seconds as `HH:MM:SS`
#[wasm_bindgen(js_name = formatTimestamp)]
pub fn format_timestamp(seconds: f64) -> String {
    capline_core::format_timestamp(seconds)
}
