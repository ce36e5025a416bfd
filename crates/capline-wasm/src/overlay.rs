//! Caption Overlay - browser side of the player view
//!
//! A `<video>` element pushes `timeupdate` events; a YouTube IFrame player
//! has to be polled with `setInterval`. Both feed [`ClockEvent`]s tagged
//! with the load generation into the shared [`AppState`], so callbacks left
//! over from a previous URL are ignored. Listeners and timers are removed
//! when the binding is dropped, which happens on every URL change.

use capline_core::{AppState, ClockEvent, PlaybackSource, PlayerConfig, RemoteState, UrlChange};
use js_sys::{Function, Reflect};
use serde::Serialize;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Event, HtmlVideoElement};

/// `HAVE_CURRENT_DATA` ready state of a media element
const HAVE_CURRENT_DATA: u16 = 2;

/// Result of `loadVideo`
#[derive(Serialize)]
struct LoadResult<'a> {
    /// False when the URL was already loaded
    changed: bool,
    generation: u64,
    mime_type: Option<&'static str>,
    source: &'a PlaybackSource,
}

/// State shared with event and timer callbacks
struct Shared {
    app: RefCell<AppState>,
    on_change: RefCell<Option<Function>>,
    notify_pending: Cell<bool>,
}

impl Shared {
    fn new(app: AppState) -> Self {
        Self {
            app: RefCell::new(app),
            on_change: RefCell::new(None),
            notify_pending: Cell::new(false),
        }
    }

    /// Mark a change callback as queued. False if one is already queued.
    fn queue_change(&self) -> bool {
        !self.notify_pending.replace(true)
    }

    fn emit_change(&self) {
        self.notify_pending.set(false);
        let overlay = self.app.borrow().overlay();
        let Some(callback) = self.on_change.borrow().clone() else {
            return;
        };
        match serde_wasm_bindgen::to_value(&overlay) {
            Ok(value) => {
                if let Err(err) = callback.call1(&JsValue::NULL, &value) {
                    web_sys::console::error_1(&err);
                }
            }
            Err(err) => web_sys::console::error_1(&err.to_string().into()),
        }
    }
}

fn apply(shared: &Rc<Shared>, event: ClockEvent) {
    let changed = shared.app.borrow_mut().apply(event);
    if changed {
        notify(shared);
    }
}

/// Queue the change callback on a microtask. Exported methods hold a borrow
/// of the overlay until they return, so the callback must run after that.
/// Several changes in one task produce one callback with the latest overlay.
fn notify(shared: &Rc<Shared>) {
    if !shared.queue_change() {
        return;
    }
    let weak = Rc::downgrade(shared);
    wasm_bindgen_futures::spawn_local(async move {
        if let Some(shared) = weak.upgrade() {
            shared.emit_change();
        }
    });
}

/// Overlay state as a JSON string
fn overlay_json(app: &AppState) -> serde_json::Result<String> {
    serde_json::to_string(&app.overlay())
}

/// Event listeners registered on a `<video>` element
struct VideoBinding {
    element: HtmlVideoElement,
    listeners: Vec<(&'static str, Closure<dyn FnMut(Event)>)>,
}

impl Drop for VideoBinding {
    fn drop(&mut self) {
        for (event, listener) in &self.listeners {
            let _ = self
                .element
                .remove_event_listener_with_callback(event, listener.as_ref().unchecked_ref());
        }
    }
}

/// A running `setInterval` timer
struct IntervalTimer {
    handle: i32,
    _tick: Closure<dyn FnMut()>,
}

impl Drop for IntervalTimer {
    fn drop(&mut self) {
        if let Some(window) = web_sys::window() {
            window.clear_interval_with_handle(self.handle);
        }
    }
}

/// An embedded YouTube player and its sampling timer
struct YoutubeBinding {
    player: JsValue,
    generation: u64,
    timer: Option<IntervalTimer>,
}

enum Binding {
    Video(VideoBinding),
    Youtube(YoutubeBinding),
}

/// Caption overlay for one player area
#[wasm_bindgen]
pub struct CaptionOverlay {
    shared: Rc<Shared>,
    poll_interval_ms: u64,
    binding: Option<Binding>,
}

#[wasm_bindgen]
impl CaptionOverlay {
    /// Create an overlay. `config` is an optional `PlayerConfig` object.
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<CaptionOverlay, JsError> {
        let config: PlayerConfig = if config.is_undefined() || config.is_null() {
            PlayerConfig::default()
        } else {
            serde_wasm_bindgen::from_value(config)?
        };
        config.validate()?;

        Ok(Self {
            shared: Rc::new(Shared::new(AppState::new(&config))),
            poll_interval_ms: config.poll_interval_ms,
            binding: None,
        })
    }

    /// Register the callback receiving `{ text, loading, state }` on change.
    ///
    /// The callback runs on a microtask after the method or event that caused
    /// the change has returned, so it may call back into the overlay.
    #[wasm_bindgen(js_name = onChange)]
    pub fn on_change(&self, callback: Function) {
        *self.shared.on_change.borrow_mut() = Some(callback);
    }

    /// Load a video URL. Detaches the current element or player.
    #[wasm_bindgen(js_name = loadVideo)]
    pub fn load_video(&mut self, url: &str) -> Result<JsValue, JsError> {
        let change = self.shared.app.borrow_mut().load_video(url);
        let change = match change {
            Ok(change) => change,
            Err(err) => {
                notify(&self.shared);
                return Err(err.into());
            }
        };

        if let UrlChange::Loaded { .. } = change {
            self.binding = None;
        }
        notify(&self.shared);

        let app = self.shared.app.borrow();
        let Some(source) = app.player().source() else {
            return Ok(JsValue::UNDEFINED);
        };
        let result = LoadResult {
            changed: matches!(change, UrlChange::Loaded { .. }),
            generation: app.player().generation(),
            mime_type: source.mime_type(),
            source,
        };
        Ok(serde_wasm_bindgen::to_value(&result)?)
    }

    /// Drive captions from a `<video>` playing the current direct media URL
    #[wasm_bindgen(js_name = attachVideo)]
    pub fn attach_video(&mut self, element: HtmlVideoElement) -> Result<(), JsValue> {
        let generation = self.expect_source(false)?;
        self.binding = None;

        let weak = Rc::downgrade(&self.shared);
        let video = element.clone();
        let on_time = Closure::wrap(Box::new(move |_event: Event| {
            if let Some(shared) = weak.upgrade() {
                apply(&shared, ClockEvent::tick(generation, video.current_time()));
            }
        }) as Box<dyn FnMut(Event)>);

        let weak = Rc::downgrade(&self.shared);
        let on_data = Closure::wrap(Box::new(move |_event: Event| {
            if let Some(shared) = weak.upgrade() {
                apply(&shared, ClockEvent::ready(generation));
            }
        }) as Box<dyn FnMut(Event)>);

        element.add_event_listener_with_callback("timeupdate", on_time.as_ref().unchecked_ref())?;
        element.add_event_listener_with_callback("loadeddata", on_data.as_ref().unchecked_ref())?;

        let already_loaded = element.ready_state() >= HAVE_CURRENT_DATA;
        self.binding = Some(Binding::Video(VideoBinding {
            element,
            listeners: vec![("timeupdate", on_time), ("loadeddata", on_data)],
        }));

        // The data may have arrived before the listener was registered.
        if already_loaded {
            apply(&self.shared, ClockEvent::ready(generation));
        }
        Ok(())
    }

    /// Drive captions from a `YT.Player` embedding the current YouTube URL.
    ///
    /// Forward the player's `onReady` to [`Self::youtube_ready`] and its
    /// `onStateChange` to [`Self::youtube_state_change`].
    #[wasm_bindgen(js_name = attachYoutube)]
    pub fn attach_youtube(&mut self, player: JsValue) -> Result<(), JsValue> {
        let generation = self.expect_source(true)?;
        self.binding = Some(Binding::Youtube(YoutubeBinding {
            player,
            generation,
            timer: None,
        }));
        Ok(())
    }

    /// The embedded player is ready: show it and start sampling its position
    #[wasm_bindgen(js_name = youtubeReady)]
    pub fn youtube_ready(&mut self) -> Result<(), JsValue> {
        let Some(Binding::Youtube(binding)) = &mut self.binding else {
            return Ok(());
        };
        let generation = binding.generation;

        let weak = Rc::downgrade(&self.shared);
        let player = binding.player.clone();
        let tick = Closure::wrap(Box::new(move || {
            let Some(shared) = weak.upgrade() else {
                return;
            };
            match player_time(&player) {
                Ok(time) => apply(&shared, ClockEvent::tick(generation, time)),
                Err(err) => web_sys::console::warn_1(&err),
            }
        }) as Box<dyn FnMut()>);

        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
        let handle = window.set_interval_with_callback_and_timeout_and_arguments_0(
            tick.as_ref().unchecked_ref(),
            i32::try_from(self.poll_interval_ms).unwrap_or(i32::MAX),
        )?;
        // Replacing the timer clears the previous interval.
        binding.timer = Some(IntervalTimer {
            handle,
            _tick: tick,
        });

        apply(&self.shared, ClockEvent::ready(generation));
        Ok(())
    }

    /// Forward a `YT.PlayerState` code
    #[wasm_bindgen(js_name = youtubeStateChange)]
    pub fn youtube_state_change(&self, code: i32) {
        let Some(Binding::Youtube(binding)) = &self.binding else {
            return;
        };
        if RemoteState::from_code(code) == Some(RemoteState::Playing) {
            apply(&self.shared, ClockEvent::ready(binding.generation));
        }
    }

    /// Replace the caption list with parsed `text`
    #[wasm_bindgen(js_name = addCaptions)]
    pub fn add_captions(&self, text: &str) -> Result<usize, JsError> {
        let result = self.shared.app.borrow_mut().add_captions(text);
        notify(&self.shared);
        Ok(result?)
    }

    /// Update the caption editor text
    #[wasm_bindgen(js_name = setDraft)]
    pub fn set_draft(&self, text: String) {
        self.shared.app.borrow_mut().set_draft(text);
    }

    /// Submit the caption editor text
    #[wasm_bindgen(js_name = submitDraft)]
    pub fn submit_draft(&self) -> Result<usize, JsError> {
        let result = self.shared.app.borrow_mut().submit_draft();
        notify(&self.shared);
        Ok(result?)
    }

    /// Remove listeners and timers and return to idle
    pub fn unload(&mut self) {
        self.binding = None;
        self.shared.app.borrow_mut().unload();
        notify(&self.shared);
    }

    /// Overlay state `{ text, loading, state }` as a JSON string
    #[wasm_bindgen(js_name = toJson)]
    pub fn to_json(&self) -> Result<String, JsError> {
        Ok(overlay_json(&self.shared.app.borrow())?)
    }

    /// Current caption text
    #[wasm_bindgen(getter)]
    pub fn caption(&self) -> String {
        self.shared.app.borrow().overlay().text
    }

    #[wasm_bindgen(getter)]
    pub fn loading(&self) -> bool {
        self.shared.app.borrow().overlay().loading
    }

    /// `idle`, `loading` or `ready`
    #[wasm_bindgen(getter)]
    pub fn state(&self) -> String {
        self.shared.app.borrow().player().state().to_string()
    }

    #[wasm_bindgen(getter, js_name = urlError)]
    pub fn url_error(&self) -> Option<String> {
        self.shared.app.borrow().url_error().map(str::to_string)
    }

    #[wasm_bindgen(getter, js_name = captionError)]
    pub fn caption_error(&self) -> Option<String> {
        self.shared.app.borrow().caption_error().map(str::to_string)
    }

    #[wasm_bindgen(getter)]
    pub fn draft(&self) -> String {
        self.shared.app.borrow().draft().to_string()
    }

    #[wasm_bindgen(getter, js_name = captionCount)]
    pub fn caption_count(&self) -> usize {
        self.shared.app.borrow().captions().len()
    }

    #[wasm_bindgen(getter, js_name = mimeType)]
    pub fn mime_type(&self) -> Option<String> {
        let app = self.shared.app.borrow();
        app.player()
            .source()
            .and_then(|s| s.mime_type())
            .map(str::to_string)
    }

    #[wasm_bindgen(getter, js_name = videoId)]
    pub fn video_id(&self) -> Option<String> {
        let app = self.shared.app.borrow();
        app.player()
            .source()
            .and_then(|s| s.video_id())
            .map(str::to_string)
    }
}

impl CaptionOverlay {
    /// Generation of the current source, if it has the expected kind
    fn expect_source(&self, embedded: bool) -> Result<u64, JsValue> {
        let app = self.shared.app.borrow();
        match (app.player().source(), embedded) {
            (Some(PlaybackSource::DirectMedia { .. }), false)
            | (Some(PlaybackSource::Embedded { .. }), true) => Ok(app.player().generation()),
            (Some(source), _) => Err(JsValue::from_str(&format!(
                "current source is {}, not {}",
                source.kind(),
                if embedded { "embedded" } else { "direct media" }
            ))),
            (None, _) => Err(JsValue::from_str("no video loaded")),
        }
    }
}

/// Call `player.getCurrentTime()`
fn player_time(player: &JsValue) -> Result<f64, JsValue> {
    let method: Function = Reflect::get(player, &JsValue::from_str("getCurrentTime"))?.dyn_into()?;
    method
        .call0(player)?
        .as_f64()
        .ok_or_else(|| JsValue::from_str("getCurrentTime did not return a number"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlay_json() {
        let mut app = AppState::default();
        assert_eq!(
            overlay_json(&app).unwrap(),
            r#"{"text":"","loading":false,"state":"Idle"}"#
        );

        app.add_captions("00:00:02 Two").unwrap();
        let UrlChange::Loaded { generation, .. } = app.load_video("clip.webm").unwrap() else {
            panic!("expected a new load");
        };
        app.apply(ClockEvent::tick(generation, 2.1));
        assert_eq!(
            overlay_json(&app).unwrap(),
            r#"{"text":"Two","loading":true,"state":"Loading"}"#
        );
    }

    #[test]
    fn test_change_callbacks_coalesce_without_borrowing() {
        let shared = Shared::new(AppState::default());
        {
            // Queuing must not touch the state an exported method is holding.
            let _held = shared.app.borrow_mut();
            assert!(shared.queue_change());
            assert!(!shared.queue_change());
        }
        shared.emit_change();
        assert!(shared.queue_change());
    }
}
