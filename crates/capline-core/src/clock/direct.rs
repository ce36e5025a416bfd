//! Push-based clock for direct media elements

use super::{ClockEvent, ClockGuard, ClockSink, MediaElement, MediaEvent};
use std::sync::{Arc, Weak};
use tracing::debug;

/// Forwards a media element's time updates and readiness
pub struct DirectMediaClock;

impl DirectMediaClock {
    /// Register listeners on `element` for one load.
    ///
    /// Each `TimeUpdate` reads the element's position and delivers a tick;
    /// `DataReady` delivers a ready event. Both listeners are removed when the
    /// returned guard is dropped.
    pub fn attach(
        element: Arc<dyn MediaElement>,
        generation: u64,
        sink: Arc<dyn ClockSink>,
    ) -> ClockGuard {
        let mut guard = ClockGuard::new(generation);

        // The element owns its listeners, so they only hold a weak handle back.
        let weak: Weak<dyn MediaElement> = Arc::downgrade(&element);
        let tick_sink = Arc::clone(&sink);
        let time_update = element.add_listener(
            MediaEvent::TimeUpdate,
            Box::new(move |_| {
                if let Some(element) = weak.upgrade() {
                    tick_sink.deliver(ClockEvent::tick(generation, element.current_time()));
                }
            }),
        );

        let data_ready = element.add_listener(
            MediaEvent::DataReady,
            Box::new(move |_| sink.deliver(ClockEvent::ready(generation))),
        );

        debug!(generation, time_update, data_ready, "Direct media clock attached");

        guard.on_release(move || {
            element.remove_listener(time_update);
            element.remove_listener(data_ready);
        });
        guard
    }
}
