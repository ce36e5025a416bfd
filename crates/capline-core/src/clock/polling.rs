//! Pull-based clock for embedded players

use super::{ClockEvent, ClockGuard, ClockSink, EmbeddedPlayer, PlayerSignal, RemoteState};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, trace};

type TimerSlot = Arc<Mutex<Option<JoinHandle<()>>>>;

/// Samples an embedded player's position on a fixed interval
pub struct PollingClock;

impl PollingClock {
    /// Subscribe to `player` for one load.
    ///
    /// `Ready` delivers a ready event and (re)starts the sampling timer;
    /// a `Playing` state change delivers a ready event as well. Dropping the
    /// returned guard unsubscribes and stops the timer.
    ///
    /// Must be called from within a tokio runtime.
    pub fn attach(
        player: Arc<dyn EmbeddedPlayer>,
        generation: u64,
        sink: Arc<dyn ClockSink>,
        interval: Duration,
    ) -> ClockGuard {
        let mut guard = ClockGuard::new(generation);
        let timer: TimerSlot = Arc::new(Mutex::new(None));
        let handle = Handle::current();

        let weak: Weak<dyn EmbeddedPlayer> = Arc::downgrade(&player);
        let slot = Arc::clone(&timer);
        let subscription = player.subscribe(Box::new(move |signal| match signal {
            PlayerSignal::Ready => {
                sink.deliver(ClockEvent::ready(generation));
                let task = handle.spawn(sample_loop(
                    weak.clone(),
                    generation,
                    Arc::clone(&sink),
                    interval,
                ));
                if let Ok(mut slot) = slot.lock() {
                    if let Some(previous) = slot.replace(task) {
                        previous.abort();
                    }
                }
                debug!(generation, interval_ms = interval.as_millis() as u64, "Polling started");
            }
            PlayerSignal::StateChange(RemoteState::Playing) => {
                sink.deliver(ClockEvent::ready(generation));
            }
            PlayerSignal::StateChange(state) => {
                trace!(generation, ?state, "Ignoring player state");
            }
        }));

        guard.on_release(move || {
            player.unsubscribe(subscription);
            if let Ok(mut slot) = timer.lock() {
                if let Some(task) = slot.take() {
                    task.abort();
                }
            }
        });
        guard
    }
}

async fn sample_loop(
    player: Weak<dyn EmbeddedPlayer>,
    generation: u64,
    sink: Arc<dyn ClockSink>,
    period: Duration,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        let Some(player) = player.upgrade() else {
            break;
        };
        sink.deliver(ClockEvent::tick(generation, player.current_time()));
    }
}
