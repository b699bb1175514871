//! Mouse dispatcher: debounced clicks from an OS hook fanned out to callbacks.

use crate::core::events::{now_millis, MouseEvent};
use crate::core::lifecycle::{DispatcherError, HookSlot, ListenerState};
use crate::core::registry::{Callback, CallbackRegistry};
use crate::hook::{HookFactory, InputHook, PlatformMouseHook, RawClick, RawSink};
use crate::stats::DispatchStats;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Click signals arriving within this many milliseconds of the last
/// accepted click are dropped.
pub const DEBOUNCE_WINDOW_MS: f64 = 200.0;

/// [`DEBOUNCE_WINDOW_MS`] on the monotonic clock.
const DEBOUNCE_WINDOW: Duration = Duration::from_millis(200);

/// State shared with the hook thread.
struct MouseShared {
    registry: CallbackRegistry<MouseEvent>,
    stats: DispatchStats,
    /// Monotonic time of the last accepted click, if any
    last_accepted: Mutex<Option<Instant>>,
}

impl MouseShared {
    /// Debounce against `at`; `time` is only the wall-clock stamp for the event.
    fn handle_click_at(&self, raw: RawClick, at: Instant, time: f64) {
        {
            // Presses and releases compete for the same window
            let mut last = self.last_accepted.lock();
            if let Some(prev) = *last {
                if at.saturating_duration_since(prev) < DEBOUNCE_WINDOW {
                    self.stats.record_click_debounced();
                    return;
                }
            }
            *last = Some(at);
        }

        let event = MouseEvent::new(raw.x, raw.y, raw.button, time);
        let outcome = self.registry.dispatch(&event);

        self.stats.record_event_dispatched();
        self.stats.record_callbacks_invoked(outcome.invoked as u64);
        self.stats.record_callback_failures(outcome.failed as u64);
    }
}

/// Bridges an OS mouse hook to a [`CallbackRegistry`] of mouse callbacks.
///
/// Clicks are debounced: after a click is accepted, every press or release
/// within [`DEBOUNCE_WINDOW_MS`] is discarded. Accepted clicks become one
/// [`MouseEvent`] each, delivered synchronously on the hook thread in
/// registration order.
pub struct MouseDispatcher {
    shared: Arc<MouseShared>,
    slot: HookSlot<RawClick>,
}

impl MouseDispatcher {
    /// Create a dispatcher over the platform mouse hook.
    pub fn new() -> Self {
        Self::with_hook_factory(Box::new(|| {
            Box::new(PlatformMouseHook::new()) as Box<dyn InputHook<RawClick>>
        }))
    }

    /// Create a dispatcher whose hooks come from `factory`.
    pub fn with_hook_factory(factory: HookFactory<RawClick>) -> Self {
        Self {
            shared: Arc::new(MouseShared {
                registry: CallbackRegistry::new(),
                stats: DispatchStats::new(),
                last_accepted: Mutex::new(None),
            }),
            slot: HookSlot::new("mouse", factory),
        }
    }

    pub fn start(&mut self) -> Result<(), DispatcherError> {
        let shared = self.shared.clone();
        let sink: RawSink<RawClick> = Arc::new(move |raw: RawClick| {
            shared.handle_click_at(raw, Instant::now(), now_millis());
        });
        self.slot.start(sink)
    }

    /// Stop listening and arm a fresh hook. The debounce clock is kept.
    pub fn stop(&mut self) {
        self.slot.stop();
    }

    pub fn is_running(&self) -> bool {
        self.slot.state() == ListenerState::Running
    }

    pub fn state(&self) -> ListenerState {
        self.slot.state()
    }

    /// Debounce and dispatch a raw click, stamped with the current time.
    pub fn handle_click(&self, raw: RawClick) {
        self.shared.handle_click_at(raw, Instant::now(), now_millis());
    }

    pub fn add_callback(&self, callback: Callback<MouseEvent>) {
        self.shared.registry.add(callback);
    }

    pub fn remove_callback(&self, callback: &Callback<MouseEvent>) {
        self.shared.registry.remove(callback);
    }

    pub fn remove_callbacks(&self) {
        self.shared.registry.clear();
    }

    pub fn callbacks(&self) -> Vec<Callback<MouseEvent>> {
        self.shared.registry.list()
    }

    pub fn stats(&self) -> &DispatchStats {
        &self.shared.stats
    }
}

impl Default for MouseDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for MouseDispatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::registry::callback;
    use crate::hook::Button;

    const T0: f64 = 1_700_000_000_000.0;
    /// Monotonic instant standing in for `T0`
    static BASE: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

    fn recording_dispatcher() -> (MouseDispatcher, Arc<Mutex<Vec<MouseEvent>>>) {
        let dispatcher = MouseDispatcher::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();
        dispatcher.add_callback(callback(move |e: &MouseEvent| s.lock().push(e.clone())));
        (dispatcher, seen)
    }

    fn after(base: Instant, offset_ms: f64) -> Instant {
        base + Duration::from_micros((offset_ms * 1000.0).round() as u64)
    }

    /// Click `offset_ms` after `T0` on both clocks.
    fn click(dispatcher: &MouseDispatcher, raw: RawClick, offset_ms: f64) {
        let base = *BASE.get_or_init(Instant::now);
        dispatcher
            .shared
            .handle_click_at(raw, after(base, offset_ms), T0 + offset_ms);
    }

    #[test]
    fn test_first_click_is_delivered() {
        let (dispatcher, seen) = recording_dispatcher();

        click(&dispatcher, RawClick::press(5, 6, Button::Right), 0.0);

        assert_eq!(
            *seen.lock(),
            vec![MouseEvent::new(5, 6, Button::Right, T0)]
        );
    }

    #[test]
    fn test_clicks_within_window_collapse_to_first() {
        let (dispatcher, seen) = recording_dispatcher();

        click(&dispatcher, RawClick::press(10, 10, Button::Left), 0.0);
        click(&dispatcher, RawClick::press(10, 10, Button::Left), 50.0);
        click(&dispatcher, RawClick::press(10, 10, Button::Left), 250.0);

        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].time, T0);
        assert_eq!(seen[1].time, T0 + 250.0);
        assert_eq!(dispatcher.stats().snapshot().clicks_debounced, 1);
    }

    #[test]
    fn test_window_boundary() {
        let (dispatcher, seen) = recording_dispatcher();

        click(&dispatcher, RawClick::press(0, 0, Button::Left), 0.0);
        click(&dispatcher, RawClick::press(0, 0, Button::Left), 199.9);
        click(&dispatcher, RawClick::press(0, 0, Button::Left), 200.0);

        let times: Vec<f64> = seen.lock().iter().map(|e| e.time).collect();
        assert_eq!(times, vec![T0, T0 + 200.0]);
    }

    #[test]
    fn test_window_measured_from_last_accepted_click() {
        let (dispatcher, seen) = recording_dispatcher();

        // Discarded clicks do not extend the window
        click(&dispatcher, RawClick::press(0, 0, Button::Left), 0.0);
        click(&dispatcher, RawClick::press(0, 0, Button::Left), 150.0);
        click(&dispatcher, RawClick::press(0, 0, Button::Left), 210.0);

        assert_eq!(seen.lock().len(), 2);
    }

    #[test]
    fn test_press_and_release_share_the_window() {
        let (dispatcher, seen) = recording_dispatcher();

        click(&dispatcher, RawClick::press(1, 1, Button::Left), 0.0);
        click(&dispatcher, RawClick::release(1, 1, Button::Left), 80.0);

        assert_eq!(seen.lock().len(), 1);
    }

    #[test]
    fn test_slow_release_is_delivered_as_its_own_event() {
        let (dispatcher, seen) = recording_dispatcher();

        click(&dispatcher, RawClick::press(1, 1, Button::Left), 0.0);
        click(&dispatcher, RawClick::release(3, 4, Button::Left), 400.0);

        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        assert_eq!((seen[1].x, seen[1].y), (3, 4));
    }

    #[test]
    fn test_debounced_click_invokes_no_callbacks() {
        let (dispatcher, _seen) = recording_dispatcher();

        click(&dispatcher, RawClick::press(0, 0, Button::Middle), 0.0);
        click(&dispatcher, RawClick::press(0, 0, Button::Middle), 10.0);

        let stats = dispatcher.stats().snapshot();
        assert_eq!(stats.events_dispatched, 1);
        assert_eq!(stats.callbacks_invoked, 1);
    }

    #[test]
    fn test_window_ignores_wall_clock_steps() {
        let (dispatcher, seen) = recording_dispatcher();
        let base = Instant::now();

        dispatcher
            .shared
            .handle_click_at(RawClick::press(0, 0, Button::Left), base, T0);

        // Wall clock jumps back a minute; monotonic time keeps advancing
        for i in 1..=5 {
            let offset = 1000.0 * i as f64;
            dispatcher.shared.handle_click_at(
                RawClick::press(0, 0, Button::Left),
                after(base, offset),
                T0 - 60_000.0 + offset,
            );
        }

        let seen = seen.lock();
        assert_eq!(seen.len(), 6);
        assert_eq!(seen[1].time, T0 - 59_000.0);
        assert_eq!(dispatcher.stats().snapshot().clicks_debounced, 0);
    }

    #[test]
    fn test_window_constants_agree() {
        assert_eq!(DEBOUNCE_WINDOW.as_millis() as f64, DEBOUNCE_WINDOW_MS);
    }

    #[test]
    fn test_remove_callbacks_silences_dispatch() {
        let (dispatcher, seen) = recording_dispatcher();

        dispatcher.remove_callbacks();
        click(&dispatcher, RawClick::press(0, 0, Button::Left), 0.0);

        assert!(seen.lock().is_empty());
    }
}
