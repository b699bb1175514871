//! Keyboard dispatcher: key releases from an OS hook fanned out to callbacks.

use crate::core::events::{now_millis, KeyboardEvent};
use crate::core::lifecycle::{DispatcherError, HookSlot, ListenerState};
use crate::core::registry::{Callback, CallbackRegistry};
use crate::hook::{HookFactory, InputHook, PlatformKeyboardHook, RawKey, RawSink};
use crate::stats::DispatchStats;
use std::sync::Arc;

/// State shared with the hook thread.
struct KeyboardShared {
    registry: CallbackRegistry<KeyboardEvent>,
    stats: DispatchStats,
}

impl KeyboardShared {
    fn handle_key(&self, raw: RawKey) {
        let key = raw.identifier();
        if key.is_none() {
            tracing::debug!("Unidentified key released: {raw:?}");
            self.stats.record_unidentified_key();
        }

        let event = KeyboardEvent::new(key, now_millis());
        let outcome = self.registry.dispatch(&event);

        self.stats.record_event_dispatched();
        self.stats.record_callbacks_invoked(outcome.invoked as u64);
        self.stats.record_callback_failures(outcome.failed as u64);
    }
}

/// Bridges an OS keyboard hook to a [`CallbackRegistry`] of keyboard callbacks.
///
/// Every key release becomes one [`KeyboardEvent`], delivered synchronously
/// on the hook thread to each registered callback in registration order.
pub struct KeyboardDispatcher {
    shared: Arc<KeyboardShared>,
    slot: HookSlot<RawKey>,
}

impl KeyboardDispatcher {
    /// Create a dispatcher over the platform keyboard hook.
    pub fn new() -> Self {
        Self::with_hook_factory(Box::new(|| {
            Box::new(PlatformKeyboardHook::new()) as Box<dyn InputHook<RawKey>>
        }))
    }

    /// Create a dispatcher whose hooks come from `factory`.
    ///
    /// The factory is called once up front and again after every `stop()`.
    pub fn with_hook_factory(factory: HookFactory<RawKey>) -> Self {
        Self {
            shared: Arc::new(KeyboardShared {
                registry: CallbackRegistry::new(),
                stats: DispatchStats::new(),
            }),
            slot: HookSlot::new("keyboard", factory),
        }
    }

    /// Start listening. Fails if already running or if the hook cannot be installed.
    pub fn start(&mut self) -> Result<(), DispatcherError> {
        let shared = self.shared.clone();
        let sink: RawSink<RawKey> = Arc::new(move |raw: RawKey| shared.handle_key(raw));
        self.slot.start(sink)
    }

    /// Stop listening and arm a fresh hook so `start()` can be called again.
    pub fn stop(&mut self) {
        self.slot.stop();
    }

    pub fn is_running(&self) -> bool {
        self.slot.state() == ListenerState::Running
    }

    pub fn state(&self) -> ListenerState {
        self.slot.state()
    }

    /// Inject a synthetic release of `key_char`, as if it came from the hook.
    ///
    /// Callbacks run on the calling thread. Works whether or not the
    /// dispatcher is running.
    pub fn trigger(&self, key_char: char) {
        self.handle_key(RawKey::Char(key_char));
    }

    /// Normalize a raw key release and dispatch it.
    pub fn handle_key(&self, raw: RawKey) {
        self.shared.handle_key(raw);
    }

    pub fn add_callback(&self, callback: Callback<KeyboardEvent>) {
        self.shared.registry.add(callback);
    }

    pub fn remove_callback(&self, callback: &Callback<KeyboardEvent>) {
        self.shared.registry.remove(callback);
    }

    pub fn remove_callbacks(&self) {
        self.shared.registry.clear();
    }

    pub fn callbacks(&self) -> Vec<Callback<KeyboardEvent>> {
        self.shared.registry.list()
    }

    pub fn stats(&self) -> &DispatchStats {
        &self.shared.stats
    }
}

impl Default for KeyboardDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for KeyboardDispatcher {
    fn drop(&mut self) {
        self.stop();
    }
}
