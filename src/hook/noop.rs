//! Noop hook for platforms without a global input hook backend.
//!
//! This exists so the crate (and binary) compile on targets other than
//! macOS and Windows. It tracks its running state but never emits signals;
//! synthetic input still works through the dispatchers' trigger paths and
//! through [`ChannelHook`](crate::hook::ChannelHook).

use crate::hook::{HookError, InputHook, RawSink};
use std::marker::PhantomData;

/// A hook that never emits signals.
pub struct NoopHook<S> {
    running: bool,
    _signal: PhantomData<fn(S)>,
}

impl<S> NoopHook<S> {
    pub fn new() -> Self {
        Self {
            running: false,
            _signal: PhantomData,
        }
    }
}

impl<S> Default for NoopHook<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> InputHook<S> for NoopHook<S> {
    fn start(&mut self, _sink: RawSink<S>) -> Result<(), HookError> {
        if self.running {
            return Err(HookError::AlreadyRunning);
        }
        tracing::debug!("No global input hook on this platform; only synthetic input is delivered");
        self.running = true;
        Ok(())
    }

    fn stop(&mut self) {
        self.running = false;
    }

    fn is_running(&self) -> bool {
        self.running
    }
}

/// On platforms without a hook there is no permission gate.
pub fn check_permission() -> bool {
    true
}
