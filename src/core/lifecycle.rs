//! Start/stop state machine shared by both dispatchers.

use crate::hook::{HookError, HookFactory, InputHook, RawSink};

/// Lifecycle state of a dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    Stopped,
    Running,
}

/// Errors returned by dispatcher lifecycle operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatcherError {
    AlreadyRunning,
    Hook(HookError),
}

impl std::fmt::Display for DispatcherError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DispatcherError::AlreadyRunning => write!(f, "Dispatcher is already running"),
            DispatcherError::Hook(e) => write!(f, "Hook error: {e}"),
        }
    }
}

impl std::error::Error for DispatcherError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DispatcherError::Hook(e) => Some(e),
            DispatcherError::AlreadyRunning => None,
        }
    }
}

impl From<HookError> for DispatcherError {
    fn from(e: HookError) -> Self {
        DispatcherError::Hook(e)
    }
}

/// Owns exactly one hook at a time and re-arms a fresh one after every stop.
pub(crate) struct HookSlot<S> {
    name: &'static str,
    factory: HookFactory<S>,
    hook: Box<dyn InputHook<S>>,
    state: ListenerState,
}

impl<S> HookSlot<S> {
    pub(crate) fn new(name: &'static str, factory: HookFactory<S>) -> Self {
        let hook = factory();
        Self {
            name,
            factory,
            hook,
            state: ListenerState::Stopped,
        }
    }

    pub(crate) fn start(&mut self, sink: RawSink<S>) -> Result<(), DispatcherError> {
        self.reap();
        if self.state == ListenerState::Running {
            return Err(DispatcherError::AlreadyRunning);
        }

        if let Err(e) = self.hook.start(sink) {
            tracing::error!("Failed to start {} hook: {e}", self.name);
            self.rearm();
            return Err(e.into());
        }

        self.state = ListenerState::Running;
        tracing::debug!("{} dispatcher started", self.name);
        Ok(())
    }

    /// Stop the running hook and arm a fresh one. No-op when already stopped.
    pub(crate) fn stop(&mut self) {
        if self.state == ListenerState::Stopped {
            return;
        }

        self.hook.stop();
        self.rearm();
        self.state = ListenerState::Stopped;
        tracing::debug!("{} dispatcher stopped", self.name);
    }

    /// Release a hook whose thread exited on its own and return to `Stopped`.
    fn reap(&mut self) {
        if self.state == ListenerState::Running && !self.hook.is_running() {
            tracing::warn!("{} hook exited unexpectedly", self.name);
            self.hook.stop();
            self.rearm();
            self.state = ListenerState::Stopped;
        }
    }

    fn rearm(&mut self) {
        self.hook = (self.factory)();
    }

    /// Current state. A hook that died while running reads as `Stopped`.
    pub(crate) fn state(&self) -> ListenerState {
        match self.state {
            ListenerState::Running if !self.hook.is_running() => ListenerState::Stopped,
            state => state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Hook that records how many instances were built and started.
    struct CountingHook {
        starts: Arc<AtomicUsize>,
        fail: bool,
        running: Arc<AtomicBool>,
    }

    impl InputHook<()> for CountingHook {
        fn start(&mut self, _sink: RawSink<()>) -> Result<(), HookError> {
            if self.fail {
                return Err(HookError::PermissionDenied);
            }
            if self.running.swap(true, Ordering::SeqCst) {
                return Err(HookError::AlreadyRunning);
            }
            self.starts.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn stop(&mut self) {
            self.running.store(false, Ordering::SeqCst);
        }

        fn is_running(&self) -> bool {
            self.running.load(Ordering::SeqCst)
        }
    }

    type Flags = Arc<Mutex<Vec<Arc<AtomicBool>>>>;

    fn make_slot(fail: bool) -> (HookSlot<()>, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let (slot, built, starts, _) = make_slot_with_flags(fail);
        (slot, built, starts)
    }

    /// Like `make_slot`, also exposing each built hook's running flag.
    fn make_slot_with_flags(fail: bool) -> (HookSlot<()>, Arc<AtomicUsize>, Arc<AtomicUsize>, Flags) {
        let built = Arc::new(AtomicUsize::new(0));
        let starts = Arc::new(AtomicUsize::new(0));
        let flags: Flags = Arc::new(Mutex::new(Vec::new()));
        let (b, s, f) = (built.clone(), starts.clone(), flags.clone());
        let factory: HookFactory<()> = Box::new(move || {
            b.fetch_add(1, Ordering::SeqCst);
            let running = Arc::new(AtomicBool::new(false));
            f.lock().push(running.clone());
            Box::new(CountingHook {
                starts: s.clone(),
                fail,
                running,
            }) as Box<dyn InputHook<()>>
        });
        (HookSlot::new("test", factory), built, starts, flags)
    }

    #[test]
    fn test_initial_state_is_stopped() {
        let (slot, built, _) = make_slot(false);
        assert_eq!(slot.state(), ListenerState::Stopped);
        assert_eq!(built.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_stop_rearms_fresh_hook() {
        let (mut slot, built, starts) = make_slot(false);

        slot.start(Arc::new(|_: ()| {})).unwrap();
        slot.stop();
        assert_eq!(built.load(Ordering::SeqCst), 2);

        // The fresh hook starts cleanly
        slot.start(Arc::new(|_: ()| {})).unwrap();
        assert_eq!(starts.load(Ordering::SeqCst), 2);
        assert_eq!(slot.state(), ListenerState::Running);
    }

    #[test]
    fn test_double_start_is_rejected() {
        let (mut slot, _, _) = make_slot(false);

        slot.start(Arc::new(|_: ()| {})).unwrap();
        assert_eq!(
            slot.start(Arc::new(|_: ()| {})),
            Err(DispatcherError::AlreadyRunning)
        );
    }

    #[test]
    fn test_stop_without_start_is_noop() {
        let (mut slot, built, _) = make_slot(false);

        slot.stop();
        slot.stop();

        assert_eq!(slot.state(), ListenerState::Stopped);
        assert_eq!(built.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_start_stays_stopped() {
        let (mut slot, _, _) = make_slot(true);

        let err = slot.start(Arc::new(|_: ()| {})).unwrap_err();

        assert_eq!(err, DispatcherError::Hook(HookError::PermissionDenied));
        assert_eq!(slot.state(), ListenerState::Stopped);
    }

    #[test]
    fn test_dead_hook_reads_as_stopped_and_restarts() {
        let (mut slot, built, starts, flags) = make_slot_with_flags(false);

        slot.start(Arc::new(|_: ()| {})).unwrap();
        // The hook thread exits without being asked to
        flags.lock()[0].store(false, Ordering::SeqCst);

        assert_eq!(slot.state(), ListenerState::Stopped);
        slot.start(Arc::new(|_: ()| {})).unwrap();

        assert_eq!(slot.state(), ListenerState::Running);
        assert_eq!(built.load(Ordering::SeqCst), 2);
        assert_eq!(starts.load(Ordering::SeqCst), 2);
    }
}
