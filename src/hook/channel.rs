//! Channel-fed hook.
//!
//! Instead of an OS hook, signals come from a `crossbeam_channel::Receiver`
//! and are forwarded to the sink by a background thread. This gives the
//! exact threading model of a real hook (callbacks run on a thread the
//! caller does not own) without needing input hardware or permissions.

use crate::hook::{HookError, HookFactory, InputHook, RawSink};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// How often the forwarding thread re-checks the running flag.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// A hook that forwards signals received on a channel.
pub struct ChannelHook<S> {
    receiver: Receiver<S>,
    running: Arc<AtomicBool>,
    thread_handle: Option<JoinHandle<()>>,
}

impl<S: Send + 'static> ChannelHook<S> {
    pub fn new(receiver: Receiver<S>) -> Self {
        Self {
            receiver,
            running: Arc::new(AtomicBool::new(false)),
            thread_handle: None,
        }
    }
}

impl<S: Send + 'static> InputHook<S> for ChannelHook<S> {
    fn start(&mut self, sink: RawSink<S>) -> Result<(), HookError> {
        if self.running.load(Ordering::SeqCst) {
            return Err(HookError::AlreadyRunning);
        }

        self.running.store(true, Ordering::SeqCst);

        let receiver = self.receiver.clone();
        let running = self.running.clone();

        let handle = thread::Builder::new()
            .name("channel-hook".into())
            .spawn(move || {
                while running.load(Ordering::SeqCst) {
                    match receiver.recv_timeout(POLL_INTERVAL) {
                        Ok(signal) => sink(signal),
                        Err(RecvTimeoutError::Timeout) => {}
                        Err(RecvTimeoutError::Disconnected) => {
                            tracing::debug!("Channel hook source disconnected");
                            break;
                        }
                    }
                }
                running.store(false, Ordering::SeqCst);
            })
            .map_err(|e| {
                self.running.store(false, Ordering::SeqCst);
                HookError::ThreadFailed(e.to_string())
            })?;

        self.thread_handle = Some(handle);
        Ok(())
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            if handle.join().is_err() {
                tracing::error!("Channel hook thread panicked");
            }
        }
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl<S> Drop for ChannelHook<S> {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

/// Factory producing channel hooks that all read from the same source.
///
/// Every rearmed hook clones `receiver`, so signals sent after a
/// `stop()`/`start()` cycle reach the new hook.
pub fn channel_factory<S: Send + 'static>(receiver: Receiver<S>) -> HookFactory<S> {
    Box::new(move || Box::new(ChannelHook::new(receiver.clone())) as Box<dyn InputHook<S>>)
}
