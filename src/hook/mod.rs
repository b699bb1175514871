//! OS-level input hooks.
//!
//! A hook is a restartable-once resource: it is started with a sink that
//! receives raw signals on the hook's own thread, and once stopped it is
//! thrown away. Dispatchers keep a factory so they can arm a fresh hook
//! after every stop.

pub mod channel;
pub mod types;

#[cfg(target_os = "macos")]
pub mod macos;

#[cfg(target_os = "windows")]
pub mod windows;

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
pub mod noop;

use std::sync::Arc;

// Re-export commonly used types
pub use channel::{channel_factory, ChannelHook};
pub use types::{Button, NamedKey, RawClick, RawKey};

#[cfg(target_os = "macos")]
pub use macos::{check_permission, MacOSKeyboardHook, MacOSMouseHook};

/// Platform keyboard hook type alias
#[cfg(target_os = "macos")]
pub type PlatformKeyboardHook = MacOSKeyboardHook;

/// Platform mouse hook type alias
#[cfg(target_os = "macos")]
pub type PlatformMouseHook = MacOSMouseHook;

#[cfg(target_os = "windows")]
pub use windows::{check_permission, WindowsKeyboardHook, WindowsMouseHook};

/// Platform keyboard hook type alias
#[cfg(target_os = "windows")]
pub type PlatformKeyboardHook = WindowsKeyboardHook;

/// Platform mouse hook type alias
#[cfg(target_os = "windows")]
pub type PlatformMouseHook = WindowsMouseHook;

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
pub use noop::{check_permission, NoopHook};

/// Platform keyboard hook type alias
#[cfg(not(any(target_os = "macos", target_os = "windows")))]
pub type PlatformKeyboardHook = NoopHook<RawKey>;

/// Platform mouse hook type alias
#[cfg(not(any(target_os = "macos", target_os = "windows")))]
pub type PlatformMouseHook = NoopHook<RawClick>;

/// Receiver side of a hook: called on the hook thread for every raw signal.
pub type RawSink<S> = Arc<dyn Fn(S) + Send + Sync>;

/// Builds a fresh, unstarted hook.
pub type HookFactory<S> = Box<dyn Fn() -> Box<dyn InputHook<S>> + Send + Sync>;

/// An OS input hook delivering raw signals of type `S`.
pub trait InputHook<S>: Send {
    /// Start delivering signals to `sink` from a background thread.
    fn start(&mut self, sink: RawSink<S>) -> Result<(), HookError>;

    /// Stop delivering signals and release the underlying OS resource.
    fn stop(&mut self);

    /// Check if the hook is currently delivering signals.
    fn is_running(&self) -> bool;
}

/// Errors that can occur while installing or running a hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookError {
    AlreadyRunning,
    PermissionDenied,
    InstallFailed(String),
    ThreadFailed(String),
}

impl std::fmt::Display for HookError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HookError::AlreadyRunning => write!(f, "Hook is already running"),
            HookError::PermissionDenied => write!(f, "Input Monitoring permission not granted"),
            HookError::InstallFailed(e) => write!(f, "Failed to install input hook: {e}"),
            HookError::ThreadFailed(e) => write!(f, "Hook thread failed: {e}"),
        }
    }
}

impl std::error::Error for HookError {}
