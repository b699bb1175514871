//! Input Listeners - subscribe/unsubscribe dispatch for global input events.
//!
//! This library wraps OS-level keyboard and mouse hooks and turns their raw
//! signals into two small event records, broadcast synchronously to
//! registered callbacks.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  RawKey    ┌────────────────────┐  KeyboardEvent  ┌───────────┐
//! │ keyboard hook│───────────▶│ KeyboardDispatcher │────────────────▶│ callbacks │
//! │ (own thread) │            │   normalize        │                 │ (in order)│
//! └──────────────┘            └────────────────────┘                 └───────────┘
//! ┌──────────────┐  RawClick  ┌────────────────────┐  MouseEvent     ┌───────────┐
//! │  mouse hook  │───────────▶│  MouseDispatcher   │────────────────▶│ callbacks │
//! │ (own thread) │            │ debounce (200ms)   │                 │ (in order)│
//! └──────────────┘            └────────────────────┘                 └───────────┘
//! ```
//!
//! Callbacks run on the hook thread and block it until they return. A
//! panicking callback is logged and skipped; the others still run.
//!
//! # Example
//!
//! ```no_run
//! use input_listeners::{callback, KeyboardDispatcher, KeyboardEvent};
//!
//! let mut keyboard = KeyboardDispatcher::new();
//! let printer = callback(|event: &KeyboardEvent| println!("released {:?}", event.key));
//! keyboard.add_callback(printer.clone());
//!
//! keyboard.start().expect("Failed to start keyboard hook");
//! // ...
//! keyboard.remove_callback(&printer);
//! keyboard.stop();
//! ```

pub mod config;
pub mod core;
pub mod hook;
pub mod stats;

// Re-export key types at crate root for convenience
pub use crate::core::{
    callback, Callback, CallbackRegistry, DispatcherError, KeyboardDispatcher, KeyboardEvent,
    ListenerState, MouseDispatcher, MouseEvent, DEBOUNCE_WINDOW_MS,
};
pub use config::{Config, ConfigError, SourceConfig};
pub use hook::{check_permission, Button, HookError, InputHook, NamedKey, RawClick, RawKey};
pub use stats::{DispatchStats, StatsSnapshot};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
