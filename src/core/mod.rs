//! Event normalization and callback dispatch.
//!
//! This module contains:
//! - Event records delivered to callbacks
//! - The callback registry
//! - Keyboard and mouse dispatchers with their shared lifecycle

pub mod events;
pub mod keyboard;
pub mod lifecycle;
pub mod mouse;
pub mod registry;

// Re-export commonly used types
pub use events::{now_millis, KeyboardEvent, MouseEvent};
pub use keyboard::KeyboardDispatcher;
pub use lifecycle::{DispatcherError, ListenerState};
pub use mouse::{MouseDispatcher, DEBOUNCE_WINDOW_MS};
pub use registry::{callback, Callback, CallbackRegistry, DispatchOutcome};
