//! macOS hooks using a CGEvent tap.
//!
//! Each hook owns a background thread that creates a listen-only tap,
//! attaches it to that thread's run loop and polls the running flag every
//! 100ms. Requires Input Monitoring permission.

use crate::hook::types::{Button, NamedKey, RawClick, RawKey};
use crate::hook::{HookError, InputHook, RawSink};
use core_foundation::runloop::{kCFRunLoopCommonModes, CFRunLoop};
use core_graphics::event::{
    CGEvent, CGEventTap, CGEventTapLocation, CGEventTapOptions,
    CGEventTapPlacement, CGEventType, CallbackResult, EventField,
};
use crossbeam_channel::bounded;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// How long `start()` waits for the tap thread to report back.
const STARTUP_TIMEOUT: Duration = Duration::from_secs(2);

/// A CGEvent tap translating events of interest into signals of type `S`.
struct TapHook<S> {
    name: &'static str,
    events: fn() -> Vec<CGEventType>,
    translate: fn(CGEventType, &CGEvent) -> Option<S>,
    running: Arc<AtomicBool>,
    thread_handle: Option<JoinHandle<()>>,
}

impl<S: Send + 'static> TapHook<S> {
    fn new(
        name: &'static str,
        events: fn() -> Vec<CGEventType>,
        translate: fn(CGEventType, &CGEvent) -> Option<S>,
    ) -> Self {
        Self {
            name,
            events,
            translate,
            running: Arc::new(AtomicBool::new(false)),
            thread_handle: None,
        }
    }

    fn start(&mut self, sink: RawSink<S>) -> Result<(), HookError> {
        if self.running.load(Ordering::SeqCst) {
            return Err(HookError::AlreadyRunning);
        }

        self.running.store(true, Ordering::SeqCst);

        let running = self.running.clone();
        let events = (self.events)();
        let translate = self.translate;
        let (ready_tx, ready_rx) = bounded(1);

        let handle = thread::Builder::new()
            .name(self.name.into())
            .spawn(move || {
                if let Err(e) = run_tap_loop(events, translate, sink, running.clone(), ready_tx) {
                    tracing::error!("Event tap loop error: {e}");
                }
                running.store(false, Ordering::SeqCst);
            })
            .map_err(|e| {
                self.running.store(false, Ordering::SeqCst);
                HookError::ThreadFailed(e.to_string())
            })?;

        self.thread_handle = Some(handle);

        match ready_rx.recv_timeout(STARTUP_TIMEOUT) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                self.stop();
                Err(e)
            }
            Err(_) => {
                self.stop();
                Err(HookError::ThreadFailed("event tap did not start".into()))
            }
        }
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            // The run loop is polled, so the thread exits within one interval
            if handle.join().is_err() {
                tracing::error!("{} thread panicked", self.name);
            }
        }
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl<S> Drop for TapHook<S> {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

/// Run the Core Graphics event loop until `running` is cleared.
fn run_tap_loop<S>(
    events: Vec<CGEventType>,
    translate: fn(CGEventType, &CGEvent) -> Option<S>,
    sink: RawSink<S>,
    running: Arc<AtomicBool>,
    ready: crossbeam_channel::Sender<Result<(), HookError>>,
) -> Result<(), HookError> {
    let tap = CGEventTap::new(
        CGEventTapLocation::Session,
        CGEventTapPlacement::HeadInsertEventTap,
        CGEventTapOptions::ListenOnly,
        events,
        move |_proxy, event_type, event| {
            if let Some(signal) = translate(event_type, event) {
                sink(signal);
            }
            // Passive observers: the event continues unchanged
            CallbackResult::Keep
        },
    );

    let tap = match tap {
        Ok(tap) => tap,
        Err(_) => {
            let _ = ready.send(Err(HookError::PermissionDenied));
            return Err(HookError::PermissionDenied);
        }
    };

    let source = match tap.mach_port().create_runloop_source(0) {
        Ok(source) => source,
        Err(_) => {
            let err = HookError::InstallFailed("failed to create run loop source".into());
            let _ = ready.send(Err(err.clone()));
            return Err(err);
        }
    };

    let run_loop = CFRunLoop::get_current();
    unsafe {
        run_loop.add_source(&source, kCFRunLoopCommonModes);
    }

    tap.enable();
    let _ = ready.send(Ok(()));

    while running.load(Ordering::SeqCst) {
        CFRunLoop::run_in_mode(
            unsafe { kCFRunLoopCommonModes },
            Duration::from_millis(100),
            false,
        );
    }

    // The tap is disabled when dropped
    Ok(())
}

fn keyboard_event_types() -> Vec<CGEventType> {
    vec![CGEventType::KeyUp, CGEventType::FlagsChanged]
}

fn mouse_event_types() -> Vec<CGEventType> {
    vec![
        CGEventType::LeftMouseDown,
        CGEventType::LeftMouseUp,
        CGEventType::RightMouseDown,
        CGEventType::RightMouseUp,
        CGEventType::OtherMouseDown,
        CGEventType::OtherMouseUp,
    ]
}

/// Translate a key release into a raw key.
///
/// Modifiers never produce `KeyUp`; their release shows up as a
/// `FlagsChanged` event where the key's device-dependent flag is cleared.
fn translate_key(event_type: CGEventType, event: &CGEvent) -> Option<RawKey> {
    let keycode = event.get_integer_value_field(EventField::KEYBOARD_EVENT_KEYCODE) as u16;

    match event_type {
        CGEventType::KeyUp => Some(keycode_to_raw_key(keycode)),
        CGEventType::FlagsChanged => {
            if is_modifier_release(keycode, event.get_flags().bits()) {
                Some(keycode_to_raw_key(keycode))
            } else {
                None
            }
        }
        _ => None,
    }
}

fn translate_click(event_type: CGEventType, event: &CGEvent) -> Option<RawClick> {
    let (button, pressed) = match event_type {
        CGEventType::LeftMouseDown => (Button::Left, true),
        CGEventType::LeftMouseUp => (Button::Left, false),
        CGEventType::RightMouseDown => (Button::Right, true),
        CGEventType::RightMouseUp => (Button::Right, false),
        CGEventType::OtherMouseDown | CGEventType::OtherMouseUp => {
            let number = event.get_integer_value_field(EventField::MOUSE_EVENT_BUTTON_NUMBER);
            let button = if number == 2 {
                Button::Middle
            } else {
                Button::Other(number as u16)
            };
            (button, matches!(event_type, CGEventType::OtherMouseDown))
        }
        _ => return None,
    };

    let location = event.location();
    Some(RawClick {
        x: location.x.round() as i32,
        y: location.y.round() as i32,
        button,
        pressed,
    })
}

const CAPS_LOCK_KEYCODE: u16 = 0x39;

// Device-dependent modifier bits (IOKit NX_DEVICE*KEYMASK), one per physical key
const DEVICE_LCTL: u64 = 0x0000_0001;
const DEVICE_LSHIFT: u64 = 0x0000_0002;
const DEVICE_RSHIFT: u64 = 0x0000_0004;
const DEVICE_LCMD: u64 = 0x0000_0008;
const DEVICE_RCMD: u64 = 0x0000_0010;
const DEVICE_LALT: u64 = 0x0000_0020;
const DEVICE_RALT: u64 = 0x0000_0040;
const DEVICE_RCTL: u64 = 0x0000_2000;

fn device_modifier_mask(keycode: u16) -> Option<u64> {
    match keycode {
        0x38 => Some(DEVICE_LSHIFT),
        0x3C => Some(DEVICE_RSHIFT),
        0x3B => Some(DEVICE_LCTL),
        0x3E => Some(DEVICE_RCTL),
        0x3A => Some(DEVICE_LALT),
        0x3D => Some(DEVICE_RALT),
        0x37 => Some(DEVICE_LCMD),
        0x36 => Some(DEVICE_RCMD),
        _ => None,
    }
}

/// Whether a `FlagsChanged` event for `keycode` is that key going up.
///
/// Caps Lock emits a single `FlagsChanged` per physical press, so every
/// one counts as a release.
fn is_modifier_release(keycode: u16, flags: u64) -> bool {
    if keycode == CAPS_LOCK_KEYCODE {
        return true;
    }
    match device_modifier_mask(keycode) {
        Some(mask) => flags & mask == 0,
        None => false,
    }
}

/// Map a macOS virtual key code (ANSI layout) to a raw key.
fn keycode_to_raw_key(keycode: u16) -> RawKey {
    let named = match keycode {
        0x24 => Some(NamedKey::Enter),
        0x30 => Some(NamedKey::Tab),
        0x31 => Some(NamedKey::Space),
        0x33 => Some(NamedKey::Backspace),
        0x35 => Some(NamedKey::Esc),
        0x37 => Some(NamedKey::Cmd),
        0x36 => Some(NamedKey::CmdR),
        0x38 => Some(NamedKey::Shift),
        0x3C => Some(NamedKey::ShiftR),
        0x39 => Some(NamedKey::CapsLock),
        0x3A => Some(NamedKey::Alt),
        0x3D => Some(NamedKey::AltR),
        0x3B => Some(NamedKey::Ctrl),
        0x3E => Some(NamedKey::CtrlR),
        0x72 => Some(NamedKey::Insert),
        0x73 => Some(NamedKey::Home),
        0x74 => Some(NamedKey::PageUp),
        0x75 => Some(NamedKey::Delete),
        0x77 => Some(NamedKey::End),
        0x79 => Some(NamedKey::PageDown),
        0x7B => Some(NamedKey::Left),
        0x7C => Some(NamedKey::Right),
        0x7D => Some(NamedKey::Down),
        0x7E => Some(NamedKey::Up),
        0x7A => Some(NamedKey::F(1)),
        0x78 => Some(NamedKey::F(2)),
        0x63 => Some(NamedKey::F(3)),
        0x76 => Some(NamedKey::F(4)),
        0x60 => Some(NamedKey::F(5)),
        0x61 => Some(NamedKey::F(6)),
        0x62 => Some(NamedKey::F(7)),
        0x64 => Some(NamedKey::F(8)),
        0x65 => Some(NamedKey::F(9)),
        0x6D => Some(NamedKey::F(10)),
        0x67 => Some(NamedKey::F(11)),
        0x6F => Some(NamedKey::F(12)),
        0x69 => Some(NamedKey::F(13)),
        0x6B => Some(NamedKey::F(14)),
        0x71 => Some(NamedKey::F(15)),
        0x6A => Some(NamedKey::F(16)),
        0x40 => Some(NamedKey::F(17)),
        0x4F => Some(NamedKey::F(18)),
        0x50 => Some(NamedKey::F(19)),
        0x5A => Some(NamedKey::F(20)),
        _ => None,
    };
    if let Some(key) = named {
        return RawKey::Named(key);
    }

    let c = match keycode {
        0x00 => 'a',
        0x0B => 'b',
        0x08 => 'c',
        0x02 => 'd',
        0x0E => 'e',
        0x03 => 'f',
        0x05 => 'g',
        0x04 => 'h',
        0x22 => 'i',
        0x26 => 'j',
        0x28 => 'k',
        0x25 => 'l',
        0x2E => 'm',
        0x2D => 'n',
        0x1F => 'o',
        0x23 => 'p',
        0x0C => 'q',
        0x0F => 'r',
        0x01 => 's',
        0x11 => 't',
        0x20 => 'u',
        0x09 => 'v',
        0x0D => 'w',
        0x07 => 'x',
        0x10 => 'y',
        0x06 => 'z',
        0x1D => '0',
        0x12 => '1',
        0x13 => '2',
        0x14 => '3',
        0x15 => '4',
        0x17 => '5',
        0x16 => '6',
        0x1A => '7',
        0x1C => '8',
        0x19 => '9',
        0x18 => '=',
        0x1B => '-',
        0x1E => ']',
        0x21 => '[',
        0x27 => '\'',
        0x29 => ';',
        0x2A => '\\',
        0x2B => ',',
        0x2C => '/',
        0x2F => '.',
        0x32 => '`',
        _ => return RawKey::Unidentified(keycode as u32),
    };
    RawKey::Char(c)
}

/// Keyboard hook reporting key releases.
pub struct MacOSKeyboardHook(TapHook<RawKey>);

impl MacOSKeyboardHook {
    pub fn new() -> Self {
        Self(TapHook::new(
            "keyboard-hook",
            keyboard_event_types,
            translate_key,
        ))
    }
}

impl Default for MacOSKeyboardHook {
    fn default() -> Self {
        Self::new()
    }
}

impl InputHook<RawKey> for MacOSKeyboardHook {
    fn start(&mut self, sink: RawSink<RawKey>) -> Result<(), HookError> {
        self.0.start(sink)
    }

    fn stop(&mut self) {
        self.0.stop()
    }

    fn is_running(&self) -> bool {
        self.0.is_running()
    }
}

/// Mouse hook reporting button presses and releases.
pub struct MacOSMouseHook(TapHook<RawClick>);

impl MacOSMouseHook {
    pub fn new() -> Self {
        Self(TapHook::new("mouse-hook", mouse_event_types, translate_click))
    }
}

impl Default for MacOSMouseHook {
    fn default() -> Self {
        Self::new()
    }
}

impl InputHook<RawClick> for MacOSMouseHook {
    fn start(&mut self, sink: RawSink<RawClick>) -> Result<(), HookError> {
        self.0.start(sink)
    }

    fn stop(&mut self) {
        self.0.stop()
    }

    fn is_running(&self) -> bool {
        self.0.is_running()
    }
}

/// Check if the application has Input Monitoring permission.
///
/// macOS has no direct query for this; creating a passive tap fails when
/// permission is missing.
pub fn check_permission() -> bool {
    CGEventTap::new(
        CGEventTapLocation::Session,
        CGEventTapPlacement::HeadInsertEventTap,
        CGEventTapOptions::ListenOnly,
        vec![CGEventType::KeyUp],
        |_proxy, _type, _event| CallbackResult::Keep,
    )
    .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_graphics::event::CGEventFlags;

    #[test]
    fn test_keycode_mapping() {
        assert_eq!(keycode_to_raw_key(0x00), RawKey::Char('a'));
        assert_eq!(keycode_to_raw_key(0x24), RawKey::Named(NamedKey::Enter));
        assert_eq!(keycode_to_raw_key(0x7A), RawKey::Named(NamedKey::F(1)));
        assert_eq!(keycode_to_raw_key(0xFF), RawKey::Unidentified(0xFF));
    }

    #[test]
    fn test_one_side_released_while_other_held() {
        let shift = CGEventFlags::CGEventFlagShift.bits();

        // Right shift goes up, left shift still down
        assert!(is_modifier_release(0x3C, shift | DEVICE_LSHIFT));
        assert!(!is_modifier_release(0x38, shift | DEVICE_LSHIFT));

        // Left shift pressed while right is held
        assert!(!is_modifier_release(0x38, shift | DEVICE_LSHIFT | DEVICE_RSHIFT));
    }

    #[test]
    fn test_caps_lock_reports_every_toggle() {
        let caps = CGEventFlags::CGEventFlagAlphaShift.bits();
        assert!(is_modifier_release(CAPS_LOCK_KEYCODE, caps));
        assert!(is_modifier_release(CAPS_LOCK_KEYCODE, 0));
    }

    #[test]
    fn test_non_modifier_flags_change_is_ignored() {
        assert!(!is_modifier_release(0x00, 0));
    }

    #[test]
    fn test_hook_creation() {
        let hook = MacOSKeyboardHook::new();
        assert!(!hook.is_running());
    }
}
