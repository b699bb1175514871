//! Windows hooks using the low-level hook API (SetWindowsHookEx).
//!
//! Each hook installs itself on a dedicated thread that pumps a message
//! loop. Stopping posts `WM_QUIT` to that thread, which unhooks and exits.

use crate::hook::types::{Button, NamedKey, RawClick, RawKey};
use crate::hook::{HookError, InputHook, RawSink};
use crossbeam_channel::bounded;
use std::cell::RefCell;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use windows::Win32::Foundation::{HWND, LPARAM, LRESULT, WPARAM};
use windows::Win32::System::Threading::GetCurrentThreadId;
use windows::Win32::UI::WindowsAndMessaging::{
    CallNextHookEx, GetMessageW, PeekMessageW, PostThreadMessageW, SetWindowsHookExW,
    UnhookWindowsHookEx, HHOOK, HOOKPROC, KBDLLHOOKSTRUCT, MSG, MSLLHOOKSTRUCT, PM_NOREMOVE,
    WH_KEYBOARD_LL, WH_MOUSE_LL, WINDOWS_HOOK_ID, WM_KEYUP, WM_LBUTTONDOWN, WM_LBUTTONUP,
    WM_MBUTTONDOWN, WM_MBUTTONUP, WM_QUIT, WM_RBUTTONDOWN, WM_RBUTTONUP, WM_SYSKEYUP, WM_USER,
    WM_XBUTTONDOWN, WM_XBUTTONUP,
};

/// How long `start()` waits for the hook thread to report back.
const STARTUP_TIMEOUT: Duration = Duration::from_secs(2);

// Hook procedures cannot capture state, so each hook thread parks its sink here.
thread_local! {
    static KEY_SINK: RefCell<Option<RawSink<RawKey>>> = const { RefCell::new(None) };
    static CLICK_SINK: RefCell<Option<RawSink<RawClick>>> = const { RefCell::new(None) };
}

/// A hook thread running a message loop with one low-level hook installed.
struct HookThread {
    name: &'static str,
    hook_id: WINDOWS_HOOK_ID,
    hook_proc: HOOKPROC,
    running: Arc<AtomicBool>,
    thread_id: Arc<AtomicU32>,
    thread_handle: Option<JoinHandle<()>>,
}

impl HookThread {
    fn new(name: &'static str, hook_id: WINDOWS_HOOK_ID, hook_proc: HOOKPROC) -> Self {
        Self {
            name,
            hook_id,
            hook_proc,
            running: Arc::new(AtomicBool::new(false)),
            thread_id: Arc::new(AtomicU32::new(0)),
            thread_handle: None,
        }
    }

    /// Spawn the hook thread. `install_sink` runs first on the new thread.
    fn start(&mut self, install_sink: impl FnOnce() + Send + 'static) -> Result<(), HookError> {
        if self.running.load(Ordering::SeqCst) {
            return Err(HookError::AlreadyRunning);
        }

        self.running.store(true, Ordering::SeqCst);

        let running = self.running.clone();
        let thread_id = self.thread_id.clone();
        let hook_id = self.hook_id;
        let hook_proc = self.hook_proc;
        let (ready_tx, ready_rx) = bounded(1);

        let handle = thread::Builder::new()
            .name(self.name.into())
            .spawn(move || {
                install_sink();
                if let Err(e) = run_hook_loop(hook_id, hook_proc, &thread_id, ready_tx) {
                    tracing::error!("Hook loop error: {e}");
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
                self.join();
                Err(e)
            }
            Err(_) => {
                self.stop();
                Err(HookError::ThreadFailed("hook thread did not start".into()))
            }
        }
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);

        let thread_id = self.thread_id.swap(0, Ordering::SeqCst);
        if thread_id != 0 {
            let posted = unsafe { PostThreadMessageW(thread_id, WM_QUIT, WPARAM(0), LPARAM(0)) };
            if let Err(e) = posted {
                tracing::warn!("Could not signal {} thread to quit: {e}", self.name);
            }
        }

        self.join();
    }

    fn join(&mut self) {
        if let Some(handle) = self.thread_handle.take() {
            if handle.join().is_err() {
                tracing::error!("{} thread panicked", self.name);
            }
        }
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Drop for HookThread {
    fn drop(&mut self) {
        if self.thread_handle.is_some() {
            self.stop();
        }
    }
}

/// Install the hook and pump messages until `WM_QUIT` arrives.
fn run_hook_loop(
    hook_id: WINDOWS_HOOK_ID,
    hook_proc: HOOKPROC,
    thread_id: &AtomicU32,
    ready: crossbeam_channel::Sender<Result<(), HookError>>,
) -> Result<(), HookError> {
    unsafe {
        let mut msg = MSG::default();

        // Force creation of this thread's message queue so WM_QUIT can be posted
        let _ = PeekMessageW(&mut msg, HWND::default(), WM_USER, WM_USER, PM_NOREMOVE);
        thread_id.store(GetCurrentThreadId(), Ordering::SeqCst);

        let hook: HHOOK = match SetWindowsHookExW(hook_id, hook_proc, None, 0) {
            Ok(hook) => hook,
            Err(e) => {
                let err = HookError::InstallFailed(e.to_string());
                let _ = ready.send(Err(err.clone()));
                return Err(err);
            }
        };
        let _ = ready.send(Ok(()));

        loop {
            let result = GetMessageW(&mut msg, HWND::default(), 0, 0);
            if result.0 <= 0 {
                // WM_QUIT (0) or error (-1)
                break;
            }
        }

        let _ = UnhookWindowsHookEx(hook);
    }

    Ok(())
}

/// Low-level keyboard hook callback. Only releases are reported.
unsafe extern "system" fn keyboard_hook_proc(
    n_code: i32,
    w_param: WPARAM,
    l_param: LPARAM,
) -> LRESULT {
    if n_code >= 0 && matches!(w_param.0 as u32, WM_KEYUP | WM_SYSKEYUP) {
        let kb_struct = &*(l_param.0 as *const KBDLLHOOKSTRUCT);
        let key = vk_to_raw_key(kb_struct.vkCode);

        // Clone out of the cell so a callback can never observe a held borrow
        let sink = KEY_SINK.with(|cell| cell.borrow().clone());
        if let Some(sink) = sink {
            sink(key);
        }
    }

    CallNextHookEx(HHOOK::default(), n_code, w_param, l_param)
}

/// Low-level mouse hook callback. Presses and releases are both reported.
unsafe extern "system" fn mouse_hook_proc(n_code: i32, w_param: WPARAM, l_param: LPARAM) -> LRESULT {
    if n_code >= 0 {
        let mouse_struct = &*(l_param.0 as *const MSLLHOOKSTRUCT);

        let signal = match w_param.0 as u32 {
            WM_LBUTTONDOWN => Some((Button::Left, true)),
            WM_LBUTTONUP => Some((Button::Left, false)),
            WM_RBUTTONDOWN => Some((Button::Right, true)),
            WM_RBUTTONUP => Some((Button::Right, false)),
            WM_MBUTTONDOWN => Some((Button::Middle, true)),
            WM_MBUTTONUP => Some((Button::Middle, false)),
            msg @ (WM_XBUTTONDOWN | WM_XBUTTONUP) => {
                // High word of mouseData holds XBUTTON1 (1) or XBUTTON2 (2); numbered 3 and 4 as on macOS
                let xbutton = ((mouse_struct.mouseData >> 16) & 0xFFFF) as u16;
                Some((Button::Other(xbutton + 2), msg == WM_XBUTTONDOWN))
            }
            _ => None,
        };

        if let Some((button, pressed)) = signal {
            let click = RawClick {
                x: mouse_struct.pt.x,
                y: mouse_struct.pt.y,
                button,
                pressed,
            };
            let sink = CLICK_SINK.with(|cell| cell.borrow().clone());
            if let Some(sink) = sink {
                sink(click);
            }
        }
    }

    CallNextHookEx(HHOOK::default(), n_code, w_param, l_param)
}

/// Map a Windows virtual key code to a raw key (US layout, unshifted).
fn vk_to_raw_key(vk: u32) -> RawKey {
    let named = match vk {
        0x08 => Some(NamedKey::Backspace),
        0x09 => Some(NamedKey::Tab),
        0x0D => Some(NamedKey::Enter),
        0x10 | 0xA0 => Some(NamedKey::Shift),
        0xA1 => Some(NamedKey::ShiftR),
        0x11 => Some(NamedKey::Ctrl),
        0xA2 => Some(NamedKey::CtrlL),
        0xA3 => Some(NamedKey::CtrlR),
        0x12 => Some(NamedKey::Alt),
        0xA4 => Some(NamedKey::AltL),
        0xA5 => Some(NamedKey::AltGr),
        0x13 => Some(NamedKey::Pause),
        0x14 => Some(NamedKey::CapsLock),
        0x1B => Some(NamedKey::Esc),
        0x20 => Some(NamedKey::Space),
        0x21 => Some(NamedKey::PageUp),
        0x22 => Some(NamedKey::PageDown),
        0x23 => Some(NamedKey::End),
        0x24 => Some(NamedKey::Home),
        0x25 => Some(NamedKey::Left),
        0x26 => Some(NamedKey::Up),
        0x27 => Some(NamedKey::Right),
        0x28 => Some(NamedKey::Down),
        0x2C => Some(NamedKey::PrintScreen),
        0x2D => Some(NamedKey::Insert),
        0x2E => Some(NamedKey::Delete),
        0x5B => Some(NamedKey::Cmd),
        0x5C => Some(NamedKey::CmdR),
        0x5D => Some(NamedKey::Menu),
        0x70..=0x87 => Some(NamedKey::F((vk - 0x70 + 1) as u8)),
        0x90 => Some(NamedKey::NumLock),
        0x91 => Some(NamedKey::ScrollLock),
        _ => None,
    };
    if let Some(key) = named {
        return RawKey::Named(key);
    }

    let c = match vk {
        0x30..=0x39 | 0x41..=0x5A => char::from_u32(vk).map(|c| c.to_ascii_lowercase()),
        0x60..=0x69 => char::from_digit(vk - 0x60, 10),
        0x6A => Some('*'),
        0x6B => Some('+'),
        0x6D => Some('-'),
        0x6E => Some('.'),
        0x6F => Some('/'),
        0xBA => Some(';'),
        0xBB => Some('='),
        0xBC => Some(','),
        0xBD => Some('-'),
        0xBE => Some('.'),
        0xBF => Some('/'),
        0xC0 => Some('`'),
        0xDB => Some('['),
        0xDC => Some('\\'),
        0xDD => Some(']'),
        0xDE => Some('\''),
        _ => None,
    };

    match c {
        Some(c) => RawKey::Char(c),
        None => RawKey::Unidentified(vk),
    }
}

/// Keyboard hook reporting key releases.
pub struct WindowsKeyboardHook(HookThread);

impl WindowsKeyboardHook {
    pub fn new() -> Self {
        Self(HookThread::new(
            "keyboard-hook",
            WH_KEYBOARD_LL,
            Some(keyboard_hook_proc),
        ))
    }
}

impl Default for WindowsKeyboardHook {
    fn default() -> Self {
        Self::new()
    }
}

impl InputHook<RawKey> for WindowsKeyboardHook {
    fn start(&mut self, sink: RawSink<RawKey>) -> Result<(), HookError> {
        self.0.start(move || KEY_SINK.with(|cell| *cell.borrow_mut() = Some(sink)))
    }

    fn stop(&mut self) {
        self.0.stop()
    }

    fn is_running(&self) -> bool {
        self.0.is_running()
    }
}

/// Mouse hook reporting button presses and releases.
pub struct WindowsMouseHook(HookThread);

impl WindowsMouseHook {
    pub fn new() -> Self {
        Self(HookThread::new(
            "mouse-hook",
            WH_MOUSE_LL,
            Some(mouse_hook_proc),
        ))
    }
}

impl Default for WindowsMouseHook {
    fn default() -> Self {
        Self::new()
    }
}

impl InputHook<RawClick> for WindowsMouseHook {
    fn start(&mut self, sink: RawSink<RawClick>) -> Result<(), HookError> {
        self.0.start(move || CLICK_SINK.with(|cell| *cell.borrow_mut() = Some(sink)))
    }

    fn stop(&mut self) {
        self.0.stop()
    }

    fn is_running(&self) -> bool {
        self.0.is_running()
    }
}

/// Check if the application is allowed to install low-level hooks.
///
/// Installs and immediately removes a temporary keyboard hook.
pub fn check_permission() -> bool {
    unsafe {
        match SetWindowsHookExW(WH_KEYBOARD_LL, Some(keyboard_hook_proc), None, 0) {
            Ok(hook) => {
                let _ = UnhookWindowsHookEx(hook);
                true
            }
            Err(_) => false,
        }
    }
}
