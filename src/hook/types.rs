//! Raw input signals as reported by an OS hook, before normalization.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A control or function key that has a symbolic name rather than a character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NamedKey {
    Alt,
    AltL,
    AltR,
    AltGr,
    Backspace,
    CapsLock,
    Cmd,
    CmdR,
    Ctrl,
    CtrlL,
    CtrlR,
    Delete,
    Down,
    End,
    Enter,
    Esc,
    /// Function key `F1`..=`F24`.
    F(u8),
    Home,
    Insert,
    Left,
    Menu,
    NumLock,
    PageDown,
    PageUp,
    Pause,
    PrintScreen,
    Right,
    ScrollLock,
    Shift,
    ShiftR,
    Space,
    Tab,
    Up,
}

impl fmt::Display for NamedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NamedKey::Alt => "alt",
            NamedKey::AltL => "alt_l",
            NamedKey::AltR => "alt_r",
            NamedKey::AltGr => "alt_gr",
            NamedKey::Backspace => "backspace",
            NamedKey::CapsLock => "caps_lock",
            NamedKey::Cmd => "cmd",
            NamedKey::CmdR => "cmd_r",
            NamedKey::Ctrl => "ctrl",
            NamedKey::CtrlL => "ctrl_l",
            NamedKey::CtrlR => "ctrl_r",
            NamedKey::Delete => "delete",
            NamedKey::Down => "down",
            NamedKey::End => "end",
            NamedKey::Enter => "enter",
            NamedKey::Esc => "esc",
            NamedKey::F(n) => return write!(f, "f{n}"),
            NamedKey::Home => "home",
            NamedKey::Insert => "insert",
            NamedKey::Left => "left",
            NamedKey::Menu => "menu",
            NamedKey::NumLock => "num_lock",
            NamedKey::PageDown => "page_down",
            NamedKey::PageUp => "page_up",
            NamedKey::Pause => "pause",
            NamedKey::PrintScreen => "print_screen",
            NamedKey::Right => "right",
            NamedKey::ScrollLock => "scroll_lock",
            NamedKey::Shift => "shift",
            NamedKey::ShiftR => "shift_r",
            NamedKey::Space => "space",
            NamedKey::Tab => "tab",
            NamedKey::Up => "up",
        };
        f.write_str(name)
    }
}

/// A key signal straight from the hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawKey {
    /// Control/function key with a symbolic name
    Named(NamedKey),
    /// Key producing a literal character
    Char(char),
    /// Platform key code we have no mapping for
    Unidentified(u32),
}

impl RawKey {
    /// The key identifier carried by a [`KeyboardEvent`](crate::core::KeyboardEvent).
    ///
    /// Named keys resolve to their symbolic name, character keys to the
    /// character itself. Anything else has no identifier.
    pub fn identifier(&self) -> Option<String> {
        match self {
            RawKey::Named(key) => Some(key.to_string()),
            RawKey::Char(c) => Some(c.to_string()),
            RawKey::Unidentified(_) => None,
        }
    }
}

impl From<char> for RawKey {
    fn from(c: char) -> Self {
        RawKey::Char(c)
    }
}

impl From<NamedKey> for RawKey {
    fn from(key: NamedKey) -> Self {
        RawKey::Named(key)
    }
}

/// Mouse button identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Button {
    Left,
    Right,
    Middle,
    /// Extra buttons, by platform button number
    Other(u16),
}

impl fmt::Display for Button {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Button::Left => f.write_str("left"),
            Button::Right => f.write_str("right"),
            Button::Middle => f.write_str("middle"),
            Button::Other(n) => write!(f, "button{n}"),
        }
    }
}

/// A click signal straight from the hook. Both presses and releases arrive here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawClick {
    pub x: i32,
    pub y: i32,
    pub button: Button,
    pub pressed: bool,
}

impl RawClick {
    pub fn press(x: i32, y: i32, button: Button) -> Self {
        Self {
            x,
            y,
            button,
            pressed: true,
        }
    }

    pub fn release(x: i32, y: i32, button: Button) -> Self {
        Self {
            x,
            y,
            button,
            pressed: false,
        }
    }
}
