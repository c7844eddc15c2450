//! Translation from DOM keyboard naming to native key names.

use tether_core::KeyEvent;

/// Native name for a key, preferring the layout-independent `code`.
///
/// `KeyA` becomes `a`, `Digit7` becomes `7`, a few named keys are mapped and
/// anything else falls back to the lowercased `key`.
pub fn native_key_name(key: &str, code: &str) -> String {
    if let Some(letter) = code.strip_prefix("Key") {
        return letter.to_lowercase();
    }
    if let Some(digit) = code.strip_prefix("Digit") {
        return digit.to_owned();
    }
    let named = match code {
        "Enter" => "enter",
        "Space" => "space",
        "Backspace" => "backspace",
        "Tab" => "tab",
        "Escape" => "escape",
        "ArrowUp" => "up",
        "ArrowDown" => "down",
        "ArrowLeft" => "left",
        "ArrowRight" => "right",
        _ => return key.to_lowercase(),
    };
    named.to_owned()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub control: bool,
    pub alt: bool,
    pub command: bool,
}

impl Modifiers {
    pub fn from_event(event: &KeyEvent) -> Self {
        Self {
            shift: event.shift_key,
            control: event.ctrl_key,
            alt: event.alt_key,
            command: event.meta_key,
        }
    }

    /// Held modifiers in native naming, always in the same order.
    pub fn names(&self) -> Vec<&'static str> {
        [
            (self.shift, "shift"),
            (self.control, "control"),
            (self.alt, "alt"),
            (self.command, "command"),
        ]
        .into_iter()
        .filter_map(|(held, name)| held.then_some(name))
        .collect()
    }

    pub fn is_empty(&self) -> bool {
        !(self.shift || self.control || self.alt || self.command)
    }
}
