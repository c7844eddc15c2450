use crate::control::keymap::{Modifiers, native_key_name};
use std::sync::Arc;
use tether_core::{KeyEvent, PointerEvent, RemoteControlEvent, WheelEvent};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

impl MouseButton {
    /// DOM button code: 0 left, 1 middle, 2 right.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(MouseButton::Left),
            1 => Some(MouseButton::Middle),
            2 => Some(MouseButton::Right),
            _ => None,
        }
    }
}

/// Mouse half of the injection contract. Coordinates are in captured-frame
/// space; a `None` button means no button action.
#[derive(Debug, Clone, PartialEq)]
pub enum MouseInput {
    Move {
        x: i32,
        y: i32,
    },
    Down {
        x: i32,
        y: i32,
        button: Option<MouseButton>,
    },
    Up {
        x: i32,
        y: i32,
        button: Option<MouseButton>,
    },
    Wheel {
        x: i32,
        y: i32,
        delta_x: f64,
        delta_y: f64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Down,
    Up,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyboardInput {
    pub action: KeyAction,
    /// Native key name, see [`native_key_name`].
    pub key: String,
    /// DOM code as received.
    pub code: String,
    pub modifiers: Modifiers,
}

/// Either half of the contract, after classification.
#[derive(Debug, Clone, PartialEq)]
pub enum InjectedInput {
    Mouse(MouseInput),
    Keyboard(KeyboardInput),
}

impl From<RemoteControlEvent> for InjectedInput {
    fn from(event: RemoteControlEvent) -> Self {
        fn pointer(p: PointerEvent) -> (i32, i32, Option<MouseButton>) {
            (p.x, p.y, p.button.and_then(MouseButton::from_code))
        }
        fn keyboard(action: KeyAction, k: KeyEvent) -> KeyboardInput {
            KeyboardInput {
                action,
                key: native_key_name(&k.key, &k.code),
                modifiers: Modifiers::from_event(&k),
                code: k.code,
            }
        }

        match event {
            RemoteControlEvent::MouseMove(p) => {
                InjectedInput::Mouse(MouseInput::Move { x: p.x, y: p.y })
            }
            RemoteControlEvent::MouseDown(p) => {
                let (x, y, button) = pointer(p);
                InjectedInput::Mouse(MouseInput::Down { x, y, button })
            }
            RemoteControlEvent::MouseUp(p) => {
                let (x, y, button) = pointer(p);
                InjectedInput::Mouse(MouseInput::Up { x, y, button })
            }
            RemoteControlEvent::Wheel(WheelEvent {
                x,
                y,
                delta_x,
                delta_y,
            }) => InjectedInput::Mouse(MouseInput::Wheel {
                x,
                y,
                delta_x,
                delta_y,
            }),
            RemoteControlEvent::KeyDown(k) => InjectedInput::Keyboard(keyboard(KeyAction::Down, k)),
            RemoteControlEvent::KeyUp(k) => InjectedInput::Keyboard(keyboard(KeyAction::Up, k)),
        }
    }
}

/// OS input-injection collaborator. Calls are fire-and-forget.
pub trait InputInjector: Send + Sync {
    /// Whether native injection works in this process.
    fn is_available(&self) -> bool;

    fn inject_mouse(&self, input: MouseInput);

    fn inject_keyboard(&self, input: KeyboardInput);
}

/// Result of probing an injector once, up front.
#[derive(Clone)]
pub enum InjectionCapability {
    Available(Arc<dyn InputInjector>),
    Unavailable,
}

impl InjectionCapability {
    pub fn probe(injector: Arc<dyn InputInjector>) -> Self {
        if injector.is_available() {
            InjectionCapability::Available(injector)
        } else {
            warn!("Input injection unavailable, remote control events will be ignored");
            InjectionCapability::Unavailable
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, InjectionCapability::Available(_))
    }
}

/// Logs what would be injected. Used where no native backend exists.
#[derive(Debug, Default)]
pub struct TracingInjector;

impl InputInjector for TracingInjector {
    fn is_available(&self) -> bool {
        true
    }

    fn inject_mouse(&self, input: MouseInput) {
        info!("inject mouse {:?}", input);
    }

    fn inject_keyboard(&self, input: KeyboardInput) {
        // A key tap covers both edges, so only the press is acted on.
        if input.action == KeyAction::Down {
            info!("inject key tap {} {:?}", input.key, input.modifiers.names());
        }
    }
}
