use serde::{Deserialize, Serialize};

/// One physical input occurrence on the viewer, addressed to the host.
///
/// Coordinates are in the host's captured-frame space, not viewer viewport
/// pixels. The JSON form matches DOM event naming: `{"type": "mousemove",
/// "x": 100, "y": 200}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RemoteControlEvent {
    MouseMove(PointerEvent),
    MouseDown(PointerEvent),
    MouseUp(PointerEvent),
    Wheel(WheelEvent),
    KeyDown(KeyEvent),
    KeyUp(KeyEvent),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointerEvent {
    pub x: i32,
    pub y: i32,
    /// DOM button code; absent for plain moves.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub button: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WheelEvent {
    #[serde(default)]
    pub x: i32,
    #[serde(default)]
    pub y: i32,
    #[serde(default)]
    pub delta_x: f64,
    #[serde(default)]
    pub delta_y: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyEvent {
    pub key: String,
    pub code: String,
    #[serde(default)]
    pub shift_key: bool,
    #[serde(default)]
    pub ctrl_key: bool,
    #[serde(default)]
    pub alt_key: bool,
    #[serde(default)]
    pub meta_key: bool,
}

#[derive(Debug, thiserror::Error)]
#[error("malformed control event: {0}")]
pub struct CodecError(#[from] serde_json::Error);

impl RemoteControlEvent {
    pub fn mouse_move(x: i32, y: i32) -> Self {
        Self::MouseMove(PointerEvent { x, y, button: None })
    }

    pub fn mouse_down(x: i32, y: i32, button: u8) -> Self {
        Self::MouseDown(PointerEvent {
            x,
            y,
            button: Some(button),
        })
    }

    pub fn mouse_up(x: i32, y: i32, button: u8) -> Self {
        Self::MouseUp(PointerEvent {
            x,
            y,
            button: Some(button),
        })
    }

    pub fn wheel(delta_x: f64, delta_y: f64) -> Self {
        Self::Wheel(WheelEvent {
            x: 0,
            y: 0,
            delta_x,
            delta_y,
        })
    }

    pub fn key_down(key: impl Into<String>, code: impl Into<String>) -> Self {
        Self::KeyDown(KeyEvent::plain(key, code))
    }

    pub fn key_up(key: impl Into<String>, code: impl Into<String>) -> Self {
        Self::KeyUp(KeyEvent::plain(key, code))
    }

    /// The wire tag, e.g. `"mousemove"`.
    pub fn tag(&self) -> &'static str {
        match self {
            RemoteControlEvent::MouseMove(_) => "mousemove",
            RemoteControlEvent::MouseDown(_) => "mousedown",
            RemoteControlEvent::MouseUp(_) => "mouseup",
            RemoteControlEvent::Wheel(_) => "wheel",
            RemoteControlEvent::KeyDown(_) => "keydown",
            RemoteControlEvent::KeyUp(_) => "keyup",
        }
    }

    pub fn encode(&self) -> Result<String, CodecError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn decode(payload: &[u8]) -> Result<Self, CodecError> {
        Ok(serde_json::from_slice(payload)?)
    }

    pub fn to_value(&self) -> Result<serde_json::Value, CodecError> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, CodecError> {
        Ok(serde_json::from_value(value)?)
    }
}

impl KeyEvent {
    pub fn plain(key: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            code: code.into(),
            shift_key: false,
            ctrl_key: false,
            alt_key: false,
            meta_key: false,
        }
    }
}
