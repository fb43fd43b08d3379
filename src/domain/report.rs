//! Mouse report encoding
//!
//! Turns logical input (move, button, scroll) into the 4-byte input report
//! declared by [`crate::domain::descriptor::MOUSE_REPORT_DESCRIPTOR`].
//! Every report is a full snapshot; nothing is accumulated between calls.

use crate::domain::descriptor::{AXIS_MAX, AXIS_MIN, MOUSE_REPORT_SIZE};
use std::time::Duration;

/// Gap between the press and release halves of a click.
pub const DEFAULT_CLICK_RELEASE_DELAY: Duration = Duration::from_millis(50);

/// Mouse buttons the descriptor exposes, plus a catch-all for names it does not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Unknown,
}

impl MouseButton {
    /// Map an RPC click type ("left", "right", "middle") to a button.
    pub fn from_name(name: &str) -> Self {
        match name {
            "left" => Self::Left,
            "right" => Self::Right,
            "middle" => Self::Middle,
            _ => Self::Unknown,
        }
    }

    /// Bit in the report's button field.
    pub fn mask(&self) -> u8 {
        match self {
            Self::Left => 0x01,
            Self::Right => 0x02,
            Self::Middle => 0x04,
            Self::Unknown => 0x00,
        }
    }
}

/// One input report: `[buttons, x, y, wheel]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MouseReport {
    pub buttons: u8,
    pub x: i8,
    pub y: i8,
    pub wheel: i8,
}

impl MouseReport {
    /// All-zero report; doubles as the release half of a click.
    pub const fn idle() -> Self {
        Self {
            buttons: 0,
            x: 0,
            y: 0,
            wheel: 0,
        }
    }

    pub fn is_idle(&self) -> bool {
        *self == Self::idle()
    }

    pub fn to_bytes(&self) -> [u8; MOUSE_REPORT_SIZE] {
        [self.buttons, self.x as u8, self.y as u8, self.wheel as u8]
    }

    /// Parse a report as it appears on the wire.
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        if data.len() != MOUSE_REPORT_SIZE {
            return None;
        }
        Some(Self {
            buttons: data[0],
            x: data[1] as i8,
            y: data[2] as i8,
            wheel: data[3] as i8,
        })
    }
}

fn clamp_axis(value: i32) -> i8 {
    value.clamp(AXIS_MIN as i32, AXIS_MAX as i32) as i8
}

/// Relative pointer motion, each axis clamped to -127..=127.
pub fn encode_move(dx: i32, dy: i32) -> MouseReport {
    MouseReport {
        x: clamp_axis(dx),
        y: clamp_axis(dy),
        ..MouseReport::idle()
    }
}

/// Button state. Only the named button's bit is ever set.
pub fn encode_button(button: MouseButton, pressed: bool) -> MouseReport {
    MouseReport {
        buttons: if pressed { button.mask() } else { 0 },
        ..MouseReport::idle()
    }
}

/// Wheel movement, clamped to -127..=127.
pub fn encode_scroll(amount: i32) -> MouseReport {
    MouseReport {
        wheel: clamp_axis(amount),
        ..MouseReport::idle()
    }
}

/// Press then release. The caller waits between the two sends.
pub fn encode_click(button: MouseButton) -> [MouseReport; 2] {
    [encode_button(button, true), encode_button(button, false)]
}
