//! HID Report Descriptor
//!
//! The fixed descriptor the device registers with the HID profile, and the
//! SDP record that accompanies it.
//!
//! ## Report layout
//!
//! ```text
//! [0] : Button bitfield
//!       bit 0: Left
//!       bit 1: Right
//!       bit 2: Middle
//!       bit 3-7: Constant padding
//! [1] : X displacement (i8, -127..127)
//! [2] : Y displacement (i8, -127..127)
//! [3] : Wheel          (i8, -127..127)
//! ```
//!
//! Changing anything here changes what remote hosts parse; the encoder in
//! [`crate::domain::report`] must move in lockstep.

use serde::{Deserialize, Serialize};

/// Input report size promised by [`MOUSE_REPORT_DESCRIPTOR`].
pub const MOUSE_REPORT_SIZE: usize = 4;

/// Reports are unnumbered.
pub const MOUSE_REPORT_ID: u8 = 0;

/// Logical range of the relative axes.
pub const AXIS_MIN: i8 = -127;
pub const AXIS_MAX: i8 = 127;

/// SDP subclass for a keyboard/pointer combo device.
pub const SUBCLASS_COMBO: u8 = 0xC0;

/// 3-button relative mouse with a wheel.
pub const MOUSE_REPORT_DESCRIPTOR: [u8; 62] = [
    0x05, 0x01, // Usage Page (Generic Desktop)
    0x09, 0x02, // Usage (Mouse)
    0xA1, 0x01, // Collection (Application)
    0x09, 0x01, //   Usage (Pointer)
    0xA1, 0x00, //   Collection (Physical)
    //
    // Buttons
    0x05, 0x09, //     Usage Page (Buttons)
    0x19, 0x01, //     Usage Minimum (1)
    0x29, 0x03, //     Usage Maximum (3)
    0x15, 0x00, //     Logical Minimum (0)
    0x25, 0x01, //     Logical Maximum (1)
    0x95, 0x03, //     Report Count (3)
    0x75, 0x01, //     Report Size (1)
    0x81, 0x02, //     Input (Data, Variable, Absolute)
    //
    // Padding
    0x95, 0x01, //     Report Count (1)
    0x75, 0x05, //     Report Size (5)
    0x81, 0x03, //     Input (Constant)
    //
    // X, Y
    0x05, 0x01, //     Usage Page (Generic Desktop)
    0x09, 0x30, //     Usage (X)
    0x09, 0x31, //     Usage (Y)
    0x15, 0x81, //     Logical Minimum (-127)
    0x25, 0x7F, //     Logical Maximum (127)
    0x75, 0x08, //     Report Size (8)
    0x95, 0x02, //     Report Count (2)
    0x81, 0x06, //     Input (Data, Variable, Relative)
    //
    // Wheel
    0x09, 0x38, //     Usage (Wheel)
    0x15, 0x81, //     Logical Minimum (-127)
    0x25, 0x7F, //     Logical Maximum (127)
    0x75, 0x08, //     Report Size (8)
    0x95, 0x01, //     Report Count (1)
    0x81, 0x06, //     Input (Data, Variable, Relative)
    //
    0xC0, //   End Collection
    0xC0, // End Collection
];

/// Immutable HID report descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HidDescriptor(&'static [u8]);

impl HidDescriptor {
    pub fn as_bytes(&self) -> &'static [u8] {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for HidDescriptor {
    fn as_ref(&self) -> &[u8] {
        self.0
    }
}

/// The mouse descriptor. Same bytes on every call.
pub fn descriptor() -> HidDescriptor {
    HidDescriptor(&MOUSE_REPORT_DESCRIPTOR)
}

/// SDP record published alongside the descriptor when the app registers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SdpSettings {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_description")]
    pub description: String,
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_subclass")]
    pub subclass: u8,
}

impl Default for SdpSettings {
    fn default() -> Self {
        Self {
            name: default_name(),
            description: default_description(),
            provider: default_provider(),
            subclass: default_subclass(),
        }
    }
}

fn default_name() -> String {
    "Bluetooth Mouse".to_string()
}
fn default_description() -> String {
    "Virtual Mouse".to_string()
}
fn default_provider() -> String {
    "Android".to_string()
}
fn default_subclass() -> u8 {
    SUBCLASS_COMBO
}

/// What the stack needs in order to register the HID application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HidAppRecord {
    pub sdp: SdpSettings,
    pub descriptor: HidDescriptor,
}

impl HidAppRecord {
    pub fn new(sdp: SdpSettings) -> Self {
        Self {
            sdp,
            descriptor: descriptor(),
        }
    }
}
