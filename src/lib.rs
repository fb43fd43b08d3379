//! Turns the local Bluetooth adapter into a HID mouse for a paired host.

pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod rpc;
