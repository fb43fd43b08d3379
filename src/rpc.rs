//! Host-side RPC surface
//!
//! Six methods over a local socket: query, start and stop the HID service,
//! and the three mouse inputs.

pub mod client;
pub mod dispatch;
pub mod protocol;
pub mod server;

pub use client::RpcClient;
pub use dispatch::Dispatcher;
pub use protocol::{RpcRequest, RpcResponse};
pub use server::serve;
