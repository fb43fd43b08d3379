//! RPC wire format
//!
//! One JSON object per line in each direction.
//!
//! ```text
//! -> {"method":"sendMouseMove","args":{"dx":10,"dy":-3}}
//! <- {"Success":null}
//! -> {"method":"startHIDService"}
//! <- {"Error":{"code":"BLUETOOTH_DISABLED","message":"Please enable Bluetooth"}}
//! ```

use crate::error::ServiceError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod methods {
    pub const IS_HID_SERVICE_RUNNING: &str = "isHIDServiceRunning";
    pub const START_HID_SERVICE: &str = "startHIDService";
    pub const STOP_HID_SERVICE: &str = "stopHIDService";
    pub const SEND_MOUSE_MOVE: &str = "sendMouseMove";
    pub const SEND_MOUSE_CLICK: &str = "sendMouseClick";
    pub const SEND_SCROLL: &str = "sendScroll";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    pub method: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub args: Value,
}

impl RpcRequest {
    pub fn new(method: impl Into<String>, args: Value) -> Self {
        Self {
            method: method.into(),
            args,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    BluetoothNotAvailable,
    BluetoothDisabled,
    HidError,
    PermissionDenied,
    InvalidArgument,
}

impl From<&ServiceError> for ErrorCode {
    fn from(e: &ServiceError) -> Self {
        match e {
            ServiceError::BluetoothUnavailable => ErrorCode::BluetoothNotAvailable,
            ServiceError::BluetoothDisabled => ErrorCode::BluetoothDisabled,
            ServiceError::PermissionDenied => ErrorCode::PermissionDenied,
            ServiceError::RegistrationFailed(_) => ErrorCode::HidError,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RpcResponse {
    Success(Value),
    Error { code: ErrorCode, message: String },
    NotImplemented,
}

impl From<ServiceError> for RpcResponse {
    fn from(e: ServiceError) -> Self {
        RpcResponse::Error {
            code: ErrorCode::from(&e),
            message: e.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MoveArgs {
    pub dx: i32,
    pub dy: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClickArgs {
    #[serde(rename = "type")]
    pub kind: String,
}

impl Default for ClickArgs {
    fn default() -> Self {
        Self {
            kind: "left".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrollArgs {
    pub amount: i32,
}

/// Missing arguments take their defaults; present ones must have the right shape.
pub fn parse_args<T: DeserializeOwned + Default>(args: Value) -> Result<T, serde_json::Error> {
    if args.is_null() {
        Ok(T::default())
    } else {
        serde_json::from_value(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_without_args() {
        let request: RpcRequest =
            serde_json::from_str(r#"{"method":"isHIDServiceRunning"}"#).unwrap();
        assert_eq!(request.method, methods::IS_HID_SERVICE_RUNNING);
        assert!(request.args.is_null());
    }

    #[test]
    fn test_argument_defaults() {
        let click: ClickArgs = parse_args(Value::Null).unwrap();
        assert_eq!(click.kind, "left");

        let moved: MoveArgs = parse_args(json!({ "dx": 4 })).unwrap();
        assert_eq!(moved, MoveArgs { dx: 4, dy: 0 });

        let scroll: ScrollArgs = parse_args(json!({})).unwrap();
        assert_eq!(scroll.amount, 0);

        let click: ClickArgs = parse_args(json!({ "type": "middle" })).unwrap();
        assert_eq!(click.kind, "middle");
    }

    #[test]
    fn test_wrong_argument_type() {
        assert!(parse_args::<MoveArgs>(json!({ "dx": "left" })).is_err());
        assert!(parse_args::<ScrollArgs>(json!({ "amount": 1.5 })).is_err());
    }

    #[test]
    fn test_error_codes() {
        let response = RpcResponse::from(ServiceError::BluetoothUnavailable);
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({
                "Error": {
                    "code": "BLUETOOTH_NOT_AVAILABLE",
                    "message": "Bluetooth not available"
                }
            })
        );

        let codes = [
            (ServiceError::BluetoothDisabled, "BLUETOOTH_DISABLED"),
            (ServiceError::PermissionDenied, "PERMISSION_DENIED"),
            (ServiceError::RegistrationFailed("x".into()), "HID_ERROR"),
        ];
        for (error, code) in codes {
            assert_eq!(
                serde_json::to_value(ErrorCode::from(&error)).unwrap(),
                json!(code)
            );
        }
    }

    #[test]
    fn test_success_encoding() {
        assert_eq!(
            serde_json::to_string(&RpcResponse::Success(json!(true))).unwrap(),
            r#"{"Success":true}"#
        );
        assert_eq!(
            serde_json::to_string(&RpcResponse::NotImplemented).unwrap(),
            r#""NotImplemented""#
        );
    }
}
