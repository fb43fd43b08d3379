use crate::domain::models::InputEvent;
use crate::domain::report::MouseButton;
use crate::error::ServiceError;
use crate::infrastructure::bluetooth::HidService;
use crate::infrastructure::permissions::PermissionBroker;
use crate::rpc::protocol::{
    methods, parse_args, ClickArgs, ErrorCode, MoveArgs, RpcRequest, RpcResponse, ScrollArgs,
};
use serde_json::Value;
use tracing::{debug, warn};

/// Maps RPC method names onto the HID service.
pub struct Dispatcher {
    service: HidService,
    permissions: PermissionBroker,
}

impl Dispatcher {
    pub fn new(service: HidService, permissions: PermissionBroker) -> Self {
        Self {
            service,
            permissions,
        }
    }

    pub fn service(&self) -> &HidService {
        &self.service
    }

    pub async fn dispatch(&self, request: RpcRequest) -> RpcResponse {
        debug!("RPC {} {}", request.method, request.args);
        let RpcRequest { method, args } = request;

        match method.as_str() {
            methods::IS_HID_SERVICE_RUNNING => {
                RpcResponse::Success(Value::Bool(self.service.is_running()))
            }
            methods::START_HID_SERVICE => match self.start().await {
                Ok(()) => RpcResponse::Success(Value::Bool(true)),
                Err(e) => e.into(),
            },
            methods::STOP_HID_SERVICE => {
                self.service.stop();
                RpcResponse::Success(Value::Null)
            }
            methods::SEND_MOUSE_MOVE => match parse_args::<MoveArgs>(args) {
                Ok(MoveArgs { dx, dy }) => self.send(InputEvent::Move { dx, dy }).await,
                Err(e) => invalid_argument(&method, e),
            },
            methods::SEND_MOUSE_CLICK => match parse_args::<ClickArgs>(args) {
                Ok(ClickArgs { kind }) => {
                    let button = MouseButton::from_name(&kind);
                    if button == MouseButton::Unknown {
                        debug!("Unknown click type '{}', sending empty press", kind);
                    }
                    self.send(InputEvent::Click(button)).await
                }
                Err(e) => invalid_argument(&method, e),
            },
            methods::SEND_SCROLL => match parse_args::<ScrollArgs>(args) {
                Ok(ScrollArgs { amount }) => self.send(InputEvent::Scroll(amount)).await,
                Err(e) => invalid_argument(&method, e),
            },
            other => {
                warn!("Unknown RPC method: {}", other);
                RpcResponse::NotImplemented
            }
        }
    }

    async fn start(&self) -> Result<(), ServiceError> {
        self.permissions.ensure_granted().await?;
        self.service.start()
    }

    async fn send(&self, event: InputEvent) -> RpcResponse {
        self.service.send(event).await;
        RpcResponse::Success(Value::Null)
    }
}

fn invalid_argument(method: &str, e: serde_json::Error) -> RpcResponse {
    warn!("Bad arguments for {}: {}", method, e);
    RpcResponse::Error {
        code: ErrorCode::InvalidArgument,
        message: format!("Invalid arguments for {}: {}", method, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::DeviceHandle;
    use crate::infrastructure::bluetooth::loopback::LoopbackAdapter;
    use crate::infrastructure::bluetooth::{BluetoothAdapter, ServiceConfig};
    use crate::infrastructure::permissions::StaticPermissions;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    fn dispatcher(adapter: Option<Arc<LoopbackAdapter>>, granted: bool) -> Dispatcher {
        let adapter = adapter.map(|a| a as Arc<dyn BluetoothAdapter>);
        let service = HidService::new(
            adapter,
            ServiceConfig {
                click_release_delay: Duration::from_millis(1),
                ..ServiceConfig::default()
            },
        );
        Dispatcher::new(
            service,
            PermissionBroker::new(Arc::new(StaticPermissions::new(granted))),
        )
    }

    async fn call(dispatcher: &Dispatcher, method: &str, args: Value) -> RpcResponse {
        dispatcher.dispatch(RpcRequest::new(method, args)).await
    }

    fn error_code(response: &RpcResponse) -> Option<ErrorCode> {
        match response {
            RpcResponse::Error { code, .. } => Some(*code),
            _ => None,
        }
    }

    #[tokio::test]
    async fn test_start_error_codes() {
        let missing = dispatcher(None, true);
        let response = call(&missing, methods::START_HID_SERVICE, Value::Null).await;
        assert_eq!(error_code(&response), Some(ErrorCode::BluetoothNotAvailable));

        let off = dispatcher(Some(Arc::new(LoopbackAdapter::new(false))), true);
        let response = call(&off, methods::START_HID_SERVICE, Value::Null).await;
        assert_eq!(error_code(&response), Some(ErrorCode::BluetoothDisabled));

        let adapter = Arc::new(LoopbackAdapter::new(true));
        adapter.profile().reject_registration(Some("busy".to_string()));
        let rejected = dispatcher(Some(adapter), true);
        let response = call(&rejected, methods::START_HID_SERVICE, Value::Null).await;
        assert_eq!(error_code(&response), Some(ErrorCode::HidError));
    }

    #[tokio::test]
    async fn test_permission_denied_before_touching_stack() {
        let adapter = Arc::new(LoopbackAdapter::new(true));
        let denied = dispatcher(Some(adapter.clone()), false);

        let response = call(&denied, methods::START_HID_SERVICE, Value::Null).await;

        assert_eq!(error_code(&response), Some(ErrorCode::PermissionDenied));
        assert_eq!(adapter.profile().registrations(), 0);
    }

    #[tokio::test]
    async fn test_start_query_stop() {
        let d = dispatcher(Some(Arc::new(LoopbackAdapter::new(true))), true);

        assert_eq!(
            call(&d, methods::IS_HID_SERVICE_RUNNING, Value::Null).await,
            RpcResponse::Success(json!(false))
        );
        assert_eq!(
            call(&d, methods::START_HID_SERVICE, Value::Null).await,
            RpcResponse::Success(json!(true))
        );
        assert_eq!(
            call(&d, methods::IS_HID_SERVICE_RUNNING, Value::Null).await,
            RpcResponse::Success(json!(true))
        );
        assert_eq!(
            call(&d, methods::STOP_HID_SERVICE, Value::Null).await,
            RpcResponse::Success(Value::Null)
        );
        assert_eq!(
            call(&d, methods::IS_HID_SERVICE_RUNNING, Value::Null).await,
            RpcResponse::Success(json!(false))
        );
    }

    #[tokio::test]
    async fn test_input_methods_reach_host() {
        let adapter = Arc::new(LoopbackAdapter::new(true));
        let d = dispatcher(Some(adapter.clone()), true);
        call(&d, methods::START_HID_SERVICE, Value::Null).await;
        let host = DeviceHandle::new("AA:BB");
        adapter.profile().connect_host(host);

        call(&d, methods::SEND_MOUSE_MOVE, json!({ "dx": -500, "dy": 12 })).await;
        call(&d, methods::SEND_MOUSE_CLICK, json!({ "type": "right" })).await;
        call(&d, methods::SEND_SCROLL, json!({ "amount": 2 })).await;
        call(&d, methods::SEND_MOUSE_CLICK, Value::Null).await;

        let data: Vec<Vec<u8>> = adapter
            .profile()
            .reports()
            .into_iter()
            .map(|r| r.data)
            .collect();
        assert_eq!(
            data,
            vec![
                vec![0x00, 0x81, 0x0C, 0x00],
                vec![0x02, 0, 0, 0],
                vec![0, 0, 0, 0],
                vec![0, 0, 0, 0x02],
                vec![0x01, 0, 0, 0],
                vec![0, 0, 0, 0],
            ]
        );
    }

    #[tokio::test]
    async fn test_unknown_click_type_sends_empty_press() {
        let adapter = Arc::new(LoopbackAdapter::new(true));
        let d = dispatcher(Some(adapter.clone()), true);
        call(&d, methods::START_HID_SERVICE, Value::Null).await;
        adapter.profile().connect_host(DeviceHandle::new("AA:BB"));

        call(&d, methods::SEND_MOUSE_CLICK, json!({ "type": "back" })).await;

        let reports = adapter.profile().reports();
        assert_eq!(reports.len(), 2);
        assert!(reports.iter().all(|r| r.data == vec![0, 0, 0, 0]));
    }

    #[tokio::test]
    async fn test_bad_arguments_and_unknown_method() {
        let d = dispatcher(None, true);
        let response = call(&d, methods::SEND_SCROLL, json!({ "amount": "lots" })).await;
        assert_eq!(error_code(&response), Some(ErrorCode::InvalidArgument));

        assert_eq!(
            call(&d, "sendKeyPress", Value::Null).await,
            RpcResponse::NotImplemented
        );
    }

    #[tokio::test]
    async fn test_sends_before_start_are_dropped() {
        let adapter = Arc::new(LoopbackAdapter::new(true));
        let d = dispatcher(Some(adapter.clone()), true);

        let response = call(&d, methods::SEND_MOUSE_MOVE, json!({ "dx": 1, "dy": 1 })).await;

        assert_eq!(response, RpcResponse::Success(Value::Null));
        assert!(adapter.profile().reports().is_empty());
    }
}
