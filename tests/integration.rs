//! End-to-end tests against the loopback stack.

use bt_hid_mouse::domain::descriptor::{descriptor, MOUSE_REPORT_DESCRIPTOR};
use bt_hid_mouse::domain::models::{DeviceHandle, ServiceState};
use bt_hid_mouse::infrastructure::bluetooth::loopback::LoopbackAdapter;
use bt_hid_mouse::infrastructure::bluetooth::{BluetoothAdapter, HidService, ServiceConfig};
use bt_hid_mouse::infrastructure::permissions::{PermissionBroker, StaticPermissions};
use bt_hid_mouse::rpc::protocol::{methods, ErrorCode};
use bt_hid_mouse::rpc::{serve, Dispatcher, RpcClient, RpcRequest, RpcResponse};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

fn dispatcher_with(adapter: Arc<LoopbackAdapter>, granted: bool) -> Arc<Dispatcher> {
    let service = HidService::new(
        Some(adapter as Arc<dyn BluetoothAdapter>),
        ServiceConfig {
            click_release_delay: Duration::from_millis(5),
            ..ServiceConfig::default()
        },
    );
    Arc::new(Dispatcher::new(
        service,
        PermissionBroker::new(Arc::new(StaticPermissions::new(granted))),
    ))
}

fn socket_name(tag: &str) -> String {
    format!("bt_hid_mouse_test_{}_{}.sock", std::process::id(), tag)
}

#[tokio::test]
async fn session_over_local_socket() {
    let adapter = Arc::new(LoopbackAdapter::new(true));
    let dispatcher = dispatcher_with(adapter.clone(), true);
    let name = socket_name("session");
    let (stop_tx, stop_rx) = oneshot::channel::<()>();

    let server = tokio::spawn({
        let name = name.clone();
        let dispatcher = dispatcher.clone();
        async move {
            serve(&name, dispatcher, async move {
                let _ = stop_rx.await;
            })
            .await
        }
    });

    let mut client = RpcClient::wait_for_server(&name, Duration::from_secs(5))
        .await
        .unwrap();

    assert!(!client.is_running().await.unwrap());
    client.start_service().await.unwrap();
    assert!(client.is_running().await.unwrap());

    let host = DeviceHandle::new("00:11:22:33:44:55");
    adapter.profile().connect_host(host.clone());

    client.send_move(10, -3).await.unwrap();
    client.send_click("left").await.unwrap();
    client.send_scroll(-1).await.unwrap();

    let response = client.call("sendKeyPress", Value::Null).await.unwrap();
    assert_eq!(response, RpcResponse::NotImplemented);

    client.stop_service().await.unwrap();
    assert!(!client.is_running().await.unwrap());

    let reports = adapter.profile().reports();
    let data: Vec<Vec<u8>> = reports.iter().map(|r| r.data.clone()).collect();
    assert_eq!(
        data,
        vec![
            vec![0x00, 0x0A, 0xFD, 0x00],
            vec![0x01, 0x00, 0x00, 0x00],
            vec![0x00, 0x00, 0x00, 0x00],
            vec![0x00, 0x00, 0x00, 0xFF],
        ]
    );
    assert!(reports.iter().all(|r| r.device == host && r.report_id == 0));
    assert_eq!(adapter.profile().disconnects(), vec![host]);

    stop_tx.send(()).unwrap();
    server.await.unwrap().unwrap();
}

#[tokio::test]
async fn malformed_line_gets_invalid_argument() {
    use interprocess::local_socket::tokio::{prelude::*, Stream};
    use interprocess::local_socket::{GenericNamespaced, ToNsName};
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

    let adapter = Arc::new(LoopbackAdapter::new(true));
    let name = socket_name("malformed");
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let server = tokio::spawn({
        let name = name.clone();
        let dispatcher = dispatcher_with(adapter, true);
        async move {
            serve(&name, dispatcher, async move {
                let _ = stop_rx.await;
            })
            .await
        }
    });

    // Make sure the listener is up before dialling by hand.
    drop(
        RpcClient::wait_for_server(&name, Duration::from_secs(5))
            .await
            .unwrap(),
    );

    let stream = Stream::connect(name.as_str().to_ns_name::<GenericNamespaced>().unwrap())
        .await
        .unwrap();
    let mut writer = &stream;
    writer.write_all(b"not json\n").await.unwrap();

    let mut reader = BufReader::new(&stream);
    let mut line = String::new();
    reader.read_line(&mut line).await.unwrap();
    let response: RpcResponse = serde_json::from_str(&line).unwrap();
    assert!(matches!(
        response,
        RpcResponse::Error {
            code: ErrorCode::InvalidArgument,
            ..
        }
    ));

    stop_tx.send(()).unwrap();
    server.await.unwrap().unwrap();
}

#[tokio::test]
async fn adapter_turned_on_after_failed_start() {
    let adapter = Arc::new(LoopbackAdapter::new(false));
    let dispatcher = dispatcher_with(adapter.clone(), true);

    let response = dispatcher
        .dispatch(RpcRequest::new(methods::START_HID_SERVICE, Value::Null))
        .await;
    assert_eq!(
        response,
        RpcResponse::Error {
            code: ErrorCode::BluetoothDisabled,
            message: "Please enable Bluetooth".to_string(),
        }
    );
    assert_eq!(dispatcher.service().state(), ServiceState::Stopped);

    adapter.set_enabled(true);
    let response = dispatcher
        .dispatch(RpcRequest::new(methods::START_HID_SERVICE, Value::Null))
        .await;
    assert_eq!(response, RpcResponse::Success(json!(true)));
}

#[tokio::test]
async fn registered_record_carries_mouse_descriptor() {
    let adapter = Arc::new(LoopbackAdapter::new(true));
    let dispatcher = dispatcher_with(adapter.clone(), true);

    dispatcher
        .dispatch(RpcRequest::new(methods::START_HID_SERVICE, Value::Null))
        .await;

    let record = adapter.profile().registered_record().unwrap();
    assert_eq!(record.descriptor.as_bytes(), &MOUSE_REPORT_DESCRIPTOR[..]);
    assert_eq!(record.descriptor, descriptor());
    assert_eq!(record.sdp.subclass, 0xC0);
}

#[tokio::test]
async fn denied_permissions_leave_service_stopped() {
    let adapter = Arc::new(LoopbackAdapter::new(true));
    let dispatcher = dispatcher_with(adapter.clone(), false);

    let response = dispatcher
        .dispatch(RpcRequest::new(methods::START_HID_SERVICE, Value::Null))
        .await;

    assert_eq!(
        response,
        RpcResponse::Error {
            code: ErrorCode::PermissionDenied,
            message: "Bluetooth permissions required".to_string(),
        }
    );
    assert!(!adapter.profile().is_open());
    assert!(!dispatcher.service().is_running());
}

#[tokio::test]
async fn profile_loss_then_restart() {
    let adapter = Arc::new(LoopbackAdapter::new(true));
    let dispatcher = dispatcher_with(adapter.clone(), true);
    let start = || RpcRequest::new(methods::START_HID_SERVICE, Value::Null);
    let running = || RpcRequest::new(methods::IS_HID_SERVICE_RUNNING, Value::Null);

    dispatcher.dispatch(start()).await;
    adapter.profile().lose_profile();
    assert_eq!(
        dispatcher.dispatch(running()).await,
        RpcResponse::Success(json!(false))
    );

    dispatcher.dispatch(start()).await;
    assert_eq!(
        dispatcher.dispatch(running()).await,
        RpcResponse::Success(json!(true))
    );
    assert_eq!(adapter.profile().registrations(), 2);
}
