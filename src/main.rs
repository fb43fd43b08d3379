use anyhow::{Context, Result};
use bt_hid_mouse::domain::settings::{Settings, SettingsService};
use bt_hid_mouse::infrastructure::bluetooth::loopback::LoopbackAdapter;
use bt_hid_mouse::infrastructure::bluetooth::{BluetoothAdapter, HidService, ServiceConfig};
use bt_hid_mouse::infrastructure::logging::init_logger;
use bt_hid_mouse::infrastructure::permissions::{PermissionBroker, StaticPermissions};
use bt_hid_mouse::rpc::{serve, Dispatcher, RpcClient};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, warn};

const USAGE: &str = "usage: bt_hid_mouse [call <method> [json-args]]";

#[tokio::main]
async fn main() -> Result<()> {
    let settings_service = SettingsService::new()?;
    let settings = settings_service.get().clone();
    let _log_guard = init_logger(&settings.log_settings)?;
    info!("Settings loaded from {}", settings_service.path().display());

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        None => run_daemon(settings).await,
        Some("call") => {
            let method = args.get(1).context(USAGE)?;
            let call_args = match args.get(2) {
                Some(raw) => serde_json::from_str(raw)
                    .with_context(|| format!("Arguments are not valid JSON: {}", raw))?,
                None => Value::Null,
            };
            run_call(&settings.socket_name, method, call_args).await
        }
        Some(other) => anyhow::bail!("Unknown command '{}'\n{}", other, USAGE),
    }
}

async fn run_daemon(settings: Settings) -> Result<()> {
    info!("Starting Bluetooth HID mouse daemon");

    let adapter = LoopbackAdapter::from_settings(&settings.loopback)
        .map(|adapter| adapter as Arc<dyn BluetoothAdapter>);
    if adapter.is_none() {
        warn!("No Bluetooth adapter available");
    }

    let service = HidService::new(adapter, ServiceConfig::from(&settings));
    let permissions = PermissionBroker::new(Arc::new(StaticPermissions::new(
        settings.permissions_granted,
    )));
    let dispatcher = Arc::new(Dispatcher::new(service.clone(), permissions));

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to wait for Ctrl-C: {}", e);
        }
    };
    serve(&settings.socket_name, dispatcher, shutdown).await?;

    service.stop();
    info!("Daemon exited");
    Ok(())
}

async fn run_call(socket_name: &str, method: &str, args: Value) -> Result<()> {
    let mut client = RpcClient::connect(socket_name).await?;
    let response = client.call(method, args).await?;
    println!("{}", serde_json::to_string(&response)?);
    Ok(())
}
