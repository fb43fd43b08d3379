use crate::rpc::dispatch::Dispatcher;
use crate::rpc::protocol::{ErrorCode, RpcRequest, RpcResponse};
use anyhow::{Context, Result};
use interprocess::local_socket::tokio::{prelude::*, Stream};
use interprocess::local_socket::{GenericNamespaced, ListenerOptions, ToNsName};
use std::future::Future;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, error, info, warn};

/// Accept RPC clients on `socket_name` until `shutdown` resolves.
///
/// Each client gets its own task; requests on one connection are answered in order.
pub async fn serve<F>(socket_name: &str, dispatcher: Arc<Dispatcher>, shutdown: F) -> Result<()>
where
    F: Future<Output = ()>,
{
    let name = socket_name
        .to_ns_name::<GenericNamespaced>()
        .with_context(|| format!("Invalid socket name '{}'", socket_name))?;
    let listener = ListenerOptions::new()
        .name(name)
        .create_tokio()
        .with_context(|| format!("Failed to listen on '{}'", socket_name))?;

    info!("Listening for RPC clients on {}", socket_name);

    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("RPC server shutting down");
                break;
            }
            conn = listener.accept() => match conn {
                Ok(stream) => {
                    debug!("Client connected");
                    let dispatcher = dispatcher.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, dispatcher).await {
                            error!("Connection error: {}", e);
                        }
                    });
                }
                Err(e) => warn!("Accept failed: {}", e),
            }
        }
    }

    Ok(())
}

async fn handle_connection(stream: Stream, dispatcher: Arc<Dispatcher>) -> Result<()> {
    let mut reader = BufReader::new(&stream);
    let mut writer = &stream;
    let mut buffer = String::new();

    loop {
        buffer.clear();
        if reader.read_line(&mut buffer).await? == 0 {
            debug!("Client disconnected");
            break;
        }
        let line = buffer.trim();
        if line.is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<RpcRequest>(line) {
            Ok(request) => dispatcher.dispatch(request).await,
            Err(e) => {
                warn!("Malformed request: {}", e);
                RpcResponse::Error {
                    code: ErrorCode::InvalidArgument,
                    message: format!("Malformed request: {}", e),
                }
            }
        };

        let json = serde_json::to_string(&response)? + "\n";
        writer.write_all(json.as_bytes()).await?;
        writer.flush().await?;
    }
    Ok(())
}
