use crate::rpc::protocol::{methods, RpcRequest, RpcResponse};
use anyhow::{Context, Result};
use interprocess::local_socket::tokio::{prelude::*, Stream};
use interprocess::local_socket::{GenericNamespaced, ToNsName};
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info};

pub struct RpcClient {
    stream: Stream,
}

impl RpcClient {
    /// Connect to a running daemon.
    pub async fn connect(socket_name: &str) -> Result<Self> {
        let name = socket_name.to_ns_name::<GenericNamespaced>()?;
        let stream = Stream::connect(name)
            .await
            .with_context(|| format!("No daemon listening on '{}'", socket_name))?;
        info!("Connected to {}", socket_name);
        Ok(Self { stream })
    }

    /// Poll until the daemon accepts a connection or `timeout` passes.
    pub async fn wait_for_server(socket_name: &str, timeout: Duration) -> Result<Self> {
        let start = Instant::now();
        loop {
            match Self::connect(socket_name).await {
                Ok(client) => return Ok(client),
                Err(e) if start.elapsed() >= timeout => return Err(e),
                Err(_) => tokio::time::sleep(Duration::from_millis(20)).await,
            }
        }
    }

    /// Send one request and wait for its response.
    pub async fn call(&mut self, method: &str, args: Value) -> Result<RpcResponse> {
        let request = RpcRequest::new(method, args);
        let json = serde_json::to_string(&request)? + "\n";

        let mut writer = &self.stream;
        writer.write_all(json.as_bytes()).await?;
        writer.flush().await?;

        let mut reader = BufReader::new(&self.stream);
        let mut buffer = String::new();
        if reader.read_line(&mut buffer).await? == 0 {
            anyhow::bail!("Daemon closed the connection");
        }
        debug!("{} -> {}", method, buffer.trim_end());

        let response = serde_json::from_str(&buffer).context("Malformed response")?;
        Ok(response)
    }

    pub async fn is_running(&mut self) -> Result<bool> {
        match self.call(methods::IS_HID_SERVICE_RUNNING, Value::Null).await? {
            RpcResponse::Success(Value::Bool(running)) => Ok(running),
            other => anyhow::bail!("Unexpected response: {:?}", other),
        }
    }

    pub async fn start_service(&mut self) -> Result<()> {
        expect_success(self.call(methods::START_HID_SERVICE, Value::Null).await?)
    }

    pub async fn stop_service(&mut self) -> Result<()> {
        expect_success(self.call(methods::STOP_HID_SERVICE, Value::Null).await?)
    }

    pub async fn send_move(&mut self, dx: i32, dy: i32) -> Result<()> {
        expect_success(
            self.call(methods::SEND_MOUSE_MOVE, json!({ "dx": dx, "dy": dy }))
                .await?,
        )
    }

    pub async fn send_click(&mut self, button: &str) -> Result<()> {
        expect_success(
            self.call(methods::SEND_MOUSE_CLICK, json!({ "type": button }))
                .await?,
        )
    }

    pub async fn send_scroll(&mut self, amount: i32) -> Result<()> {
        expect_success(
            self.call(methods::SEND_SCROLL, json!({ "amount": amount }))
                .await?,
        )
    }
}

fn expect_success(response: RpcResponse) -> Result<()> {
    match response {
        RpcResponse::Success(_) => Ok(()),
        RpcResponse::Error { code, message } => anyhow::bail!("{:?}: {}", code, message),
        RpcResponse::NotImplemented => anyhow::bail!("Method not implemented by daemon"),
    }
}
