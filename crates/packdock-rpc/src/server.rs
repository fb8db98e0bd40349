//! Line-delimited JSON-RPC server over stdin/stdout.
//!
//! One request per line, one terminal response per line, with `event`
//! notifications streamed in between. Logs go to stderr so the protocol
//! stream on stdout stays clean.

use std::io::Write;

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::methods::{BackendFactory, Handler};
use crate::protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};

pub struct Server {
    handler: Handler,
}

impl Server {
    pub fn new(backend: BackendFactory) -> Self {
        Self {
            handler: Handler::new(backend),
        }
    }

    /// Serve until stdin closes.
    pub async fn run(&self) -> std::io::Result<()> {
        let stdin = tokio::io::stdin();
        let mut lines = BufReader::new(stdin).lines();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            let mut out = std::io::stdout();
            self.handle_line(&line, &mut out).await?;
        }

        tracing::info!("stdin closed; shutting down");
        Ok(())
    }

    /// Process one request line, writing notifications and the terminal
    /// response to `out`.
    pub async fn handle_line(
        &self,
        line: &str,
        out: &mut (dyn Write + Send),
    ) -> std::io::Result<()> {
        let request: JsonRpcRequest = match serde_json::from_str(line) {
            Ok(request) => request,
            Err(e) => {
                return write_response(
                    out,
                    &JsonRpcResponse::failure(Value::Null, JsonRpcError::parse_error(e.to_string())),
                );
            }
        };

        if request.jsonrpc != "2.0" {
            return write_response(
                out,
                &JsonRpcResponse::failure(
                    request.id.unwrap_or(Value::Null),
                    JsonRpcError::invalid_request("jsonrpc must be \"2.0\""),
                ),
            );
        }

        let id = request.id.unwrap_or(Value::Null);
        tracing::debug!(method = %request.method, "dispatching request");

        let response = match self
            .handler
            .dispatch(&request.method, request.params, out)
            .await
        {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(error) => JsonRpcResponse::failure(id, error),
        };
        write_response(out, &response)
    }
}

fn write_response(out: &mut (dyn Write + Send), response: &JsonRpcResponse) -> std::io::Result<()> {
    let line = serde_json::to_string(response)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    writeln!(out, "{line}")?;
    out.flush()
}
