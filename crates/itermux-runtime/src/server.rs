//! Stdio JSON-RPC server: minimal hand-rolled implementation.
//! Newline-delimited JSON, one request handled end to end at a time.

use serde_json::{Value, json};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use itermux_bridge::AutomationBridge;

use crate::catalog::catalog;
use crate::tools::ToolDispatcher;

const PROTOCOL_VERSION: &str = "2024-11-05";
const SERVER_NAME: &str = "itermux";

const PARSE_ERROR: i64 = -32700;
const INVALID_REQUEST: i64 = -32600;
const INVALID_PARAMS: i64 = -32602;
const METHOD_NOT_FOUND: i64 = -32601;

/// Serve tools on stdin/stdout until EOF.
pub async fn serve_stdio<B: AutomationBridge>(dispatcher: &mut ToolDispatcher<B>) -> anyhow::Result<()> {
    tracing::info!("itermux serving on stdio");
    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();
    serve(stdin, stdout, dispatcher).await
}

pub async fn serve<R, W, B>(
    mut reader: R,
    mut writer: W,
    dispatcher: &mut ToolDispatcher<B>,
) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
    B: AutomationBridge,
{
    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            tracing::info!("stdin closed, shutting down");
            break;
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let Some(response) = handle_line(trimmed, dispatcher).await else {
            continue;
        };
        let mut resp = serde_json::to_string(&response)?;
        resp.push('\n');
        writer.write_all(resp.as_bytes()).await?;
        writer.flush().await?;
    }
    Ok(())
}

/// Handle one request line. Notifications (no `id`) get no response.
pub async fn handle_line<B: AutomationBridge>(
    line: &str,
    dispatcher: &mut ToolDispatcher<B>,
) -> Option<Value> {
    let request: Value = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(e) => {
            tracing::debug!("unparseable request: {e}");
            return Some(error_response(Value::Null, PARSE_ERROR, "parse error"));
        }
    };
    if !request.is_object() {
        return Some(error_response(Value::Null, INVALID_REQUEST, "invalid request"));
    }
    let method = request["method"].as_str().unwrap_or("");
    let Some(id) = request.get("id").cloned() else {
        tracing::debug!(method, "notification");
        return None;
    };

    let result = match method {
        "initialize" => json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {"tools": {}},
            "serverInfo": {"name": SERVER_NAME, "version": env!("CARGO_PKG_VERSION")},
        }),
        "ping" => json!({}),
        "tools/list" => json!({"tools": catalog()}),
        "tools/call" => {
            let params = &request["params"];
            let Some(name) = params["name"].as_str() else {
                return Some(error_response(id, INVALID_PARAMS, "missing tool name"));
            };
            let arguments = params.get("arguments").cloned().unwrap_or(Value::Null);
            dispatcher.call(name, arguments).await.to_json()
        }
        _ => return Some(error_response(id, METHOD_NOT_FOUND, "method not found")),
    };

    Some(json!({
        "jsonrpc": "2.0",
        "result": result,
        "id": id,
    }))
}

fn error_response(id: Value, code: i64, message: &str) -> Value {
    json!({
        "jsonrpc": "2.0",
        "error": {"code": code, "message": message},
        "id": id,
    })
}
