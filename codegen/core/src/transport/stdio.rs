//! Pipe transport
//!
//! One JSON-RPC message per line in, one response per line out. The read
//! loop awaits each response before reading the next line, so requests are
//! handled strictly in arrival order.

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

use super::TransportError;
use crate::protocol::jsonrpc::PARSE_ERROR;
use crate::protocol::{JsonRpcError, JsonRpcResponse, McpServer};

/// Serve `server` over a line-delimited byte pipe until end of input
///
/// A line that is not valid UTF-8 is answered with a parse error and the
/// loop moves on to the next line.
///
/// # Errors
///
/// Returns [`TransportError::IoError`] if reading or writing the pipe fails.
pub async fn serve<R, W>(server: &McpServer, reader: R, mut writer: W) -> Result<(), TransportError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    let mut handled: u64 = 0;

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }

        let response = match std::str::from_utf8(&buf) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                handled += 1;
                server.handle_message(line).await
            }
            Err(e) => {
                handled += 1;
                warn!(error = %e, "Input line is not valid UTF-8");
                Some(JsonRpcResponse::failure(
                    Value::Null,
                    JsonRpcError::new(PARSE_ERROR, "Parse error"),
                ))
            }
        };

        let Some(response) = response else {
            continue;
        };

        let mut frame = serde_json::to_vec(&response)?;
        frame.push(b'\n');
        writer.write_all(&frame).await?;
        writer.flush().await?;
        debug!(bytes = frame.len(), "Response written");
    }

    info!(messages = handled, "Input closed, pipe transport stopping");
    Ok(())
}

/// Serve `server` over the process's stdin/stdout
///
/// # Errors
///
/// See [`serve`].
pub async fn serve_stdio(server: &McpServer) -> Result<(), TransportError> {
    info!("Pipe transport listening on stdin");
    serve(server, tokio::io::stdin(), tokio::io::stdout()).await
}
