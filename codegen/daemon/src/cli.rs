//! One-shot `ask` command
//!
//! Streams answer fragments to stdout as they arrive; errors go to stderr
//! and turn into exit code 1.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::debug;

use codegen_core::{AggregateEvent, AggregationResult, CallerKind, ChatFlow, ChatFlowError, ChatRequest};

const EVENT_BUFFER: usize = 64;

/// Run the chat flow once for `query` and print the answer
pub async fn run_ask(
    flow: ChatFlow,
    query: &str,
    image_file_path: Option<PathBuf>,
) -> anyhow::Result<ExitCode> {
    let request = match ChatRequest::new(query, image_file_path).await {
        Ok(request) => request,
        Err(e) => {
            eprintln!("Error: {e}");
            return Ok(ExitCode::FAILURE);
        }
    };

    let (tx, rx) = mpsc::channel(EVENT_BUFFER);
    let printer = tokio::spawn(print_fragments(rx, tokio::io::stdout()));

    let outcome = flow.ask_streaming(&request, CallerKind::Cli, tx).await;

    printer
        .await
        .context("Answer printer task failed")?
        .context("Failed to write answer to stdout")?;

    Ok(report(&outcome))
}

/// Write fragments as they arrive, then a trailing newline
async fn print_fragments<W>(mut events: mpsc::Receiver<AggregateEvent>, mut out: W) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut fragments: usize = 0;
    while let Some(event) = events.recv().await {
        if let AggregateEvent::Fragment(text) = event {
            out.write_all(text.as_bytes()).await?;
            out.flush().await?;
            fragments += 1;
        }
    }

    out.write_all(b"\n").await?;
    out.flush().await?;
    debug!(fragments = fragments, "Answer printed");
    Ok(())
}

/// Print the failure, if any, and pick the exit code
fn report(outcome: &Result<AggregationResult, ChatFlowError>) -> ExitCode {
    match outcome {
        Ok(result) if result.is_error => {
            eprintln!("Error: {}", result.text);
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
        Err(ChatFlowError::Upload(e)) => {
            eprintln!("Upload failed: {}", e.client_message());
            ExitCode::FAILURE
        }
        Err(ChatFlowError::Chat(e)) => {
            eprintln!("Error: {}", e.client_message());
            ExitCode::FAILURE
        }
    }
}
