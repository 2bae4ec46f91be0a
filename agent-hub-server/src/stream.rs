//! Simulated token streaming.
//!
//! The upstream reply is fetched in one call, split on whitespace and replayed
//! as `chat.completion.chunk` frames with a small delay between them.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use agent_hub_shared::{ChatMessage, StreamChunk, StreamError, DONE_SENTINEL};
use futures_util::{stream, Stream};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::completion::COMPLETION_ID;
use crate::llm::ChatModel;

pub const STREAM_PACE: Duration = Duration::from_millis(10);

/// Whitespace-delimited fragments, each followed by one space.
pub fn fragments(text: &str) -> Vec<String> {
    text.split_whitespace().map(|word| format!("{word} ")).collect()
}

/// Starts the producer task and returns the body stream it feeds.
///
/// The channel holds a single frame, so the producer only computes the next
/// frame once the previous one has been taken by the transport. Dropping the
/// returned stream stops the producer at its next send.
pub fn spawn_stream(
    messages: Vec<ChatMessage>,
    model: Arc<dyn ChatModel>,
    label: String,
    pace: Duration,
) -> impl Stream<Item = Result<String, Infallible>> {
    let (tx, rx) = mpsc::channel::<String>(1);

    tokio::spawn(produce(messages, model, label, pace, tx));

    stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|line| (Ok(line), rx))
    })
}

/// Runs one simulated stream. Returns the number of frames handed to the channel.
async fn produce(
    messages: Vec<ChatMessage>,
    model: Arc<dyn ChatModel>,
    label: String,
    pace: Duration,
    tx: mpsc::Sender<String>,
) -> usize {
    let result = tokio::select! {
        result = model.invoke(&messages) => result,
        _ = tx.closed() => {
            debug!("Client disconnected before upstream replied");
            return 0;
        }
    };

    let text = match result {
        Ok(text) => text,
        Err(e) => {
            error!("Streaming completion failed: {}", e);
            return usize::from(send(&tx, &StreamError::new(e.to_string())).await);
        }
    };

    let pieces = fragments(&text);
    info!("Streaming {} fragments as {}", pieces.len(), label);

    let mut sent = 0;
    for piece in pieces {
        if !send(&tx, &StreamChunk::fragment(COMPLETION_ID, &label, piece)).await {
            debug!("Client disconnected after {} frames", sent);
            return sent;
        }
        sent += 1;
        tokio::time::sleep(pace).await;
    }

    if !send(&tx, &StreamChunk::terminal(COMPLETION_ID, &label)).await {
        return sent;
    }
    sent += 1;
    if tx.send(data_line(DONE_SENTINEL)).await.is_ok() {
        sent += 1;
    }
    sent
}

/// Returns false once the receiving side is gone.
async fn send<T: Serialize>(tx: &mpsc::Sender<String>, payload: &T) -> bool {
    match serde_json::to_string(payload) {
        Ok(json) => tx.send(data_line(&json)).await.is_ok(),
        Err(e) => {
            error!("Failed to serialize chunk: {}", e);
            false
        }
    }
}

fn data_line(payload: &str) -> String {
    format!("data: {payload}\n\n")
}
