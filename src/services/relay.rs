//! Per-request stream relay.
//!
//! Forwards model fragments to the client as `chunk` events while buffering
//! them, and parses only the complete buffer once the model is done. Exactly
//! one terminal event (`final` or `error`) is sent per relay; `finish` and
//! `fail` consume the relay, so the sender is dropped and the channel closed
//! exactly once.

use std::time::Duration;

use futures::StreamExt;
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::AnalysisError;
use crate::llm::{LlmError, TextStream};
use crate::models::{AnalysisResult, StreamEvent};

/// Relay lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    /// No fragment received yet.
    Idle,
    /// Forwarding fragments.
    Streaming,
    /// Model done; parsing the buffer.
    Finalizing,
    Completed,
    Failed,
}

/// How a relayed request ended.
#[derive(Debug)]
pub enum RelayOutcome {
    /// `final` was sent; the parsed result is ready for history.
    Completed(AnalysisResult),
    /// `error` was sent.
    Failed(AnalysisError),
    /// The client went away; nothing more was sent.
    Disconnected,
}

/// The client's receiver was dropped.
#[derive(Debug, Clone, Copy)]
pub struct Disconnected;

pub struct StreamRelay {
    state: RelayState,
    buffer: String,
    chunks: usize,
    tx: mpsc::Sender<StreamEvent>,
}

impl StreamRelay {
    pub fn new(tx: mpsc::Sender<StreamEvent>) -> Self {
        Self {
            state: RelayState::Idle,
            buffer: String::new(),
            chunks: 0,
            tx,
        }
    }

    pub fn state(&self) -> RelayState {
        self.state
    }

    /// Number of `chunk` events sent so far.
    pub fn chunks_sent(&self) -> usize {
        self.chunks
    }

    /// Buffer one fragment and forward it unchanged.
    pub async fn forward(&mut self, text: String) -> Result<(), Disconnected> {
        if text.is_empty() {
            return Ok(());
        }
        if self.state == RelayState::Idle {
            debug!("First fragment received; streaming");
            self.state = RelayState::Streaming;
        }

        self.buffer.push_str(&text);
        self.chunks += 1;
        self.tx
            .send(StreamEvent::Chunk { text })
            .await
            .map_err(|_| Disconnected)
    }

    /// Parse the accumulated buffer and send the terminal event.
    pub async fn finish(mut self) -> RelayOutcome {
        self.state = RelayState::Finalizing;
        debug!(
            "Finalizing after {} chunks ({} chars)",
            self.chunks,
            self.buffer.len()
        );

        match AnalysisResult::parse(&self.buffer) {
            Ok(result) => {
                self.state = RelayState::Completed;
                if self.tx.send(StreamEvent::Final {}).await.is_err() {
                    return RelayOutcome::Disconnected;
                }
                RelayOutcome::Completed(result)
            }
            Err(err) => self.fail(err).await,
        }
    }

    /// Send the terminal `error` event.
    pub async fn fail(mut self, err: AnalysisError) -> RelayOutcome {
        self.state = RelayState::Failed;
        if self
            .tx
            .send(StreamEvent::error(err.client_message()))
            .await
            .is_err()
        {
            return RelayOutcome::Disconnected;
        }
        RelayOutcome::Failed(err)
    }

    /// Drive a model stream to completion.
    ///
    /// `idle_timeout` bounds the wait for each fragment.
    pub async fn run(mut self, mut stream: TextStream, idle_timeout: Duration) -> RelayOutcome {
        loop {
            match tokio::time::timeout(idle_timeout, stream.next()).await {
                Ok(Some(Ok(text))) => {
                    if self.forward(text).await.is_err() {
                        return RelayOutcome::Disconnected;
                    }
                }
                Ok(Some(Err(e))) => return self.fail(e.into()).await,
                Ok(None) => break,
                Err(_) => return self.fail(LlmError::IdleTimeout(idle_timeout).into()).await,
            }
        }
        drop(stream);
        self.finish().await
    }
}
