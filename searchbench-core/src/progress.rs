use futures::Stream;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::Result;
use crate::suite::{QueryOutcome, SuiteSummary};

/// One event of a suite run, framed as a single NDJSON line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SuiteEvent {
    /// Emitted before query `current` (1-based) starts
    Progress {
        current: usize,
        total: usize,
        query: String,
    },
    /// Outcome of the query at `index` (0-based)
    #[serde(rename = "result")]
    QueryResult { index: usize, result: QueryOutcome },
    /// Every query has finished
    Complete {
        results: Vec<QueryOutcome>,
        summary: SuiteSummary,
    },
    /// The suite could not continue
    #[serde(rename = "error")]
    Failed { message: String },
}

impl SuiteEvent {
    /// Whether no further events follow this one
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete { .. } | Self::Failed { .. })
    }

    /// One NDJSON frame: the event as a JSON object plus a trailing newline
    pub fn to_frame(&self) -> Result<String> {
        let mut frame = serde_json::to_string(self)?;
        frame.push('\n');
        Ok(frame)
    }
}

/// Create a bounded progress channel
pub fn channel(capacity: usize) -> (ProgressSender, ProgressReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (ProgressSender { tx }, ProgressReceiver { rx })
}

#[derive(Debug, Clone)]
pub struct ProgressSender {
    tx: mpsc::Sender<SuiteEvent>,
}

impl ProgressSender {
    /// Send an event, waiting for channel capacity.
    ///
    /// A departed consumer does not stop the run; the event is dropped.
    pub async fn emit(&self, event: SuiteEvent) {
        if let Err(mpsc::error::SendError(event)) = self.tx.send(event).await {
            debug!(?event, "progress consumer gone, dropping event");
        }
    }
}

#[derive(Debug)]
pub struct ProgressReceiver {
    rx: mpsc::Receiver<SuiteEvent>,
}

impl ProgressReceiver {
    /// Events in emission order; ends once every sender is dropped
    pub fn into_stream(self) -> impl Stream<Item = SuiteEvent> {
        futures::stream::unfold(self.rx, |mut rx| async move {
            rx.recv().await.map(|event| (event, rx))
        })
    }
}

/// Writes events as flushed NDJSON frames
pub struct FrameWriter<W> {
    inner: W,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub async fn write(&mut self, event: &SuiteEvent) -> Result<()> {
        let frame = event.to_frame()?;
        self.inner.write_all(frame.as_bytes()).await?;
        self.inner.flush().await?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}
