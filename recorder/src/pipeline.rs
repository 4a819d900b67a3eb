//! Asynchronous hand-off between a session and its sink.
//!
//! Frames must reach storage in the order they were assembled, so the queue
//! has exactly one producer and one consumer. The consumer is a blocking
//! task because sinks do synchronous file I/O.

use blerec_reassembly::LossEvent;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::batch::FrameBatch;
use crate::error::RecorderError;
use crate::sink::FrameSink;

#[derive(Debug)]
enum SinkMessage {
    Batch(FrameBatch),
    Loss(LossEvent),
}

/// Producer end of the queue. Implements [`FrameSink`], so a
/// [`RecordingSession`](crate::RecordingSession) can drive it unchanged.
///
/// Sends block while the queue is full. Use it from a thread that may block
/// (the transport callback thread, or [`tokio::task::spawn_blocking`]), not
/// from async code.
#[derive(Debug)]
pub struct BatchSender {
    tx: Option<mpsc::Sender<SinkMessage>>,
}

impl BatchSender {
    fn send(&mut self, msg: SinkMessage) -> Result<(), RecorderError> {
        let tx = self.tx.as_ref().ok_or(RecorderError::SinkClosed)?;
        // Fails only when the consumer stopped, which it does after a sink
        // error. The error itself is reported by `SinkHandle::join`.
        tx.blocking_send(msg).map_err(|_| RecorderError::SinkClosed)
    }
}

impl FrameSink for BatchSender {
    fn write_batch(&mut self, batch: FrameBatch) -> Result<(), RecorderError> {
        self.send(SinkMessage::Batch(batch))
    }

    fn on_loss(&mut self, loss: &LossEvent) -> Result<(), RecorderError> {
        self.send(SinkMessage::Loss(*loss))
    }

    fn close(&mut self) -> Result<(), RecorderError> {
        self.tx = None;
        Ok(())
    }
}

/// Consumer end: owns the task that drives the sink.
pub struct SinkHandle<S> {
    sender: Option<BatchSender>,
    task: JoinHandle<Result<S, RecorderError>>,
}

impl<S> SinkHandle<S> {
    /// Takes the producer end. There is only one; later calls return `None`.
    pub fn sender(&mut self) -> Option<BatchSender> {
        self.sender.take()
    }

    /// Waits for the queue to drain and the sink to close, then returns the
    /// sink, or the first error it reported.
    ///
    /// The queue ends when the sender is closed or dropped.
    pub async fn join(mut self) -> Result<S, RecorderError> {
        drop(self.sender.take());
        self.task
            .await
            .map_err(|e| RecorderError::TaskFailed(e.to_string()))?
    }
}

/// Starts a blocking task that feeds `sink` from a queue of `capacity`
/// batches. Must be called within a tokio runtime.
pub fn spawn_sink<S>(sink: S, capacity: usize) -> SinkHandle<S>
where
    S: FrameSink + Send + 'static,
{
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let task = tokio::task::spawn_blocking(move || drain(sink, rx));
    SinkHandle {
        sender: Some(BatchSender { tx: Some(tx) }),
        task,
    }
}

fn drain<S: FrameSink>(mut sink: S, mut rx: mpsc::Receiver<SinkMessage>) -> Result<S, RecorderError> {
    while let Some(msg) = rx.blocking_recv() {
        let result = match msg {
            SinkMessage::Batch(batch) => {
                debug!("sink task writing batch {}", batch.seq);
                sink.write_batch(batch)
            }
            SinkMessage::Loss(loss) => sink.on_loss(&loss),
        };
        if let Err(e) = result {
            warn!("sink task stopped: {}", e);
            return Err(e);
        }
    }
    sink.close()?;
    Ok(sink)
}
