use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::registry::ConnectionId;

/// Outbound half of one admitted client: an unbounded frame queue drained by
/// a dedicated writer task that owns the socket's write half.
///
/// Queueing never blocks, so a slow or broken recipient degrades only its own
/// delivery and can never stall fan-out to the other subscribers.
pub struct ConnectionHandle {
    id: ConnectionId,
    tx: mpsc::UnboundedSender<String>,
    writer_task: JoinHandle<()>,
}

impl ConnectionHandle {
    pub fn spawn(id: ConnectionId, mut writer: OwnedWriteHalf) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        let writer_task = tokio::spawn(async move {
            while let Some(frame) = rx.recv().await {
                if let Err(e) = writer.write_all(frame.as_bytes()).await {
                    tracing::warn!("Write to client {} failed: {}", id, e);
                    break;
                }
            }
            // Dropping the write half sends FIN once the queue is drained.
        });
        Self { id, tx, writer_task }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Queue one already-encoded frame. A handle whose writer has died
    /// silently drops the frame; its read side will observe the close and
    /// run disconnect cleanup.
    pub fn push(&self, frame: String) {
        let _ = self.tx.send(frame);
    }

    /// Immediate teardown for server shutdown: pending frames are abandoned.
    pub fn close(&self) {
        self.writer_task.abort();
    }
}
