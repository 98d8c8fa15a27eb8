//! SessionWriter - write-through coordinator for session persistence
//!
//! Callers hand over a full snapshot and return immediately. Each session
//! id gets its own FIFO queue drained by one worker task, so writes for a
//! session land in the order they were issued even when the backend is
//! slow. Writes for different sessions run independently.
//!
//! Failures are logged and dropped; in-memory state stays authoritative.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use super::SessionBackend;
use crate::combat::CombatSession;

enum WriteOp {
    Save(Box<CombatSession>),
    Delete,
    Flush(oneshot::Sender<()>),
}

type Queues = HashMap<String, mpsc::UnboundedSender<WriteOp>>;

/// Per-session serialized write queues over a backend
#[derive(Clone)]
pub struct SessionWriter {
    backend: Arc<dyn SessionBackend>,
    queues: Arc<Mutex<Queues>>,
    /// Completion signals of queues closed by a delete but not yet drained
    closing: Arc<Mutex<Vec<oneshot::Receiver<()>>>>,
}

impl SessionWriter {
    /// Create a writer. Queues spawn tokio tasks, so enqueue from inside a runtime.
    pub fn new(backend: Arc<dyn SessionBackend>) -> Self {
        Self {
            backend,
            queues: Arc::new(Mutex::new(HashMap::new())),
            closing: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Get the backend
    pub fn backend(&self) -> Arc<dyn SessionBackend> {
        self.backend.clone()
    }

    /// Queue a full snapshot of the session for writing
    pub fn save(&self, session: &CombatSession) {
        self.enqueue(&session.id, WriteOp::Save(Box::new(session.clone())));
    }

    /// Queue deletion of a session, after any saves already queued for it
    pub fn delete(&self, session_id: &str) {
        let (done_tx, done_rx) = oneshot::channel();
        self.enqueue(session_id, WriteOp::Delete);
        self.enqueue(session_id, WriteOp::Flush(done_tx));

        {
            let mut closing = self.closing.lock();
            // Drop signals for queues that already drained
            closing.retain_mut(|rx| {
                matches!(rx.try_recv(), Err(oneshot::error::TryRecvError::Empty))
            });
            closing.push(done_rx);
        }

        // The worker finishes what is queued and exits once the sender is gone
        self.queues.lock().remove(session_id);
    }

    /// Wait until everything queued so far has been written, deletes included
    pub async fn flush(&self) {
        let closing = std::mem::take(&mut *self.closing.lock());
        let senders: Vec<_> = self.queues.lock().values().cloned().collect();

        let mut waits = Vec::with_capacity(senders.len());
        for sender in senders {
            let (tx, rx) = oneshot::channel();
            if sender.send(WriteOp::Flush(tx)).is_ok() {
                waits.push(rx);
            }
        }

        for wait in closing.into_iter().chain(waits) {
            let _ = wait.await;
        }
    }

    /// Number of sessions with a live queue
    pub fn queue_count(&self) -> usize {
        self.queues.lock().len()
    }

    fn enqueue(&self, session_id: &str, op: WriteOp) {
        let mut queues = self.queues.lock();

        let op = match queues.get(session_id) {
            Some(sender) => match sender.send(op) {
                Ok(()) => return,
                Err(mpsc::error::SendError(op)) => op,
            },
            None => op,
        };

        let (tx, rx) = mpsc::unbounded_channel();
        // A fresh channel's receiver is alive, so this cannot fail
        let _ = tx.send(op);
        queues.insert(session_id.to_string(), tx);

        debug!("Starting write queue for session {}", session_id);
        tokio::spawn(run_queue(session_id.to_string(), self.backend.clone(), rx));
    }
}

async fn run_queue(
    session_id: String,
    backend: Arc<dyn SessionBackend>,
    mut rx: mpsc::UnboundedReceiver<WriteOp>,
) {
    let mut pending: Option<WriteOp> = None;

    loop {
        let op = match pending.take() {
            Some(op) => op,
            None => match rx.recv().await {
                Some(op) => op,
                None => break,
            },
        };

        match op {
            WriteOp::Save(mut session) => {
                // Only the newest of several queued snapshots needs to land
                while let Ok(next) = rx.try_recv() {
                    match next {
                        WriteOp::Save(newer) => session = newer,
                        other => {
                            pending = Some(other);
                            break;
                        }
                    }
                }

                if let Err(e) = backend.save_session(&session).await {
                    warn!("Failed to save session {}: {}", session_id, e);
                }
            }
            WriteOp::Delete => {
                if let Err(e) = backend.delete_session(&session_id).await {
                    warn!("Failed to delete session {}: {}", session_id, e);
                }
            }
            WriteOp::Flush(done) => {
                let _ = done.send(());
            }
        }
    }

    debug!("Write queue for session {} closed", session_id);
}
