//! Persistence actor: writes session snapshots to storage off the dispatch
//! path.
//!
//! State transitions never wait for storage. Each change is queued on an
//! unbounded channel and a single task writes them in order, so the last
//! write to land is always the latest state.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use warden_protocol::PersistedSession;
use warden_storage::Storage;

pub(crate) enum PersistCommand {
    /// Replace the stored session.
    Write(PersistedSession),

    /// Reply once every earlier write has been attempted.
    Flush(oneshot::Sender<()>),
}

/// Cheap to clone; the actor stops when every handle is gone.
#[derive(Clone)]
pub(crate) struct PersistHandle {
    sender: mpsc::UnboundedSender<PersistCommand>,
}

impl PersistHandle {
    /// Queues a write. Never blocks.
    pub(crate) fn write(&self, session: PersistedSession) {
        if self.sender.send(PersistCommand::Write(session)).is_err() {
            tracing::warn!("persistence task is gone, session not saved");
        }
    }

    /// Waits until all queued writes have been attempted.
    pub(crate) async fn flush(&self) {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self.sender.send(PersistCommand::Flush(reply_tx)).is_ok() {
            let _ = reply_rx.await;
        }
    }
}

struct PersistActor {
    realm: String,
    storage: Arc<dyn Storage>,
    receiver: mpsc::UnboundedReceiver<PersistCommand>,
}

impl PersistActor {
    async fn run(mut self) {
        tracing::debug!(realm = %self.realm, "persistence task started");

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                PersistCommand::Write(session) => {
                    if let Err(error) = self.storage.persist(&session).await {
                        tracing::warn!(realm = %self.realm, %error, "failed to persist session");
                    }
                }
                PersistCommand::Flush(reply) => {
                    let _ = reply.send(());
                }
            }
        }

        tracing::debug!(realm = %self.realm, "persistence task stopped");
    }
}

pub(crate) fn spawn_persister(realm: String, storage: Arc<dyn Storage>) -> PersistHandle {
    let (tx, rx) = mpsc::unbounded_channel();

    let actor = PersistActor {
        realm,
        storage,
        receiver: rx,
    };
    tokio::spawn(actor.run());

    PersistHandle { sender: tx }
}
