//! The observable cell holding the latest snapshot.
//!
//! One writer (the owning session), many readers. `get` returns the current
//! value synchronously; `subscribe` returns a channel that receives every
//! subsequent publish. Disconnected subscribers are pruned on the next
//! publish, like dead clients in a broadcast list.

use crate::types::Snapshot;
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub struct SnapshotCell {
    inner: Arc<CellInner>,
}

struct CellInner {
    current: Mutex<Snapshot>,
    subscribers: Mutex<Vec<Sender<Snapshot>>>,
}

impl SnapshotCell {
    pub fn new(initial: Snapshot) -> Self {
        Self {
            inner: Arc::new(CellInner {
                current: Mutex::new(initial),
                subscribers: Mutex::new(Vec::new()),
            }),
        }
    }

    /// The latest published snapshot.
    pub fn get(&self) -> Snapshot {
        self.inner.current.lock().unwrap().clone()
    }

    /// Receive every snapshot published after this call.
    pub fn subscribe(&self) -> Receiver<Snapshot> {
        let (tx, rx) = unbounded();
        self.inner.subscribers.lock().unwrap().push(tx);
        rx
    }

    /// Replace the current value and fan out to subscribers.
    /// Called only by the owning session's refresh path.
    pub(crate) fn publish(&self, snapshot: Snapshot) {
        *self.inner.current.lock().unwrap() = snapshot.clone();
        let mut subs = self.inner.subscribers.lock().unwrap();
        subs.retain(|tx| tx.send(snapshot.clone()).is_ok());
    }
}
