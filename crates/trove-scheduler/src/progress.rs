use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};

use tokio::sync::broadcast;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgressId(pub u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    Begin {
        id: ProgressId,
        title: String,
    },
    Report {
        id: ProgressId,
        message: Option<String>,
        percentage: Option<u32>,
    },
    End {
        id: ProgressId,
        message: Option<String>,
    },
}

pub type ProgressReceiver = broadcast::Receiver<ProgressEvent>;

/// Fan-out of progress events for long-running jobs such as downloads.
///
/// Events sent while nobody is subscribed are dropped.
#[derive(Clone)]
pub struct ProgressSender {
    tx: broadcast::Sender<ProgressEvent>,
    next_id: Arc<AtomicU64>,
}

impl ProgressSender {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn subscribe(&self) -> ProgressReceiver {
        self.tx.subscribe()
    }

    pub fn start(&self, title: impl Into<String>) -> Progress {
        let id = ProgressId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let _ = self.tx.send(ProgressEvent::Begin {
            id,
            title: title.into(),
        });
        Progress {
            inner: Arc::new(ProgressInner {
                id,
                tx: self.tx.clone(),
                finished: AtomicBool::new(false),
            }),
        }
    }
}

impl Default for ProgressSender {
    fn default() -> Self {
        Self::new(64)
    }
}

/// Handle for one unit of reported work; sends `End` once, at the latest when
/// the last clone is dropped.
#[derive(Clone)]
pub struct Progress {
    inner: Arc<ProgressInner>,
}

struct ProgressInner {
    id: ProgressId,
    tx: broadcast::Sender<ProgressEvent>,
    finished: AtomicBool,
}

impl ProgressInner {
    fn finish(&self, message: Option<String>) {
        if self
            .finished
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            let _ = self.tx.send(ProgressEvent::End {
                id: self.id,
                message,
            });
        }
    }
}

impl Drop for ProgressInner {
    fn drop(&mut self) {
        self.finish(None);
    }
}

impl Progress {
    pub fn id(&self) -> ProgressId {
        self.inner.id
    }

    pub fn report(&self, message: impl Into<Option<String>>, percentage: Option<u32>) {
        let _ = self.inner.tx.send(ProgressEvent::Report {
            id: self.inner.id,
            message: message.into(),
            percentage: percentage.map(|p| p.min(100)),
        });
    }

    pub fn finish(&self, message: impl Into<Option<String>>) {
        self.inner.finish(message.into());
    }
}
