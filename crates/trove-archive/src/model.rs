use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-unique identity of one acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModelId(u64);

impl ModelId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// A model on loan from an archive. Hand it back with `release_model`.
#[derive(Debug)]
pub struct AcquiredModel<M> {
    id: ModelId,
    key: String,
    model: M,
}

impl<M> AcquiredModel<M> {
    pub(crate) fn new(id: ModelId, key: String, model: M) -> Self {
        Self { id, key, model }
    }

    pub fn id(&self) -> ModelId {
        self.id
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub(crate) fn into_parts(self) -> (ModelId, String, M) {
        (self.id, self.key, self.model)
    }
}

impl<M> Deref for AcquiredModel<M> {
    type Target = M;

    fn deref(&self) -> &M {
        &self.model
    }
}

impl<M> DerefMut for AcquiredModel<M> {
    fn deref_mut(&mut self) -> &mut M {
        &mut self.model
    }
}
