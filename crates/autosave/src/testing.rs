use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use inkstone_manuscript::{ChapterId, DocumentRef, Work, WorkId};
use inkstone_storage::DocumentStore;
use inkstone_storage::error::{ErrorKind, Result};
use tokio::sync::Semaphore;

pub(crate) fn chapter(id: &str) -> DocumentRef {
    DocumentRef::chapter("w1", id)
}

/// A document store that records every save. A gated store holds each save
/// until [`release()`](Self::release) lets it through.
pub(crate) struct RecordingStore {
    saves: Mutex<Vec<(String, String)>>,
    calls: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
    failing: AtomicBool,
    gate: Semaphore,
}

impl RecordingStore {
    pub(crate) fn new() -> Arc<Self> {
        Self::with_permits(Semaphore::MAX_PERMITS)
    }

    pub(crate) fn gated() -> Arc<Self> {
        Self::with_permits(0)
    }

    fn with_permits(permits: usize) -> Arc<Self> {
        Arc::new(Self {
            saves: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
            gate: Semaphore::new(permits),
        })
    }

    pub(crate) fn release(&self, saves: usize) {
        self.gate.add_permits(saves);
    }

    pub(crate) fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn max_concurrent(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    pub(crate) fn saves(&self) -> Vec<(String, String)> {
        self.saves.lock().unwrap().clone()
    }

    async fn save(&self, id: &str, content: &str) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active, Ordering::SeqCst);
        self.gate.acquire().await.unwrap().forget();
        self.active.fetch_sub(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            exn::bail!(ErrorKind::BackendError("store offline".to_string()));
        }
        self.saves.lock().unwrap().push((id.to_string(), content.to_string()));
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for RecordingStore {
    async fn get_work(&self, id: &WorkId) -> Result<Work> {
        exn::bail!(ErrorKind::WorkNotFound(id.clone()))
    }

    async fn save_chapter_content(&self, chapter: &ChapterId, content: &str) -> Result<()> {
        self.save(chapter.as_str(), content).await
    }

    async fn save_work_content(&self, work: &WorkId, content: &str) -> Result<()> {
        self.save(work.as_str(), content).await
    }
}
