use std::time::Duration;

use inkstone_manuscript::DocumentRef;
use inkstone_storage::StoreHandle;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, instrument};

use crate::error::Result;
use crate::session::SessionHandle;

/// Owns the single active editor session.
///
/// Opening a document tears the previous session down first, so its final
/// save has settled before the new document is live.
pub struct Editor {
    store: StoreHandle,
    interval: Option<Duration>,
    active: Mutex<Option<SessionHandle>>,
}

impl Editor {
    pub fn new(store: StoreHandle, interval: Option<Duration>) -> Self {
        Self {
            store,
            interval,
            active: Mutex::new(None),
        }
    }

    /// Makes `document` the active document, starting from `content`.
    #[instrument(skip(self, document, content), fields(document = %document))]
    pub async fn open(&self, document: DocumentRef, content: impl Into<String>) -> SessionHandle {
        let mut active = self.take_over().await;
        let session = SessionHandle::spawn(self.store.clone(), document, content, self.interval);
        *active = Some(session.clone());
        session
    }

    /// Makes `document` the active document, starting from what `load`
    /// returns.
    ///
    /// `load` runs after the previous session's final save, so reopening the
    /// active document starts from its saved content. When `load` fails,
    /// nothing is left open.
    #[instrument(skip(self, document, load), fields(document = %document))]
    pub async fn open_with<F, Fut, E>(&self, document: DocumentRef, load: F) -> std::result::Result<SessionHandle, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<String, E>>,
    {
        let mut active = self.take_over().await;
        let content = load().await?;
        let session = SessionHandle::spawn(self.store.clone(), document, content, self.interval);
        *active = Some(session.clone());
        Ok(session)
    }

    /// Locks the active slot and tears down whatever session held it.
    async fn take_over(&self) -> MutexGuard<'_, Option<SessionHandle>> {
        let mut active = self.active.lock().await;
        if let Some(previous) = active.take() {
            debug!(previous = %previous.document(), "switching documents");
            previous.close().await;
        }
        active
    }

    /// Tears down the active session, if any.
    pub async fn close(&self) {
        let previous = self.active.lock().await.take();
        if let Some(previous) = previous {
            previous.close().await;
        }
    }

    /// Saves the active session now. Succeeds trivially with nothing open.
    pub async fn flush(&self) -> Result<()> {
        let active = self.active.lock().await.clone();
        match active {
            Some(session) => session.flush().await,
            None => Ok(()),
        }
    }

    pub async fn active(&self) -> Option<SessionHandle> {
        self.active.lock().await.clone()
    }
}
