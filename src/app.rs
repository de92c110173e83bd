use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use exn::ResultExt;
use inkstone_autosave::{Editor, SessionHandle};
use inkstone_config::Config;
use inkstone_manuscript::{DocumentRef, WorkId};
use inkstone_storage::backend::LocalBackend;
use inkstone_storage::{BackendHandle, Library};
use tracing::{info, instrument};

use crate::error::{ErrorKind, Result};
use crate::export::{self, Exporter};

/// The application: a library of works, the editor working on one of them,
/// and the exporter turning them into packages.
pub struct Inkstone {
    library: Arc<Library>,
    exports: BackendHandle,
    editor: Editor,
    exporter: Exporter,
}

impl Inkstone {
    /// Wires the application over explicit backends: `library` holds the
    /// document store, `exports` receives finished packages.
    pub fn new(library: BackendHandle, exports: BackendHandle, interval: Option<Duration>) -> Self {
        let library = Arc::new(Library::new(library));
        Self {
            editor: Editor::new(library.clone(), interval),
            exporter: Exporter::new(library.clone()),
            library,
            exports,
        }
    }

    /// Wires the application over the directories named in `config`,
    /// creating them if needed.
    pub fn from_config(config: &Config) -> Result<Self> {
        let library = LocalBackend::new("library", &config.library.root).or_raise(|| ErrorKind::Store)?;
        let exports = LocalBackend::new("exports", &config.export.directory).or_raise(|| ErrorKind::Write)?;
        info!(
            library = %config.library.root.display(),
            exports = %config.export.directory.display(),
            interval = ?config.interval(),
            "inkstone ready"
        );
        Ok(Self::new(Arc::new(library), Arc::new(exports), config.interval()))
    }

    pub fn library(&self) -> &Library {
        &self.library
    }

    pub fn exporter(&self) -> &Exporter {
        &self.exporter
    }

    /// Makes a document the one being edited, after the previous one has
    /// been saved and closed. Content is loaded once that save has settled,
    /// so reopening the active document picks up what was just saved.
    #[instrument(skip(self), fields(document = %document))]
    pub async fn open(&self, document: DocumentRef) -> Result<SessionHandle> {
        self.editor.open_with(document.clone(), || self.load(&document)).await
    }

    async fn load(&self, document: &DocumentRef) -> Result<String> {
        match self.library.load_content(document).await {
            Ok(content) => Ok(content),
            Err(err) if err.is_not_found() => Err(err.raise(ErrorKind::NotFound(document.work.clone()))),
            Err(err) => Err(err).or_raise(|| ErrorKind::Store),
        }
    }

    /// The session currently open, if any.
    pub async fn active(&self) -> Option<SessionHandle> {
        self.editor.active().await
    }

    /// Saves the document being edited now.
    pub async fn flush(&self) -> Result<()> {
        self.editor.flush().await.or_raise(|| ErrorKind::Save)
    }

    /// Saves and closes the document being edited.
    pub async fn close(&self) {
        self.editor.close().await;
    }

    /// Exports a work to the exports backend under a name derived from its
    /// title.
    ///
    /// Only persisted content is packaged. Call [`flush()`](Self::flush)
    /// first to include what is still in the editor.
    ///
    /// Returns the path of the package relative to the exports backend.
    #[instrument(skip(self), fields(work = %id))]
    pub async fn export(&self, id: &WorkId) -> Result<PathBuf> {
        let work = self.exporter.load(id).await?;
        let path = export::file_name(&work.title, id);
        self.exporter.export_work(&work, &self.exports, &path).await?;
        info!(path = %path.display(), "exported work");
        Ok(path)
    }
}
