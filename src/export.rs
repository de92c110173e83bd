use std::path::{Path, PathBuf};

use exn::ResultExt;
use inkstone_epub::BookInfo;
use inkstone_manuscript::{Work, WorkId, assemble};
use inkstone_markup::{TextStats, count};
use inkstone_storage::{BackendHandle, StoreHandle};
use tracing::{debug, instrument};

use crate::error::{ErrorKind, Result};

/// Characters that cannot appear in a portable file name.
const UNSAFE_FILE_NAME_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Turns persisted works into EPUB packages.
///
/// Reads only what the store holds: content still sitting in an editor buffer
/// is not part of the package until it has been flushed.
#[derive(Clone)]
pub struct Exporter {
    store: StoreHandle,
}

impl Exporter {
    pub fn new(store: StoreHandle) -> Self {
        Self { store }
    }

    /// Loads a work with everything it contains.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::NotFound`] if the store has no such work.
    /// - [`ErrorKind::Store`] if the store fails to load it.
    pub async fn load(&self, id: &WorkId) -> Result<Work> {
        match self.store.get_work(id).await {
            Ok(work) => Ok(work),
            Err(err) if err.is_not_found() => Err(err.raise(ErrorKind::NotFound(id.clone()))),
            Err(err) => Err(err).or_raise(|| ErrorKind::Store),
        }
    }

    /// Builds the package for a work and returns its bytes.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::NotFound`] if the store has no such work; nothing is
    ///   assembled.
    /// - [`ErrorKind::Store`] if the store fails to load it.
    /// - [`ErrorKind::ExportFailed`] if the sections could not be packaged.
    #[instrument(skip(self), fields(work = %id))]
    pub async fn package(&self, id: &WorkId) -> Result<Vec<u8>> {
        let work = self.load(id).await?;
        self.package_work(&work)
    }

    /// Builds the package for an already loaded work.
    pub fn package_work(&self, work: &Work) -> Result<Vec<u8>> {
        let sections = assemble(work);
        let stats: TextStats = sections.iter().map(|section| count(&section.content)).sum();
        debug!(
            work = %work.id,
            sections = sections.len(),
            characters = stats.total,
            pages = stats.pages(),
            "assembled work"
        );
        let info = BookInfo {
            title: work.title.clone(),
            genre: work.genre.clone(),
            created_at: work.created_at,
            stats,
        };
        let package =
            inkstone_epub::build(&info, work.cover_image.as_deref(), &sections).or_raise(|| ErrorKind::ExportFailed)?;
        debug!(package_size = package.len(), "packaged work");
        Ok(package)
    }

    /// Builds the package for a work and writes it to `path` on `sink`.
    ///
    /// The sink is only touched once the package is complete.
    #[instrument(skip(self, sink), fields(work = %id, sink = sink.name()))]
    pub async fn export_to(&self, id: &WorkId, sink: &BackendHandle, path: &Path) -> Result<()> {
        let work = self.load(id).await?;
        self.export_work(&work, sink, path).await
    }

    /// Packages an already loaded work and writes it to `path` on `sink`.
    pub async fn export_work(&self, work: &Work, sink: &BackendHandle, path: &Path) -> Result<()> {
        let package = self.package_work(work)?;
        sink.write(path, &package).await.or_raise(|| ErrorKind::Write)?;
        Ok(())
    }
}

/// File name an exported work is written under: its title, made safe for
/// any filesystem, falling back to the work's identifier.
pub(crate) fn file_name(title: &str, id: &WorkId) -> PathBuf {
    let cleaned: String = title
        .trim()
        .chars()
        .map(|c| {
            if c.is_control() || UNSAFE_FILE_NAME_CHARS.contains(&c) {
                '_'
            } else {
                c
            }
        })
        .collect();
    let stem = match cleaned.trim_start_matches('.') {
        "" => id.as_str(),
        stem => stem,
    };
    PathBuf::from(format!("{stem}.epub"))
}
