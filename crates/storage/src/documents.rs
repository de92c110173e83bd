//! The manuscript document store.
//!
//! Layout within a backend:
//!
//! ```text
//! works/<work-id>.json        work record: metadata and chapter order
//! chapters/<chapter-id>.html  chapter content, as authored
//! series/<series-id>.json     series record: ordered work ids
//! ```
//!
//! Content files are written before the records that reference them, so a
//! record never points at content that was not stored.

use crate::BackendHandle;
use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use exn::ResultExt;
use futures::TryStreamExt;
use inkstone_manuscript::{Chapter, ChapterId, DocumentRef, Series, SeriesId, Work, WorkId};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tracing::instrument;

const WORKS_DIR: &str = "works";
const CHAPTERS_DIR: &str = "chapters";
const SERIES_DIR: &str = "series";

/// Shared handle to a document store.
pub type StoreHandle = Arc<dyn DocumentStore>;

/// Loads works and persists editor content.
///
/// Implementations decide their own timeouts; callers treat any error as a
/// failed operation and may retry.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Load a work with its chapters in reading order.
    ///
    /// Returns [`WorkNotFound`](ErrorKind::WorkNotFound) if there is no such
    /// work.
    async fn get_work(&self, id: &WorkId) -> Result<Work>;

    /// Replace the content of one chapter.
    ///
    /// Returns [`ChapterNotFound`](ErrorKind::ChapterNotFound) if there is no
    /// such chapter.
    async fn save_chapter_content(&self, chapter: &ChapterId, content: &str) -> Result<()>;

    /// Replace the undivided body of a work.
    async fn save_work_content(&self, work: &WorkId, content: &str) -> Result<()>;
}

#[derive(Debug, Serialize, Deserialize)]
struct WorkRecord {
    title: String,
    genre: String,
    #[serde(with = "time::serde::rfc3339")]
    created_at: OffsetDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cover_image: Option<String>,
    #[serde(default)]
    chapters: Vec<ChapterRecord>,
}
impl WorkRecord {
    fn is_divided(&self) -> bool {
        self.chapters.iter().any(|chapter| chapter.title != inkstone_manuscript::BODY_SENTINEL)
    }

    fn body(&self) -> Option<&ChapterRecord> {
        self.chapters.iter().find(|chapter| chapter.title == inkstone_manuscript::BODY_SENTINEL)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ChapterRecord {
    id: String,
    title: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct SeriesRecord {
    title: String,
    works: Vec<String>,
}

/// Document store over any [`StorageBackend`](crate::StorageBackend).
///
/// # Examples
///
/// ```no_run
/// use inkstone_manuscript::{Chapter, Work};
/// use inkstone_storage::{DocumentStore, Library, backend::LocalBackend};
/// use std::sync::Arc;
/// use time::OffsetDateTime;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let library = Library::new(Arc::new(LocalBackend::new("library", "/path/to/library")?));
/// let work = Work::new("w1", "바다", "추리", OffsetDateTime::now_utc())
///     .with_chapter(Chapter::new("w1-c1", "1장", "<p>첫 문장</p>"));
/// library.put_work(&work).await?;
/// library.save_chapter_content(&"w1-c1".into(), "<p>첫 문장을 고쳤다</p>").await?;
/// # Ok(())
/// # }
/// ```
pub struct Library {
    backend: BackendHandle,
    /// Serializes read-modify-write cycles on records.
    records: Mutex<()>,
}
impl Library {
    pub fn new(backend: BackendHandle) -> Self {
        Self {
            backend,
            records: Mutex::new(()),
        }
    }

    pub fn backend(&self) -> &BackendHandle {
        &self.backend
    }

    /// Path of a record or content file. Identifiers must be a single path
    /// component.
    fn entry_path(dir: &str, id: &str, extension: &str) -> Result<PathBuf> {
        let valid = !id.is_empty()
            && !id.starts_with('.')
            && !id.contains(['/', '\\', '\0'])
            && Path::new(id).components().count() == 1;
        if !valid {
            exn::bail!(ErrorKind::InvalidPath(PathBuf::from(id)));
        }
        Ok(Path::new(dir).join(format!("{id}.{extension}")))
    }

    fn work_path(id: &WorkId) -> Result<PathBuf> {
        Self::entry_path(WORKS_DIR, id.as_str(), "json")
    }

    fn chapter_path(id: &ChapterId) -> Result<PathBuf> {
        Self::entry_path(CHAPTERS_DIR, id.as_str(), "html")
    }

    fn series_path(id: &SeriesId) -> Result<PathBuf> {
        Self::entry_path(SERIES_DIR, id.as_str(), "json")
    }

    async fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Result<T> {
        let bytes = self.backend.read(path).await?;
        serde_json::from_slice(&bytes).or_raise(|| ErrorKind::InvalidData(path.to_path_buf()))
    }

    async fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value).or_raise(|| ErrorKind::InvalidData(path.to_path_buf()))?;
        self.backend.write(path, &bytes).await
    }

    async fn read_work_record(&self, id: &WorkId) -> Result<WorkRecord> {
        let path = Self::work_path(id)?;
        match self.read_json(&path).await {
            Err(err) if matches!(&*err, ErrorKind::NotFound(_)) => Err(err.raise(ErrorKind::WorkNotFound(id.clone()))),
            other => other,
        }
    }

    /// Content of a chapter. A chapter whose content was never written is
    /// empty.
    async fn read_content(&self, id: &ChapterId) -> Result<String> {
        let path = Self::chapter_path(id)?;
        match self.backend.read(&path).await {
            Ok(bytes) => String::from_utf8(bytes).or_raise(|| ErrorKind::InvalidData(path)),
            Err(err) if matches!(&*err, ErrorKind::NotFound(_)) => {
                tracing::debug!(chapter = %id, "chapter has no stored content");
                Ok(String::new())
            },
            Err(err) => Err(err),
        }
    }

    async fn write_content(&self, id: &ChapterId, content: &str) -> Result<()> {
        let path = Self::chapter_path(id)?;
        self.backend.write(&path, content.as_bytes()).await
    }

    /// Store a work: its chapters' content, then its record. Content of
    /// chapters the previous record listed and `work` no longer has is
    /// removed afterwards.
    #[instrument(skip(self, work), fields(backend = %self.backend.name(), work = %work.id))]
    pub async fn put_work(&self, work: &Work) -> Result<()> {
        let path = Self::work_path(&work.id)?;
        let _guard = self.records.lock().await;
        let previous: Option<WorkRecord> = match self.read_json(&path).await {
            Ok(record) => Some(record),
            Err(err) if matches!(&*err, ErrorKind::NotFound(_)) => None,
            Err(err) if matches!(&*err, ErrorKind::InvalidData(_)) => {
                tracing::warn!(error = ?err, "replacing unreadable work record");
                None
            },
            Err(err) => return Err(err),
        };
        for chapter in &work.chapters {
            self.write_content(&chapter.id, &chapter.content).await?;
        }
        let record = WorkRecord {
            title: work.title.clone(),
            genre: work.genre.clone(),
            created_at: work.created_at,
            cover_image: work.cover_image.clone(),
            chapters: work
                .chapters
                .iter()
                .map(|chapter| ChapterRecord {
                    id: chapter.id.to_string(),
                    title: chapter.title.clone(),
                })
                .collect(),
        };
        self.write_json(&path, &record).await?;

        let dropped = previous
            .into_iter()
            .flat_map(|previous| previous.chapters)
            .filter(|old| !work.chapters.iter().any(|chapter| chapter.id.as_str() == old.id));
        for chapter in dropped {
            self.delete_content(&ChapterId::from(chapter.id)).await;
        }
        Ok(())
    }

    /// Removes the content of a chapter no record refers to any more. The
    /// record is already stored, so failures are only logged.
    async fn delete_content(&self, id: &ChapterId) {
        let path = match Self::chapter_path(id) {
            Ok(path) => path,
            Err(err) => {
                tracing::warn!(chapter = %id, error = ?err, "not removing dropped chapter");
                return;
            },
        };
        match self.backend.delete(&path).await {
            Ok(()) => tracing::debug!(chapter = %id, "removed dropped chapter"),
            Err(err) if matches!(&*err, ErrorKind::NotFound(_)) => {},
            Err(err) => tracing::warn!(chapter = %id, error = ?err, "could not remove dropped chapter"),
        }
    }

    /// Identifiers of every stored work, sorted.
    pub async fn works(&self) -> Result<Vec<WorkId>> {
        let files = self.backend.list_stream(Some(Path::new(WORKS_DIR))).try_collect::<Vec<_>>().await?;
        let mut ids: Vec<WorkId> = files
            .into_iter()
            .filter(|file| file.path.extension().is_some_and(|ext| ext == "json"))
            .filter_map(|file| file.path.file_stem().and_then(|stem| stem.to_str()).map(WorkId::from))
            .collect();
        ids.sort();
        Ok(ids)
    }

    /// Load a series with its works in order.
    pub async fn get_series(&self, id: &SeriesId) -> Result<Series> {
        let path = Self::series_path(id)?;
        let record: SeriesRecord = match self.read_json(&path).await {
            Err(err) if matches!(&*err, ErrorKind::NotFound(_)) => {
                return Err(err.raise(ErrorKind::SeriesNotFound(id.clone())));
            },
            other => other?,
        };
        let mut works = Vec::with_capacity(record.works.len());
        for work in record.works {
            works.push(self.get_work(&WorkId::from(work)).await?);
        }
        Ok(Series {
            id: id.clone(),
            title: record.title,
            works,
        })
    }

    /// Store a series and every work in it.
    pub async fn put_series(&self, series: &Series) -> Result<()> {
        let path = Self::series_path(&series.id)?;
        for work in &series.works {
            self.put_work(work).await?;
        }
        let record = SeriesRecord {
            title: series.title.clone(),
            works: series.works.iter().map(|work| work.id.to_string()).collect(),
        };
        self.write_json(&path, &record).await
    }

    /// Content of a document, for opening it in the editor.
    ///
    /// The body of a work that has none yet is empty. Opening the body of a
    /// work divided into chapters fails with [`Divided`](ErrorKind::Divided).
    #[instrument(skip(self), fields(backend = %self.backend.name()))]
    pub async fn load_content(&self, document: &DocumentRef) -> Result<String> {
        let record = self.read_work_record(&document.work).await?;
        match &document.chapter {
            Some(chapter) => {
                let known = record.chapters.iter().any(|c| c.id == chapter.as_str());
                if !known {
                    exn::bail!(ErrorKind::ChapterNotFound(chapter.clone()));
                }
                self.read_content(chapter).await
            },
            None if record.is_divided() => exn::bail!(ErrorKind::Divided(document.work.clone())),
            None => match record.body() {
                Some(body) => self.read_content(&ChapterId::from(body.id.as_str())).await,
                None => Ok(String::new()),
            },
        }
    }
}

#[async_trait]
impl DocumentStore for Library {
    #[instrument(skip(self), fields(backend = %self.backend.name()))]
    async fn get_work(&self, id: &WorkId) -> Result<Work> {
        let record = self.read_work_record(id).await?;
        let mut chapters = Vec::with_capacity(record.chapters.len());
        for chapter in record.chapters {
            let chapter_id = ChapterId::from(chapter.id);
            let content = self.read_content(&chapter_id).await?;
            chapters.push(Chapter {
                id: chapter_id,
                title: chapter.title,
                content,
            });
        }
        Ok(Work {
            id: id.clone(),
            title: record.title,
            genre: record.genre,
            created_at: record.created_at,
            cover_image: record.cover_image,
            chapters,
        })
    }

    #[instrument(skip(self, content), fields(backend = %self.backend.name(), size = content.len()))]
    async fn save_chapter_content(&self, chapter: &ChapterId, content: &str) -> Result<()> {
        let path = Self::chapter_path(chapter)?;
        if !self.backend.exists(&path).await? {
            exn::bail!(ErrorKind::ChapterNotFound(chapter.clone()));
        }
        self.backend.write(&path, content.as_bytes()).await
    }

    #[instrument(skip(self, content), fields(backend = %self.backend.name(), size = content.len()))]
    async fn save_work_content(&self, work: &WorkId, content: &str) -> Result<()> {
        let _guard = self.records.lock().await;
        let mut record = self.read_work_record(work).await?;
        if record.is_divided() {
            exn::bail!(ErrorKind::Divided(work.clone()));
        }
        if let Some(body) = record.body() {
            return self.write_content(&ChapterId::from(body.id.as_str()), content).await;
        }
        // First words of an empty work: the body chapter comes into being.
        // Chapter ids share one namespace across works, so skip taken ones.
        let mut body = ChapterId::from(format!("{work}-body"));
        let mut suffix = 1;
        while self.backend.exists(&Self::chapter_path(&body)?).await? {
            suffix += 1;
            body = ChapterId::from(format!("{work}-body-{suffix}"));
        }
        self.write_content(&body, content).await?;
        record.chapters.push(ChapterRecord {
            id: body.to_string(),
            title: inkstone_manuscript::BODY_SENTINEL.to_string(),
        });
        let path = Self::work_path(work)?;
        self.write_json(&path, &record).await?;
        tracing::debug!(chapter = %body, "created body chapter");
        Ok(())
    }
}
