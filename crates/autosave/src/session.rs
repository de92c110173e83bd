//! The runtime half of autosave: one task per open document.
//!
//! The driver task owns the [`Buffer`] and the [`Phase`] state machine and
//! works through commands strictly in order. The in-flight save is polled on
//! the same task, so there is only ever one timeline to reason about. A
//! separate ticker task feeds it [`Event::Tick`] and only holds a weak
//! sender, so dropping every [`SessionHandle`] still shuts the session down.

use std::sync::Arc;
use std::time::Duration;

use exn::{OptionExt, ResultExt};
use futures::FutureExt;
use futures::future::BoxFuture;
use inkstone_manuscript::DocumentRef;
use inkstone_storage::StoreHandle;
use time::OffsetDateTime;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender, WeakUnboundedSender};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, error, instrument, warn};

use crate::buffer::Buffer;
use crate::error::{ErrorKind, Result};
use crate::state::{Action, Event, Phase};
use crate::status::Status;

enum Command {
    Edit(String),
    Cursor(usize),
    Tick,
    Flush(oneshot::Sender<Result<()>>),
    Close,
}

/// Handle to a running editor session.
///
/// Cheap to clone. The session shuts down (with a final save) when
/// [`close()`](Self::close) is called or the last handle is dropped.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    document: DocumentRef,
    commands: UnboundedSender<Command>,
    status: watch::Receiver<Status>,
}

impl SessionHandle {
    /// Opens a session over `content` as loaded from the store.
    ///
    /// With an `interval`, dirty content is saved on a timer whose first tick
    /// comes one interval from now. Without one (or with a zero interval),
    /// content is only saved on [`flush()`](Self::flush) and at shutdown.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(
        store: StoreHandle,
        document: DocumentRef,
        content: impl Into<String>,
        interval: Option<Duration>,
    ) -> Self {
        let interval = interval.filter(|period| !period.is_zero());
        let buffer = Buffer::new(content.into());
        let phase = Phase::initial(interval.is_some());
        let (status_tx, status_rx) = watch::channel(Status {
            document: document.clone(),
            phase,
            dirty: buffer.is_dirty(),
            stats: buffer.stats(),
            last_saved_at: buffer.last_saved_at(),
            cursor: buffer.cursor(),
        });
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();

        let ticker = interval.map(|period| spawn_ticker(commands_tx.downgrade(), period));
        let driver = Driver {
            store,
            document: document.clone(),
            buffer,
            phase,
            in_flight: None,
            status: status_tx,
        };
        debug!(%document, ?interval, "opening editor session");
        tokio::spawn(driver.run(commands_rx, ticker));

        Self {
            document,
            commands: commands_tx,
            status: status_rx,
        }
    }

    pub fn document(&self) -> &DocumentRef {
        &self.document
    }

    /// Replaces the buffer content. Identical content is not an edit.
    pub fn edit(&self, content: impl Into<String>) -> Result<()> {
        self.send(Command::Edit(content.into()))
    }

    pub fn set_cursor(&self, cursor: usize) -> Result<()> {
        self.send(Command::Cursor(cursor))
    }

    /// Fires the autosave timer by hand.
    pub fn tick(&self) -> Result<()> {
        self.send(Command::Tick)
    }

    /// Waits for any in-flight save, then saves the buffer if it is dirty.
    ///
    /// Resolves once everything sent before it has been handled, and reports
    /// whether the buffer reached the store.
    pub async fn flush(&self) -> Result<()> {
        let (reply, result) = oneshot::channel();
        self.send(Command::Flush(reply))?;
        result.await.or_raise(|| ErrorKind::Closed)?
    }

    /// The latest published status.
    pub fn status(&self) -> Status {
        self.status.borrow().clone()
    }

    /// A receiver that sees every status change.
    pub fn subscribe(&self) -> watch::Receiver<Status> {
        self.status.clone()
    }

    /// Shuts the session down and waits for its final save to settle.
    ///
    /// A failed final save is logged, not returned. Closing a session that
    /// is already closed returns immediately.
    pub async fn close(mut self) {
        // The session may already be gone, in which case there is nothing
        // left to wait for either.
        let _ = self.commands.send(Command::Close);
        while self.status.changed().await.is_ok() {}
    }

    fn send(&self, command: Command) -> Result<()> {
        self.commands.send(command).ok().ok_or_raise(|| ErrorKind::Closed)
    }
}

fn spawn_ticker(commands: WeakUnboundedSender<Command>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticks = interval_at(Instant::now() + period, period);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticks.tick().await;
            let Some(commands) = commands.upgrade() else {
                break;
            };
            if commands.send(Command::Tick).is_err() {
                break;
            }
        }
    })
}

struct InFlight {
    revision: u64,
    future: BoxFuture<'static, inkstone_storage::error::Result<()>>,
}

/// Waits for the in-flight save to finish, then clears the slot.
///
/// Safe to drop half way: the save stays in the slot and is picked up again
/// by the next call. Never resolves on an empty slot.
async fn settle(in_flight: &mut Option<InFlight>) -> (u64, inkstone_storage::error::Result<()>) {
    let Some(flight) = in_flight.as_mut() else {
        return std::future::pending().await;
    };
    let result = (&mut flight.future).await;
    let revision = flight.revision;
    *in_flight = None;
    (revision, result)
}

struct Driver {
    store: StoreHandle,
    document: DocumentRef,
    buffer: Buffer,
    phase: Phase,
    in_flight: Option<InFlight>,
    status: watch::Sender<Status>,
}

impl Driver {
    #[instrument(name = "session", skip_all, fields(document = %self.document))]
    async fn run(mut self, mut commands: UnboundedReceiver<Command>, ticker: Option<JoinHandle<()>>) {
        loop {
            tokio::select! {
                biased;
                (revision, result) = settle(&mut self.in_flight), if self.in_flight.is_some() => {
                    if let Err(err) = self.complete(revision, result) {
                        warn!(error = ?err, "autosave failed, retrying on next tick");
                    }
                },
                command = commands.recv() => match command {
                    Some(Command::Edit(content)) => self.edit(content),
                    Some(Command::Cursor(cursor)) => {
                        self.buffer.set_cursor(cursor);
                        self.publish();
                    },
                    Some(Command::Tick) => self.apply(Event::Tick),
                    Some(Command::Flush(reply)) => {
                        let result = self.flush().await;
                        // Nobody waiting on the result is fine.
                        let _ = reply.send(result);
                    },
                    Some(Command::Close) | None => break,
                },
            }
        }

        if let Some(ticker) = ticker {
            ticker.abort();
        }
        if let Err(err) = self.flush().await {
            error!(error = ?err, "final save failed, unsaved changes were lost");
        }
        debug!(phase = %self.phase, "editor session closed");
    }

    fn edit(&mut self, content: String) {
        if self.buffer.replace(content) {
            self.apply(Event::Edited);
        } else {
            self.publish();
        }
    }

    fn apply(&mut self, event: Event) {
        let (phase, action) = self.phase.next(event);
        if phase != self.phase {
            debug!(from = %self.phase, to = %phase, ?event, "autosave transition");
        }
        self.phase = phase;
        if let Some(Action::Persist) = action {
            self.persist();
        }
        self.publish();
    }

    /// Hands a snapshot of the buffer to the store.
    fn persist(&mut self) {
        if self.in_flight.is_some() {
            warn!("save requested while another is in flight, ignoring");
            return;
        }
        let (revision, content) = self.buffer.snapshot();
        let store = Arc::clone(&self.store);
        let document = self.document.clone();
        debug!(revision, content_size = content.len(), "saving");
        let future = async move {
            match &document.chapter {
                Some(chapter) => store.save_chapter_content(chapter, &content).await,
                None => store.save_work_content(&document.work, &content).await,
            }
        }
        .boxed();
        self.in_flight = Some(InFlight { revision, future });
    }

    fn complete(
        &mut self,
        revision: u64,
        result: inkstone_storage::error::Result<()>,
    ) -> inkstone_storage::error::Result<()> {
        let event = match &result {
            Ok(()) => {
                self.buffer.mark_persisted(revision, OffsetDateTime::now_utc());
                debug!(revision, "saved");
                Event::Saved {
                    dirty: self.buffer.is_dirty(),
                }
            },
            Err(_) => Event::SaveFailed,
        };
        self.apply(event);
        result
    }

    /// Settles the in-flight save, if any.
    async fn drain(&mut self) -> Option<inkstone_storage::error::Result<()>> {
        if self.in_flight.is_none() {
            return None;
        }
        let (revision, result) = settle(&mut self.in_flight).await;
        Some(self.complete(revision, result))
    }

    async fn flush(&mut self) -> Result<()> {
        if let Some(Err(err)) = self.drain().await {
            warn!(error = ?err, "outstanding save failed, saving again");
        }
        self.apply(Event::Flush {
            dirty: self.buffer.is_dirty(),
        });
        match self.drain().await {
            Some(Err(err)) => Err(err.raise(ErrorKind::Persistence)),
            _ => Ok(()),
        }
    }

    fn publish(&self) {
        self.status.send_replace(Status {
            document: self.document.clone(),
            phase: self.phase,
            dirty: self.buffer.is_dirty(),
            stats: self.buffer.stats(),
            last_saved_at: self.buffer.last_saved_at(),
            cursor: self.buffer.cursor(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingStore, chapter};
    use inkstone_markup::count;

    const HOUR: Option<Duration> = Some(Duration::from_secs(3600));

    /// Resolves once the driver has handled every command sent before it.
    async fn sync(session: &SessionHandle, marker: usize) {
        session.set_cursor(marker).unwrap();
        session.subscribe().wait_for(|status| status.cursor == marker).await.unwrap();
    }

    #[tokio::test]
    async fn test_opens_clean() {
        let store = RecordingStore::new();
        let session = SessionHandle::spawn(store.clone(), chapter("c1"), "<p>첫 문장</p>", HOUR);
        let status = session.status();
        assert_eq!(status.phase, Phase::Armed);
        assert!(!status.dirty);
        assert_eq!(status.stats, count("<p>첫 문장</p>"));
        assert_eq!(status.last_saved_at, None);
        session.close().await;
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn test_edits_update_status() {
        let session = SessionHandle::spawn(RecordingStore::new(), chapter("c1"), "", HOUR);
        session.edit("<p>두 문장</p>").unwrap();
        sync(&session, 3).await;
        let status = session.status();
        assert_eq!(status.phase, Phase::PendingSave);
        assert!(status.dirty);
        assert_eq!(status.stats, count("<p>두 문장</p>"));
        assert_eq!(status.pages(), 1);
        assert_eq!(status.reading_minutes(), 1);
    }

    #[tokio::test]
    async fn test_tick_saves_dirty_content() {
        let store = RecordingStore::new();
        let session = SessionHandle::spawn(store.clone(), chapter("c1"), "", HOUR);
        session.edit("<p>a</p>").unwrap();
        session.tick().unwrap();
        let mut status = session.subscribe();
        status.wait_for(|status| status.phase == Phase::Armed && !status.dirty).await.unwrap();
        assert_eq!(store.saves(), vec![("c1".to_string(), "<p>a</p>".to_string())]);
        assert!(session.status().last_saved_at.is_some());
    }

    #[tokio::test]
    async fn test_ticks_never_overlap_saves() {
        let store = RecordingStore::gated();
        let session = SessionHandle::spawn(store.clone(), chapter("c1"), "", HOUR);
        session.edit("<p>a</p>").unwrap();
        session.tick().unwrap();
        session.tick().unwrap();
        session.tick().unwrap();
        sync(&session, 1).await;
        assert_eq!(session.status().phase, Phase::Saving);
        assert_eq!(store.calls(), 1);

        store.release(1);
        session.flush().await.unwrap();
        assert_eq!(store.calls(), 1);
        assert_eq!(store.max_concurrent(), 1);
    }

    #[tokio::test]
    async fn test_edit_during_save_stays_dirty() {
        let store = RecordingStore::gated();
        let session = SessionHandle::spawn(store.clone(), chapter("c1"), "", HOUR);
        session.edit("<p>a</p>").unwrap();
        session.tick().unwrap();
        session.edit("<p>ab</p>").unwrap();
        sync(&session, 1).await;

        store.release(1);
        let mut status = session.subscribe();
        status.wait_for(|status| status.phase == Phase::PendingSave).await.unwrap();
        assert!(session.status().dirty);
        assert!(session.status().last_saved_at.is_some());

        store.release(1);
        session.tick().unwrap();
        status.wait_for(|status| status.phase == Phase::Armed && !status.dirty).await.unwrap();
        let saved: Vec<String> = store.saves().into_iter().map(|(_, content)| content).collect();
        assert_eq!(saved, vec!["<p>a</p>", "<p>ab</p>"]);
    }

    #[tokio::test]
    async fn test_failed_save_keeps_session_dirty() {
        let store = RecordingStore::new();
        store.fail(true);
        let session = SessionHandle::spawn(store.clone(), chapter("c1"), "", HOUR);
        session.edit("<p>a</p>").unwrap();
        let err = session.flush().await.unwrap_err();
        assert_eq!(*err, ErrorKind::Persistence);
        assert!(err.is_retryable());
        let status = session.status();
        assert!(status.dirty);
        assert_eq!(status.phase, Phase::PendingSave);
        assert_eq!(status.last_saved_at, None);

        store.fail(false);
        session.tick().unwrap();
        session.subscribe().wait_for(|status| !status.dirty).await.unwrap();
        assert_eq!(store.saves().len(), 1);
    }

    #[tokio::test]
    async fn test_flush_without_timer() {
        let store = RecordingStore::new();
        let session = SessionHandle::spawn(store.clone(), chapter("c1"), "", None);
        assert_eq!(session.status().phase, Phase::Idle);
        session.edit("<p>a</p>").unwrap();
        session.tick().unwrap();
        sync(&session, 1).await;
        assert_eq!(store.calls(), 0);

        session.flush().await.unwrap();
        let status = session.status();
        assert_eq!(status.phase, Phase::Idle);
        assert!(!status.dirty);
        assert_eq!(store.calls(), 1);

        // Nothing new to save.
        session.flush().await.unwrap();
        assert_eq!(store.calls(), 1);
    }

    #[tokio::test]
    async fn test_flush_waits_for_outstanding_save() {
        let store = RecordingStore::gated();
        let session = SessionHandle::spawn(store.clone(), chapter("c1"), "", HOUR);
        session.edit("<p>a</p>").unwrap();
        session.tick().unwrap();
        session.edit("<p>ab</p>").unwrap();
        store.release(2);
        session.flush().await.unwrap();
        assert_eq!(store.max_concurrent(), 1);
        let saved: Vec<String> = store.saves().into_iter().map(|(_, content)| content).collect();
        assert_eq!(saved, vec!["<p>a</p>", "<p>ab</p>"]);
        assert!(!session.status().dirty);
    }

    #[tokio::test]
    async fn test_close_waits_for_in_flight_save() {
        let store = RecordingStore::gated();
        let session = SessionHandle::spawn(store.clone(), chapter("c1"), "", HOUR);
        session.edit("<p>a</p>").unwrap();
        session.tick().unwrap();
        session.edit("<p>ab</p>").unwrap();
        sync(&session, 1).await;

        let closing = tokio::spawn(session.clone().close());
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
        assert!(!closing.is_finished());

        store.release(2);
        closing.await.unwrap();
        let saved: Vec<String> = store.saves().into_iter().map(|(_, content)| content).collect();
        assert_eq!(saved, vec!["<p>a</p>", "<p>ab</p>"]);
        assert_eq!(store.max_concurrent(), 1);
    }

    #[tokio::test]
    async fn test_dropping_every_handle_saves() {
        let store = RecordingStore::new();
        let session = SessionHandle::spawn(store.clone(), chapter("c1"), "", HOUR);
        let mut status = session.subscribe();
        session.edit("<p>a</p>").unwrap();
        drop(session);
        while status.changed().await.is_ok() {}
        assert_eq!(store.saves(), vec![("c1".to_string(), "<p>a</p>".to_string())]);
    }

    #[tokio::test]
    async fn test_failed_final_save_is_not_surfaced() {
        let store = RecordingStore::new();
        store.fail(true);
        let session = SessionHandle::spawn(store.clone(), chapter("c1"), "", None);
        session.edit("<p>a</p>").unwrap();
        session.close().await;
        assert_eq!(store.calls(), 1);
        assert!(store.saves().is_empty());
    }

    #[tokio::test]
    async fn test_closed_session_rejects_commands() {
        let session = SessionHandle::spawn(RecordingStore::new(), chapter("c1"), "", None);
        let other = session.clone();
        session.close().await;
        assert_eq!(*other.edit("<p>late</p>").unwrap_err(), ErrorKind::Closed);
        assert_eq!(*other.flush().await.unwrap_err(), ErrorKind::Closed);
        other.close().await;
    }

    #[tokio::test]
    async fn test_body_documents_save_to_the_work() {
        let store = RecordingStore::new();
        let session = SessionHandle::spawn(store.clone(), DocumentRef::body("w1"), "", None);
        session.edit("<p>a</p>").unwrap();
        session.flush().await.unwrap();
        assert_eq!(store.saves(), vec![("w1".to_string(), "<p>a</p>".to_string())]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_fires_after_one_interval() {
        let store = RecordingStore::new();
        let session = SessionHandle::spawn(store.clone(), chapter("c1"), "", Some(Duration::from_secs(30)));
        session.edit("<p>a</p>").unwrap();

        tokio::time::sleep(Duration::from_secs(29)).await;
        assert_eq!(store.calls(), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        session.subscribe().wait_for(|status| !status.dirty).await.unwrap();
        assert_eq!(store.calls(), 1);

        // Clean sessions do not save on later ticks.
        tokio::time::sleep(Duration::from_secs(90)).await;
        assert_eq!(store.calls(), 1);
    }
}
