//! The autosave state machine.
//!
//! Pure and synchronous: the session driver feeds it events and carries out
//! the actions it returns.

use derive_more::Display;

/// Where a session stands with respect to persistence.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// No timer. Content is only persisted on flush and teardown.
    #[display("idle")]
    Idle,
    /// Timer running, nothing to save.
    #[display("armed")]
    Armed,
    /// Timer running, unsaved changes waiting for the next tick.
    #[display("pending")]
    PendingSave,
    /// A save is in flight.
    #[display("saving")]
    Saving,
}

/// Inputs to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// The buffer content changed.
    Edited,
    /// The autosave timer fired.
    Tick,
    /// A save was requested explicitly. `dirty` is the buffer's state at the
    /// time of the request.
    Flush { dirty: bool },
    /// The in-flight save succeeded. `dirty` is whether the buffer changed
    /// again while it was in flight.
    Saved { dirty: bool },
    /// The in-flight save failed.
    SaveFailed,
}

/// Side effects the driver must carry out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Hand a snapshot of the buffer to the document store.
    Persist,
}

impl Phase {
    /// The phase a session opens in.
    pub fn initial(timer: bool) -> Self {
        if timer { Phase::Armed } else { Phase::Idle }
    }

    /// Applies an event, returning the next phase and the action to take.
    ///
    /// A `Saving` session never asks for a second save: ticks and flushes are
    /// ignored until the in-flight save settles.
    pub fn next(self, event: Event) -> (Phase, Option<Action>) {
        use Phase::*;
        match (self, event) {
            (Idle, Event::Flush { dirty: true }) => (Idle, Some(Action::Persist)),
            (Idle, _) => (Idle, None),

            (Armed, Event::Edited) => (PendingSave, None),
            (Armed, Event::Flush { dirty: true }) => (Saving, Some(Action::Persist)),
            (Armed, _) => (Armed, None),

            (PendingSave, Event::Tick | Event::Flush { .. }) => (Saving, Some(Action::Persist)),
            (PendingSave, _) => (PendingSave, None),

            (Saving, Event::Saved { dirty: false }) => (Armed, None),
            (Saving, Event::Saved { dirty: true } | Event::SaveFailed) => (PendingSave, None),
            (Saving, _) => (Saving, None),
        }
    }

    /// Whether the phase has a timer running.
    pub fn is_timed(self) -> bool {
        !matches!(self, Phase::Idle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    use Phase::*;

    #[rstest]
    // Idle
    #[case(Idle, Event::Edited, Idle, None)]
    #[case(Idle, Event::Tick, Idle, None)]
    #[case(Idle, Event::Flush { dirty: true }, Idle, Some(Action::Persist))]
    #[case(Idle, Event::Flush { dirty: false }, Idle, None)]
    #[case(Idle, Event::Saved { dirty: false }, Idle, None)]
    #[case(Idle, Event::Saved { dirty: true }, Idle, None)]
    #[case(Idle, Event::SaveFailed, Idle, None)]
    // Armed
    #[case(Armed, Event::Edited, PendingSave, None)]
    #[case(Armed, Event::Tick, Armed, None)]
    #[case(Armed, Event::Flush { dirty: true }, Saving, Some(Action::Persist))]
    #[case(Armed, Event::Flush { dirty: false }, Armed, None)]
    #[case(Armed, Event::Saved { dirty: false }, Armed, None)]
    #[case(Armed, Event::SaveFailed, Armed, None)]
    // PendingSave
    #[case(PendingSave, Event::Edited, PendingSave, None)]
    #[case(PendingSave, Event::Tick, Saving, Some(Action::Persist))]
    #[case(PendingSave, Event::Flush { dirty: true }, Saving, Some(Action::Persist))]
    #[case(PendingSave, Event::Saved { dirty: true }, PendingSave, None)]
    #[case(PendingSave, Event::SaveFailed, PendingSave, None)]
    // Saving
    #[case(Saving, Event::Edited, Saving, None)]
    #[case(Saving, Event::Tick, Saving, None)]
    #[case(Saving, Event::Flush { dirty: true }, Saving, None)]
    #[case(Saving, Event::Saved { dirty: false }, Armed, None)]
    #[case(Saving, Event::Saved { dirty: true }, PendingSave, None)]
    #[case(Saving, Event::SaveFailed, PendingSave, None)]
    fn test_transitions(
        #[case] from: Phase,
        #[case] event: Event,
        #[case] to: Phase,
        #[case] action: Option<Action>,
    ) {
        assert_eq!(from.next(event), (to, action));
    }

    #[test]
    fn test_initial_phase() {
        assert_eq!(Phase::initial(true), Armed);
        assert_eq!(Phase::initial(false), Idle);
        assert!(!Idle.is_timed());
        assert!(Saving.is_timed());
    }

    #[test]
    fn test_repeated_ticks_while_saving_persist_once() {
        let (mut phase, action) = PendingSave.next(Event::Tick);
        assert_eq!(action, Some(Action::Persist));
        for _ in 0..5 {
            let (next, action) = phase.next(Event::Tick);
            assert_eq!(action, None);
            phase = next;
        }
        assert_eq!(phase, Saving);
    }
}
