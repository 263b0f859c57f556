//! # Join Primitive
//!
//! A one-shot counter plus callback slot that coalesces N child completions
//! into one parent completion, shared by groves (joining their trees) and
//! forests (joining their groves).
//!
//! The whole subsystem is single-threaded and cooperative, so the state
//! lives behind `Rc`/`Cell`/`RefCell` rather than mutexes or atomics. The
//! phase tag makes a completion arriving for the wrong phase an assertion
//! failure instead of a silent hang.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// The async phase a join is coordinating. Compaction and checkpoint carry
/// the operation number they were started for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Open,
    CompactIo(u64),
    Checkpoint(u64),
}

struct JoinState {
    phase: Cell<Option<Phase>>,
    pending: Cell<u32>,
    callback: RefCell<Option<Box<dyn FnOnce()>>>,
}

/// One outstanding async phase at a time, fanned out to N children.
pub struct Join {
    state: Rc<JoinState>,
}

impl std::fmt::Debug for Join {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Join")
            .field("phase", &self.state.phase.get())
            .field("pending", &self.state.pending.get())
            .finish()
    }
}

impl Join {
    pub fn new() -> Self {
        Self {
            state: Rc::new(JoinState {
                phase: Cell::new(None),
                pending: Cell::new(0),
                callback: RefCell::new(None),
            }),
        }
    }

    /// Begin a phase with `pending` outstanding children. `callback` fires
    /// exactly once, after the last child completes.
    ///
    /// Panics if a phase is already in flight: callers must not overlap
    /// async phases on one grove or forest.
    pub fn start(&self, phase: Phase, pending: u32, callback: impl FnOnce() + 'static) {
        assert!(
            self.state.phase.get().is_none(),
            "phase {:?} started while {:?} still in flight",
            phase,
            self.state.phase.get(),
        );
        assert!(pending > 0, "join started with no children");

        self.state.phase.set(Some(phase));
        self.state.pending.set(pending);
        *self.state.callback.borrow_mut() = Some(Box::new(callback));
    }

    /// Hand out a completion for the phase currently in flight.
    pub fn token(&self) -> Completion {
        let phase = self
            .state
            .phase
            .get()
            .expect("token requested with no phase in flight");
        Completion {
            state: Rc::clone(&self.state),
            phase,
        }
    }

    /// The phase currently in flight, if any.
    pub fn in_flight(&self) -> Option<Phase> {
        self.state.phase.get()
    }
}

impl Default for Join {
    fn default() -> Self {
        Self::new()
    }
}

/// One child's handle on a pending phase. Consumed on completion.
pub struct Completion {
    state: Rc<JoinState>,
    phase: Phase,
}

impl Completion {
    /// Record this child as complete. The last completion of a phase clears
    /// the join and invokes the parent callback.
    pub fn complete(self) {
        let current = self.state.phase.get();
        assert_eq!(
            current,
            Some(self.phase),
            "completion for {:?} arrived while {:?} in flight",
            self.phase,
            current,
        );

        let pending = self.state.pending.get();
        assert!(pending > 0, "completion with no children pending");
        self.state.pending.set(pending - 1);

        if pending == 1 {
            // Clear before invoking: the callback may start the next phase.
            self.state.phase.set(None);
            let callback = self
                .state
                .callback
                .borrow_mut()
                .take()
                .expect("join callback already taken");
            callback();
        }
    }

    /// The phase this completion belongs to.
    pub fn phase(&self) -> Phase {
        self.phase
    }
}
