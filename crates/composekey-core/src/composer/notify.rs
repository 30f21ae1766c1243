// Composekey State Change Notification
// Observers called synchronously after every composer state transition

use std::sync::mpsc;

use super::state::ComposerState;
use crate::state::LockState;
use crate::KeyCode;

/// What observers see after a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateChange {
    pub state: ComposerState,
    /// Compose key of the current or last session
    pub compose_key: Option<KeyCode>,
    pub disabled: bool,
    /// Lock toggles of the output device at notification time
    pub locks: LockState,
}

impl StateChange {
    pub fn is_composing(&self) -> bool {
        self.state.is_composing()
    }
}

type Observer = Box<dyn Fn(&StateChange) + Send>;

/// Registered observers. Called with the composer locked, so they must not
/// call back into it.
#[derive(Default)]
pub struct Observers {
    observers: Vec<Observer>,
}

impl Observers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<F>(&mut self, observer: F)
    where
        F: Fn(&StateChange) + Send + 'static,
    {
        self.observers.push(Box::new(observer));
    }

    /// Register a channel; it is fed until the receiver is dropped
    pub fn channel(&mut self) -> mpsc::Receiver<StateChange> {
        let (tx, rx) = mpsc::channel();
        self.add(move |change| {
            // A dropped receiver just leaves a dead sender behind
            let _ = tx.send(*change);
        });
        rx
    }

    pub fn notify(&self, change: &StateChange) {
        log::debug!(
            "State changed to {} (compose key {:?}, disabled {})",
            change.state,
            change.compose_key,
            change.disabled
        );
        for observer in &self.observers {
            observer(change);
        }
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}
