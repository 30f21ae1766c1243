// Composekey Composer
// Compose key engine: sequence state machine, matching and expiry

mod engine;
mod expiry;
mod matcher;
mod notify;
mod state;

pub use engine::CaptureCallback;
pub use expiry::{ExpiryHandle, ExpiryOutcome, ExpiryTimer, REARM_THRESHOLD};
pub use matcher::{evaluate, MatchKind, MatchOptions, MatchOutcome};
pub use notify::{Observers, StateChange};
pub use state::ComposerState;

use parking_lot::Mutex;
use std::sync::{mpsc, Arc, Weak};
use std::time::Instant;

use engine::ComposerCore;
use crate::layout::KeyboardLayout;
use crate::normalize::RawKeyEvent;
use crate::output::{Clipboard, InputSink, NoClipboard};
use crate::settings::ComposerSettings;
use crate::stats::{NoStats, StatsSink};
use crate::table::SequenceTable;
use crate::window::{StaticWindow, WindowInspector};
use crate::{Key, KeyCode, KeySequence};

/// The compose engine.
///
/// All state lives behind one mutex shared with the expiry thread, which
/// only keeps a weak reference. Events are processed on the caller's
/// thread and output is synthesized before `process_event` returns.
pub struct Composer {
    core: Arc<Mutex<ComposerCore>>,
    // Dropped after `core`, so the thread never outlives a live composer
    _timer: ExpiryTimer,
}

impl Composer {
    /// A composer typing through `sink`, with the layout described by the
    /// settings, no window quirks, no clipboard and no statistics
    pub fn new<S>(settings: ComposerSettings, table: SequenceTable, sink: S) -> Self
    where
        S: InputSink + 'static,
    {
        let mut timer = ExpiryTimer::new();
        let layout = settings.build_layout();
        let core = ComposerCore::new(
            settings,
            table,
            Box::new(layout),
            Box::new(StaticWindow::default()),
            Box::new(sink),
            Box::new(NoClipboard),
            Box::new(NoStats),
            timer.handle(),
        );
        let core = Arc::new(Mutex::new(core));

        let weak: Weak<Mutex<ComposerCore>> = Arc::downgrade(&core);
        timer.start(move |now| {
            if let Some(core) = weak.upgrade() {
                let outcome = core.lock().on_expiry(now);
                log::trace!("Expiry timer fired: {:?}", outcome);
            }
        });

        Self { core, _timer: timer }
    }

    pub fn with_layout<L: KeyboardLayout + 'static>(self, layout: L) -> Self {
        self.core.lock().layout = Box::new(layout);
        self
    }

    pub fn with_window<W: WindowInspector + 'static>(self, window: W) -> Self {
        self.core.lock().window = Box::new(window);
        self
    }

    pub fn with_clipboard<C: Clipboard + 'static>(self, clipboard: C) -> Self {
        self.core.lock().clipboard = Box::new(clipboard);
        self
    }

    pub fn with_clipboard_boxed(self, clipboard: Box<dyn Clipboard>) -> Self {
        self.core.lock().clipboard = clipboard;
        self
    }

    pub fn with_stats<T: StatsSink + 'static>(self, stats: T) -> Self {
        self.core.lock().stats = Box::new(stats);
        self
    }

    /// Process one physical event. Returns `true` when the event was
    /// consumed and must not be forwarded.
    pub fn process_event(&self, event: RawKeyEvent) -> bool {
        self.process_event_at(event, Instant::now())
    }

    /// [`Composer::process_event`] with an explicit event time
    pub fn process_event_at(&self, event: RawKeyEvent, now: Instant) -> bool {
        self.core.lock().handle_event(event, now)
    }

    /// Run the expiry check as if the timer fired at `now`
    pub fn check_expiry_at(&self, now: Instant) -> ExpiryOutcome {
        self.core.lock().on_expiry(now)
    }

    pub fn state(&self) -> ComposerState {
        self.core.lock().state()
    }

    pub fn is_composing(&self) -> bool {
        self.state().is_composing()
    }

    pub fn is_disabled(&self) -> bool {
        self.core.lock().settings.disabled
    }

    /// Compose key of the current or last session
    pub fn compose_key(&self) -> Option<KeyCode> {
        self.core.lock().compose_key()
    }

    pub fn pending_sequence(&self) -> KeySequence {
        self.core.lock().sequence().clone()
    }

    pub fn expiry_armed(&self) -> bool {
        self.core.lock().expiry_armed()
    }

    /// Current state as observers would see it
    pub fn snapshot(&self) -> StateChange {
        self.core.lock().snapshot()
    }

    /// Flip the disabled flag; returns the new value
    pub fn toggle_disabled(&self) -> bool {
        self.core.lock().toggle_disabled(Instant::now())
    }

    /// Abandon any pending sequence
    pub fn reset(&self) {
        self.core.lock().reset(Instant::now());
    }

    /// Swallow events until a key is released, then hand that key to
    /// `callback`. Replaces any pending capture.
    pub fn capture_next_key<F>(&self, callback: F)
    where
        F: FnOnce(Key) + Send + 'static,
    {
        self.core.lock().set_capture(Box::new(callback));
    }

    /// Call `observer` after every state change. Observers run with the
    /// composer locked and must not call back into it.
    pub fn on_state_changed<F>(&self, observer: F)
    where
        F: Fn(&StateChange) + Send + 'static,
    {
        self.core.lock().observers.add(observer);
    }

    /// Receive every state change on a channel
    pub fn subscribe(&self) -> mpsc::Receiver<StateChange> {
        self.core.lock().observers.channel()
    }

    pub fn settings(&self) -> ComposerSettings {
        self.core.lock().settings.clone()
    }

    pub fn set_settings(&self, settings: ComposerSettings) {
        self.core.lock().set_settings(settings, Instant::now());
    }

    pub fn set_table(&self, table: SequenceTable) {
        self.core.lock().table = table;
    }

    pub fn sequence_count(&self) -> usize {
        self.core.lock().table.len()
    }
}
