// Composekey Composer Engine
// Per-event routing: swallow, forward, or build a compose sequence

use std::time::{Duration, Instant};

use super::expiry::{ExpiryHandle, ExpiryOutcome, REARM_THRESHOLD};
use super::matcher::{evaluate, MatchOptions, MatchOutcome};
use super::notify::{Observers, StateChange};
use super::state::ComposerState;
use crate::layout::KeyboardLayout;
use crate::normalize::{normalize, ModifierSnapshot, RawKeyEvent};
use crate::output::{Clipboard, InputSink, OutputSynthesizer};
use crate::settings::ComposerSettings;
use crate::state::{KeyboardState, LockState};
use crate::stats::StatsSink;
use crate::table::{GenericSequences, SequenceTable};
use crate::window::WindowInspector;
use crate::{modifier, Action, Key, KeyCode, KeySequence};

/// Two key presses closer than this count as a pair for statistics
const PAIR_WINDOW: Duration = Duration::from_secs(2);

/// One-shot receiver of the next key
pub type CaptureCallback = Box<dyn FnOnce(Key) + Send>;

/// What happens to the physical event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    Swallow,
    Forward,
}

/// An event after normalization
struct KeyEvent {
    raw: RawKeyEvent,
    key: Key,
    capslock_override: bool,
    mods: ModifierSnapshot,
    now: Instant,
}

impl KeyEvent {
    fn code(&self) -> KeyCode {
        self.raw.code
    }

    fn is_down(&self) -> bool {
        self.raw.action.is_down()
    }

    fn is_up(&self) -> bool {
        self.raw.action.is_up()
    }
}

/// A rule returns `None` when it does not apply to the event
type Rule = fn(&mut ComposerCore, &KeyEvent) -> Option<Verdict>;

/// State machine rules, first match wins
const RULES: &[(&str, Rule)] = &[
    ("end_key_combination", ComposerCore::end_key_combination),
    ("begin_sequence", ComposerCore::begin_sequence),
    ("swallow_duplicate_compose", ComposerCore::swallow_duplicate_compose),
    ("abort_sequence", ComposerCore::abort_sequence),
    ("emulate_caps_lock", ComposerCore::emulate_caps_lock),
    ("forward_when_not_composing", ComposerCore::forward_when_not_composing),
    ("detect_key_combination", ComposerCore::detect_key_combination),
    ("extend_sequence", ComposerCore::extend_sequence),
];

/// Composer state and collaborators, guarded by the composer mutex
pub(crate) struct ComposerCore {
    pub(crate) settings: ComposerSettings,
    pub(crate) table: SequenceTable,
    pub(crate) generic: GenericSequences,
    pub(crate) layout: Box<dyn KeyboardLayout>,
    pub(crate) window: Box<dyn WindowInspector>,
    pub(crate) sink: Box<dyn InputSink>,
    pub(crate) clipboard: Box<dyn Clipboard>,
    pub(crate) stats: Box<dyn StatsSink>,
    pub(crate) observers: Observers,
    expiry: ExpiryHandle,
    keyboard: KeyboardState,

    state: ComposerState,
    /// Compose key transitions this session: odd while held
    counter: u32,
    compose_key: Option<KeyCode>,
    compose_is_altgr: bool,
    sequence: KeySequence,
    last_activity: Instant,
    last_key: Option<(Key, Instant)>,
    capture: Option<CaptureCallback>,
}

impl ComposerCore {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        settings: ComposerSettings,
        table: SequenceTable,
        layout: Box<dyn KeyboardLayout>,
        window: Box<dyn WindowInspector>,
        sink: Box<dyn InputSink>,
        clipboard: Box<dyn Clipboard>,
        stats: Box<dyn StatsSink>,
        expiry: ExpiryHandle,
    ) -> Self {
        let generic = GenericSequences::new(settings.unicode_prefix_keys.iter().cloned());
        Self {
            settings,
            table,
            generic,
            layout,
            window,
            sink,
            clipboard,
            stats,
            observers: Observers::new(),
            expiry,
            keyboard: KeyboardState::new(),
            state: ComposerState::Idle,
            counter: 0,
            compose_key: None,
            compose_is_altgr: false,
            sequence: KeySequence::new(),
            last_activity: Instant::now(),
            last_key: None,
            capture: None,
        }
    }

    pub(crate) fn state(&self) -> ComposerState {
        self.state
    }

    pub(crate) fn compose_key(&self) -> Option<KeyCode> {
        self.compose_key
    }

    pub(crate) fn sequence(&self) -> &KeySequence {
        &self.sequence
    }

    pub(crate) fn expiry_armed(&self) -> bool {
        self.expiry.is_armed()
    }

    pub(crate) fn set_capture(&mut self, callback: CaptureCallback) {
        self.capture = Some(callback);
    }

    /// Settings replacement; the next event drops a compose key that is no
    /// longer configured
    pub(crate) fn set_settings(&mut self, settings: ComposerSettings, now: Instant) {
        self.generic = GenericSequences::new(settings.unicode_prefix_keys.iter().cloned());
        self.settings = settings;
        if self.state == ComposerState::Sequence {
            self.arm_expiry(now);
        }
    }

    /// Route one event; `true` means the event must not reach applications
    pub(crate) fn handle_event(&mut self, raw: RawKeyEvent, now: Instant) -> bool {
        self.last_activity = now;

        // Snapshot the modifiers before this event changes them
        let caps_lock = self.sink.is_toggled(KeyCode::CAPSLOCK);
        let mut mods = self.keyboard.snapshot(self.layout.as_ref(), caps_lock);
        self.keyboard.observe(raw.code, raw.action);

        if self.settings.disabled {
            return false;
        }

        // A held AltGr compose key was swallowed and is invisible to applications
        if self.compose_is_altgr && self.state == ComposerState::Sequence && self.counter % 2 == 1
        {
            mods.altgr = false;
        }

        self.layout.save_dead_key();
        let verdict = self.route(raw, mods, now);
        self.layout.restore_dead_key();

        verdict == Verdict::Swallow
    }

    fn route(&mut self, raw: RawKeyEvent, mods: ModifierSnapshot, now: Instant) -> Verdict {
        let normalized = normalize(
            self.layout.as_ref(),
            &raw,
            &mods,
            self.settings.caps_lock_capitalizes,
        );
        let event = KeyEvent {
            raw,
            key: normalized.key,
            capslock_override: normalized.capslock_override,
            mods,
            now,
        };

        if self.capture.is_some() {
            if event.is_up() {
                if let Some(callback) = self.capture.take() {
                    log::debug!("Captured key {}", event.key);
                    callback(event.key.clone());
                }
            }
            return Verdict::Swallow;
        }

        if event.raw.action == Action::Press {
            self.record_key(&event.key, now);
        }

        if self.window.active_class().other_desktop {
            return Verdict::Forward;
        }

        if let Some(code) = self.compose_key {
            if !self.settings.is_compose_key(code) {
                log::debug!("Compose key {} is no longer configured", code);
                self.reset(now);
                self.compose_key = None;
                self.compose_is_altgr = false;
            }
        }

        for (name, rule) in RULES {
            if let Some(verdict) = rule(self, &event) {
                log::debug!(
                    "{} {} in {}: {} ({:?})",
                    event.key.friendly_name(),
                    event.raw.action,
                    self.state,
                    name,
                    verdict
                );
                return verdict;
            }
        }
        Verdict::Forward
    }

    fn record_key(&mut self, key: &Key, now: Instant) {
        self.stats.add_key(key);
        if let Some((previous, at)) = &self.last_key {
            if now.saturating_duration_since(*at) < PAIR_WINDOW {
                self.stats.add_pair(previous, key);
            }
        }
        self.last_key = Some((key.clone(), now));
    }

    fn end_key_combination(&mut self, event: &KeyEvent) -> Option<Verdict> {
        if self.state != ComposerState::KeyCombination
            || !event.is_up()
            || Some(event.code()) != self.compose_key
        {
            return None;
        }

        // Unstick the paired key, then whatever else the replayed AltGr chord pressed
        let mut balancing: Vec<KeyCode> = modifier::paired_key(event.code()).into_iter().collect();
        if self.compose_is_altgr {
            for &code in self.layout.altgr_chord() {
                if code != event.code() && !balancing.contains(&code) {
                    balancing.push(code);
                }
            }
        }
        for code in balancing {
            if let Err(e) = self.sink.key_up(code) {
                log::warn!("Failed to release {}: {}", code, e);
            }
        }

        self.counter = 0;
        self.set_state(ComposerState::Idle, event.now);
        Some(Verdict::Forward)
    }

    fn begin_sequence(&mut self, event: &KeyEvent) -> Option<Verdict> {
        if !event.is_down() || self.counter != 0 || !self.settings.is_compose_key(event.code()) {
            return None;
        }

        self.compose_key = Some(event.code());
        self.compose_is_altgr = event.code() == KeyCode::RIGHT_ALT && self.layout.has_altgr();
        self.counter = 1;
        self.sequence.clear();
        self.set_state(ComposerState::Sequence, event.now);
        Some(Verdict::Swallow)
    }

    fn swallow_duplicate_compose(&mut self, event: &KeyEvent) -> Option<Verdict> {
        if Some(event.code()) != self.compose_key {
            return None;
        }
        let held = self.counter % 2 == 1;
        if event.is_down() && held {
            return Some(Verdict::Swallow);
        }
        if event.is_up() && !held {
            // Applications saw the press, so they get the release too
            if self.sink.is_down(event.code()) {
                return Some(Verdict::Forward);
            }
            return Some(Verdict::Swallow);
        }
        None
    }

    fn abort_sequence(&mut self, event: &KeyEvent) -> Option<Verdict> {
        if self.state != ComposerState::Sequence
            || !event.is_down()
            || !matches!(event.code(), KeyCode::ESC | KeyCode::BACKSPACE)
        {
            return None;
        }
        self.reset(event.now);
        Some(Verdict::Swallow)
    }

    fn emulate_caps_lock(&mut self, event: &KeyEvent) -> Option<Verdict> {
        if !modifier::is_shift(event.code()) {
            return None;
        }

        let toggle = if event.is_up() {
            self.settings.emulate_caps_lock && event.mods.both_shifts
        } else {
            event.raw.action == Action::Press
                && self.settings.shift_disables_caps_lock
                && self.sink.is_toggled(KeyCode::CAPSLOCK)
        };
        if !toggle {
            return None;
        }

        if let Err(e) = self.sink.tap(KeyCode::CAPSLOCK) {
            log::warn!("Failed to toggle Caps Lock: {}", e);
        }
        Some(Verdict::Forward)
    }

    fn forward_when_not_composing(&mut self, event: &KeyEvent) -> Option<Verdict> {
        if self.state == ComposerState::Sequence {
            return None;
        }
        if event.is_down() && event.capslock_override {
            if let Some(text) = event.key.as_text() {
                let text = text.to_string();
                self.send_string(&text);
                return Some(Verdict::Swallow);
            }
        }
        Some(Verdict::Forward)
    }

    fn detect_key_combination(&mut self, event: &KeyEvent) -> Option<Verdict> {
        if self.counter != 1
            || !event.is_down()
            || !self.sequence.is_empty()
            || modifier::is_modifier(event.code())
        {
            return None;
        }

        let altgr_variant =
            self.compose_is_altgr && self.layout.altgr_variant(&event.key).is_some();
        if !(self.settings.keep_original_key || !event.key.is_usable() || altgr_variant) {
            return None;
        }

        self.sequence.clear();
        let replay: Vec<KeyCode> = if self.compose_is_altgr {
            self.layout.altgr_chord().to_vec()
        } else {
            self.compose_key.into_iter().collect()
        };
        for code in replay {
            if let Err(e) = self.sink.key_down(code) {
                log::warn!("Failed to replay {}: {}", code, e);
            }
        }
        self.set_state(ComposerState::KeyCombination, event.now);
        Some(Verdict::Forward)
    }

    fn extend_sequence(&mut self, event: &KeyEvent) -> Option<Verdict> {
        if Some(event.code()) == self.compose_key {
            self.counter += 1;
            let add = if self.compose_is_altgr {
                event.is_up() && self.counter > 2
            } else {
                event.is_down()
            };
            if add {
                self.add_to_sequence(Key::compose(), event.now);
            }
            return Some(Verdict::Swallow);
        }

        let mut key = event.key.clone();
        if self.compose_is_altgr && self.counter % 2 == 1 && event.is_down() {
            if let Some(variant) = self.layout.altgr_variant(&key) {
                key = variant;
                self.counter += 1;
            }
        }

        if !key.is_usable() {
            return Some(Verdict::Forward);
        }
        if event.is_down() {
            self.add_to_sequence(key, event.now);
        } else if self.sink.is_down(event.code()) {
            return Some(Verdict::Forward);
        }
        Some(Verdict::Swallow)
    }

    fn add_to_sequence(&mut self, key: Key, now: Instant) {
        self.sequence.push(key);
        let options = MatchOptions {
            case_insensitive: self.settings.case_insensitive,
            swap_on_invalid: self.settings.swap_on_invalid,
        };

        match evaluate(&self.sequence, &self.table, &self.generic, options) {
            MatchOutcome::Resolved {
                output,
                sequence,
                kind,
            } => {
                log::debug!("Sequence {} resolved ({:?}): {:?}", sequence, kind, output);
                self.stats.add_sequence(&sequence);
                self.reset(now);
                self.send_string(&output);
            }
            MatchOutcome::Pending => {}
            MatchOutcome::Invalid => {
                log::debug!("Invalid sequence {}", self.sequence);
                let text = self.sequence.printable_text();
                self.reset(now);
                if !self.settings.discard_on_invalid {
                    self.send_string(&text);
                }
                if self.settings.beep_on_invalid {
                    self.sink.beep();
                }
            }
        }
    }

    fn send_string(&mut self, text: &str) {
        let class = self.window.active_class();
        let mut synth = OutputSynthesizer::new(self.sink.as_mut(), self.clipboard.as_mut());
        if let Err(e) = synth.send_string(text, &class, self.settings.insert_zwsp) {
            log::warn!("Failed to type {:?}: {}", text, e);
        }
    }

    /// Back to `Idle`; a no-op when already idle
    pub(crate) fn reset(&mut self, now: Instant) {
        self.counter = 0;
        self.sequence.clear();
        self.set_state(ComposerState::Idle, now);
    }

    fn set_state(&mut self, state: ComposerState, now: Instant) {
        let previous = self.state;
        self.state = state;
        if state != ComposerState::Sequence {
            self.sequence.clear();
        }
        if previous == state {
            return;
        }

        if state == ComposerState::Sequence {
            self.arm_expiry(now);
        } else {
            self.expiry.disarm();
        }
        self.notify();
    }

    fn arm_expiry(&mut self, now: Instant) {
        match self.settings.reset_delay() {
            Some(delay) => self.expiry.arm_at(now + delay),
            None => self.expiry.disarm(),
        }
    }

    pub(crate) fn on_expiry(&mut self, now: Instant) -> ExpiryOutcome {
        let delay = match self.settings.reset_delay() {
            Some(delay) if self.state == ComposerState::Sequence => delay,
            _ => {
                self.expiry.disarm();
                return ExpiryOutcome::Ignored;
            }
        };

        let deadline = self.last_activity + delay;
        let remaining = deadline.saturating_duration_since(now);
        if remaining > REARM_THRESHOLD {
            self.expiry.arm_at(deadline);
            return ExpiryOutcome::Rearmed(remaining);
        }

        log::debug!("Sequence {} expired", self.sequence);
        self.reset(now);
        ExpiryOutcome::Expired
    }

    pub(crate) fn toggle_disabled(&mut self, now: Instant) -> bool {
        self.settings.disabled = !self.settings.disabled;
        log::info!(
            "Composing {}",
            if self.settings.disabled { "disabled" } else { "enabled" }
        );
        // Either transition notifies, even without a state change
        let previous = self.state;
        self.reset(now);
        if previous == self.state {
            self.notify();
        }
        self.settings.disabled
    }

    pub(crate) fn snapshot(&self) -> StateChange {
        StateChange {
            state: self.state,
            compose_key: self.compose_key,
            disabled: self.settings.disabled,
            locks: LockState {
                caps: self.sink.is_toggled(KeyCode::CAPSLOCK),
                num: self.sink.is_toggled(KeyCode::NUMLOCK),
                scroll: self.sink.is_toggled(KeyCode::SCROLLLOCK),
            },
        }
    }

    fn notify(&self) {
        self.observers.notify(&self.snapshot());
    }
}
